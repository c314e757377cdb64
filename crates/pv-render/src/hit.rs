//! Hit testing: point → stage lookup.
//!
//! Nodes are painted in stage declaration order, so the last painted node
//! is topmost and is checked first.

use pv_core::{NodeGeometry, Point, StageName};
use pv_engine::ViewTransform;
use std::collections::BTreeMap;

/// Find the topmost node at content position (px, py).
/// Returns `None` if no node is hit (background).
pub fn hit_test(
    geometry: &BTreeMap<StageName, NodeGeometry>,
    px: f32,
    py: f32,
) -> Option<StageName> {
    geometry
        .iter()
        .rev()
        .find(|(_, g)| g.contains(px, py))
        .map(|(name, _)| *name)
}

/// Hit test a screen position by first undoing the view transform.
pub fn hit_test_screen(
    geometry: &BTreeMap<StageName, NodeGeometry>,
    transform: &ViewTransform,
    origin: Point,
    sx: f32,
    sy: f32,
) -> Option<StageName> {
    let p = transform.to_content(Point::new(sx, sy), origin);
    hit_test(geometry, p.x, p.y)
}
