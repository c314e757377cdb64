//! Node geometry and edge anchoring.
//!
//! Edges are drawn between node *borders*, not centers. `boundary_point`
//! finds where the line from one rectangle's center toward another's
//! center leaves the first rectangle. Node rectangles come from a
//! `LayoutMeasure`, the seam between the core and whatever renders it.

use crate::graph::RenderEdge;
use crate::model::{Stage, StageName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::PI;

/// A 2D point in canvas (content) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The container the nodes are laid out in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// A measured node rectangle, as the rendering layer reports it:
/// offset of the top-left corner plus rendered size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Center-based node geometry used for edge anchoring and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGeometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NodeGeometry {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        (px - self.x).abs() <= self.width / 2.0 && (py - self.y).abs() <= self.height / 2.0
    }

    /// Top-left corner, for renderers that draw from the corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x - self.width / 2.0, self.y - self.height / 2.0)
    }
}

impl From<NodeRect> for NodeGeometry {
    fn from(r: NodeRect) -> Self {
        Self {
            x: r.left + r.width / 2.0,
            y: r.top + r.height / 2.0,
            width: r.width,
            height: r.height,
        }
    }
}

/// Point on `source`'s border where a straight line toward `target`'s
/// center exits.
///
/// The plane around the source is split into four sectors by the
/// rectangle's diagonals. Left/right sectors hit a vertical edge, top/bottom
/// sectors a horizontal edge. A zero-sized source is a point and returns its
/// center. Coincident centers have no direction and resolve rightward.
pub fn boundary_point(source: &NodeGeometry, target: &NodeGeometry) -> Point {
    if source.width <= 0.0 || source.height <= 0.0 {
        return source.center();
    }

    let half_w = source.width / 2.0;
    let half_h = source.height / 2.0;
    // atan2(0, 0) is 0, so coincident centers land in the right sector.
    let angle = (target.y - source.y).atan2(target.x - source.x);
    let corner = half_h.atan2(half_w);

    if angle > -corner && angle <= corner {
        Point::new(source.x + half_w, source.y + half_w * angle.tan())
    } else if angle > corner && angle <= PI - corner {
        Point::new(source.x + half_h / angle.tan(), source.y + half_h)
    } else if angle > PI - corner || angle <= -(PI - corner) {
        Point::new(source.x - half_w, source.y - half_w * angle.tan())
    } else {
        Point::new(source.x - half_h / angle.tan(), source.y - half_h)
    }
}

/// Both endpoints of a border-to-border edge.
pub fn edge_endpoints(from: &NodeGeometry, to: &NodeGeometry) -> (Point, Point) {
    (boundary_point(from, to), boundary_point(to, from))
}

/// A routed edge ready to draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeSegment {
    pub from: StageName,
    pub to: StageName,
    pub start: Point,
    pub end: Point,
    pub feedback: bool,
}

/// Route every edge whose endpoints both have geometry. Edges touching an
/// unmeasured node are skipped until the next geometry pass.
pub fn route_edges(
    edges: &[RenderEdge],
    geometry: &BTreeMap<StageName, NodeGeometry>,
) -> Vec<EdgeSegment> {
    edges
        .iter()
        .filter_map(|edge| {
            let from = geometry.get(&edge.from)?;
            let to = geometry.get(&edge.to)?;
            let (start, end) = edge_endpoints(from, to);
            Some(EdgeSegment {
                from: edge.from,
                to: edge.to,
                start,
                end,
                feedback: edge.feedback,
            })
        })
        .collect()
}

// ─── Layout measurement ──────────────────────────────────────────────────

/// Supplies rendered node rectangles to the core.
///
/// Returning `None` means the stage has not been laid out yet; it is left
/// out of the geometry map rather than treated as an error.
pub trait LayoutMeasure {
    fn measure(&self, stage: &Stage) -> Option<NodeRect>;

    /// Notification that the container changed size.
    fn set_container_size(&mut self, _width: f32, _height: f32) {}
}

/// Lays nodes out from their percentage anchors: each node is a fixed-size
/// box centered on `(left%, top%)` of the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentLayout {
    pub container: Viewport,
    pub node_width: f32,
    pub node_height: f32,
}

impl PercentLayout {
    pub const NODE_WIDTH: f32 = 160.0;
    pub const NODE_HEIGHT: f32 = 96.0;

    pub fn new(container: Viewport) -> Self {
        Self {
            container,
            node_width: Self::NODE_WIDTH,
            node_height: Self::NODE_HEIGHT,
        }
    }
}

impl Default for PercentLayout {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl LayoutMeasure for PercentLayout {
    fn measure(&self, stage: &Stage) -> Option<NodeRect> {
        if self.container.width <= 0.0 || self.container.height <= 0.0 {
            return None;
        }
        let cx = self.container.width * stage.position.left / 100.0;
        let cy = self.container.height * stage.position.top / 100.0;
        Some(NodeRect {
            left: cx - self.node_width / 2.0,
            top: cy - self.node_height / 2.0,
            width: self.node_width,
            height: self.node_height,
        })
    }

    fn set_container_size(&mut self, width: f32, height: f32) {
        self.container = Viewport { width, height };
    }
}

/// Measure every stage, omitting the ones the layout cannot place yet.
pub fn compute_node_geometry<'a, I>(
    stages: I,
    measure: &dyn LayoutMeasure,
) -> BTreeMap<StageName, NodeGeometry>
where
    I: IntoIterator<Item = &'a Stage>,
{
    stages
        .into_iter()
        .filter_map(|stage| {
            measure
                .measure(stage)
                .map(|rect| (stage.name, NodeGeometry::from(rect)))
        })
        .collect()
}
