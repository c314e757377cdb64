//! Stage graph → Vello drawing commands.
//!
//! Paints routed edges first, then nodes in stage declaration order, all
//! under the view transform. Labels need a font context and are left to
//! the host.

use crate::palette::{Palette, Rgba};
use kurbo::{Affine, BezPath, Circle, Line, Point as KurboPoint, Rect, RoundedRect, Stroke};
use peniko::{Color, Fill};
use pv_core::{EdgeSegment, NodeGeometry, Point, StageGraph, StageName};
use pv_engine::ViewTransform;
use std::collections::BTreeMap;
use vello::Scene;

const NODE_RADIUS: f64 = 8.0;
const BORDER_WIDTH: f64 = 2.0;
const EDGE_WIDTH: f64 = 2.0;
const DASH: [f64; 2] = [5.0, 5.0];
const ARROW_SIZE: f64 = 10.0;
const SELECTION_GAP: f64 = 4.0;

/// Affine equivalent of `ViewTransform::to_screen` about `origin`.
pub fn view_affine(transform: &ViewTransform, origin: Point) -> Affine {
    let (ox, oy) = (origin.x as f64, origin.y as f64);
    Affine::translate((ox + transform.x as f64, oy + transform.y as f64))
        * Affine::scale(transform.scale as f64)
        * Affine::translate((-ox, -oy))
}

/// Paint one environment's pipeline to a Vello scene.
///
/// Call once per frame with a freshly-cleared `Scene`.
pub fn paint_pipeline(
    scene: &mut Scene,
    graph: &StageGraph,
    geometry: &BTreeMap<StageName, NodeGeometry>,
    edges: &[EdgeSegment],
    view: Affine,
    selected: Option<StageName>,
    palette: &Palette,
) {
    for edge in edges {
        paint_edge(scene, edge, view, palette);
    }

    for stage in graph.stages() {
        let Some(g) = geometry.get(&stage.name) else {
            continue;
        };
        let accent = color(palette.status(stage.status));
        let shape = node_shape(g, 0.0);

        scene.fill(Fill::NonZero, view, color(palette.node_fill), None, &shape);
        let border = if graph.is_feedback_source(stage.name) {
            Stroke::new(BORDER_WIDTH).with_dashes(0.0, DASH)
        } else {
            Stroke::new(BORDER_WIDTH)
        };
        scene.stroke(&border, view, accent, None, &shape);

        // Status dot in the top-right corner.
        let dot = Circle::new(
            ((g.x + g.width / 2.0) as f64 - 12.0, (g.y - g.height / 2.0) as f64 + 12.0),
            4.0,
        );
        scene.fill(Fill::NonZero, view, accent, None, &dot);

        if selected == Some(stage.name) {
            let ring = node_shape(g, SELECTION_GAP);
            scene.stroke(
                &Stroke::new(BORDER_WIDTH),
                view,
                color(palette.selection),
                None,
                &ring,
            );
        }

        log::trace!("NODE {} {} at ({}, {})", stage.name, stage.status, g.x, g.y);
    }
}

fn paint_edge(scene: &mut Scene, edge: &EdgeSegment, view: Affine, palette: &Palette) {
    let start = KurboPoint::new(edge.start.x as f64, edge.start.y as f64);
    let end = KurboPoint::new(edge.end.x as f64, edge.end.y as f64);
    let (stroke, paint) = if edge.feedback {
        (
            Stroke::new(EDGE_WIDTH).with_dashes(0.0, DASH),
            color(palette.feedback_edge),
        )
    } else {
        (Stroke::new(EDGE_WIDTH), color(palette.edge))
    };

    scene.stroke(&stroke, view, paint, None, &Line::new(start, end));
    scene.fill(Fill::NonZero, view, paint, None, &arrowhead(start, end));
}

/// Filled triangle with its tip on `end`, pointing along `start → end`.
fn arrowhead(start: KurboPoint, end: KurboPoint) -> BezPath {
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let mut path = BezPath::new();
    path.move_to(end);
    path.line_to((
        end.x - ARROW_SIZE * (angle - 0.4).cos(),
        end.y - ARROW_SIZE * (angle - 0.4).sin(),
    ));
    path.line_to((
        end.x - ARROW_SIZE * (angle + 0.4).cos(),
        end.y - ARROW_SIZE * (angle + 0.4).sin(),
    ));
    path.close_path();
    path
}

fn node_shape(g: &NodeGeometry, inflate: f64) -> RoundedRect {
    let o = g.origin();
    Rect::new(
        o.x as f64,
        o.y as f64,
        (o.x + g.width) as f64,
        (o.y + g.height) as f64,
    )
    .inflate(inflate, inflate)
    .to_rounded_rect(NODE_RADIUS + inflate)
}

fn color(c: Rgba) -> Color {
    Color::from_rgba8(c.r, c.g, c.b, c.a)
}
