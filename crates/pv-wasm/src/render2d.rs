//! Canvas2D software renderer.
//!
//! Draws one environment's pipeline to an HTML `<canvas>` via
//! `CanvasRenderingContext2d`: routed edges with arrowheads, then a card per
//! stage showing its label, status and progress.

use pv_core::{EdgeSegment, NodeGeometry, Stage, StageName, StageStatus};
use pv_engine::EnvironmentController;
use pv_render::{Palette, view_affine};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

const NODE_RADIUS: f64 = 8.0;
const SELECTION_GAP: f64 = 4.0;

/// Render the controller's current state.
pub fn render_pipeline(
    ctx: &CanvasRenderingContext2d,
    controller: &EnvironmentController,
    canvas_width: f64,
    canvas_height: f64,
    hovered: Option<StageName>,
    palette: &Palette,
) {
    ctx.set_fill_style_str(&palette.background.to_css());
    ctx.fill_rect(0.0, 0.0, canvas_width, canvas_height);

    ctx.save();
    let [a, b, c, d, e, f] =
        view_affine(&controller.view().transform(), controller.view_origin()).as_coeffs();
    ctx.set_transform(a, b, c, d, e, f).unwrap_or(());

    draw_edges(ctx, &controller.edge_segments(), palette);

    let graph = controller.graph();
    for stage in graph.stages() {
        let Some(g) = controller.geometry().get(&stage.name) else {
            continue;
        };
        draw_stage(
            ctx,
            stage,
            g,
            StageMarks {
                selected: controller.selected() == Some(stage.name),
                hovered: hovered == Some(stage.name),
                feedback_source: graph.is_feedback_source(stage.name),
            },
            palette,
        );
    }

    ctx.restore();
}

struct StageMarks {
    selected: bool,
    hovered: bool,
    feedback_source: bool,
}

fn draw_stage(
    ctx: &CanvasRenderingContext2d,
    stage: &Stage,
    g: &NodeGeometry,
    marks: StageMarks,
    palette: &Palette,
) {
    let o = g.origin();
    let (x, y, w, h) = (o.x as f64, o.y as f64, g.width as f64, g.height as f64);
    let accent = palette.status(stage.status).to_css();

    ctx.save();
    rounded_rect_path(ctx, x, y, w, h, NODE_RADIUS);
    ctx.set_fill_style_str(&palette.node_fill.to_css());
    ctx.fill();
    if marks.feedback_source {
        set_dashed(ctx);
    }
    ctx.set_stroke_style_str(&accent);
    ctx.set_line_width(if marks.hovered { 3.0 } else { 2.0 });
    ctx.stroke();
    ctx.restore();

    if marks.selected {
        ctx.save();
        rounded_rect_path(
            ctx,
            x - SELECTION_GAP,
            y - SELECTION_GAP,
            w + SELECTION_GAP * 2.0,
            h + SELECTION_GAP * 2.0,
            NODE_RADIUS + SELECTION_GAP,
        );
        ctx.set_stroke_style_str(&palette.selection.to_css());
        ctx.set_line_width(2.0);
        ctx.stroke();
        ctx.restore();
    }

    // Status dot
    ctx.save();
    ctx.begin_path();
    ctx.arc(x + w - 12.0, y + 12.0, 4.0, 0.0, std::f64::consts::TAU)
        .unwrap_or(());
    ctx.set_fill_style_str(&accent);
    ctx.fill();
    ctx.restore();

    let cx = g.x as f64;
    let cy = g.y as f64;
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    ctx.set_fill_style_str(&palette.text.to_css());
    ctx.set_font("600 13px Inter, system-ui, sans-serif");
    let _ = ctx.fill_text_with_max_width(stage.name.label(), cx, cy - 12.0, w - 16.0);

    ctx.set_font("11px Inter, system-ui, sans-serif");
    ctx.set_fill_style_str(&accent);
    let _ = ctx.fill_text(&status_line(stage), cx, cy + 12.0);
}

fn status_line(stage: &Stage) -> String {
    match (stage.status, stage.metric("progress")) {
        (StageStatus::Running, Some(progress)) => format!("{} · {progress}", stage.status),
        _ => stage.status.to_string(),
    }
}

fn draw_edges(ctx: &CanvasRenderingContext2d, edges: &[EdgeSegment], palette: &Palette) {
    for edge in edges {
        let color = if edge.feedback {
            palette.feedback_edge.to_css()
        } else {
            palette.edge.to_css()
        };

        ctx.save();
        ctx.set_stroke_style_str(&color);
        ctx.set_line_width(2.0);
        if edge.feedback {
            set_dashed(ctx);
        }
        ctx.begin_path();
        ctx.move_to(edge.start.x as f64, edge.start.y as f64);
        ctx.line_to(edge.end.x as f64, edge.end.y as f64);
        ctx.stroke();
        ctx.restore();

        draw_arrowhead(ctx, edge, &color);
    }
}

fn draw_arrowhead(ctx: &CanvasRenderingContext2d, edge: &EdgeSegment, color: &str) {
    let (x1, y1) = (edge.start.x as f64, edge.start.y as f64);
    let (x2, y2) = (edge.end.x as f64, edge.end.y as f64);
    let angle = (y2 - y1).atan2(x2 - x1);
    let size = 10.0;

    ctx.save();
    ctx.set_fill_style_str(color);
    ctx.begin_path();
    ctx.move_to(x2, y2);
    ctx.line_to(x2 - size * (angle - 0.4).cos(), y2 - size * (angle - 0.4).sin());
    ctx.line_to(x2 - size * (angle + 0.4).cos(), y2 - size * (angle + 0.4).sin());
    ctx.close_path();
    ctx.fill();
    ctx.restore();
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn set_dashed(ctx: &CanvasRenderingContext2d) {
    let pattern = js_sys::Array::of2(&JsValue::from_f64(5.0), &JsValue::from_f64(5.0));
    ctx.set_line_dash(&pattern).unwrap_or(());
}

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
    let r = r.min(w / 2.0).min(h / 2.0);
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.arc_to(x + w, y, x + w, y + r, r).unwrap_or(());
    ctx.line_to(x + w, y + h - r);
    ctx.arc_to(x + w, y + h, x + w - r, y + h, r).unwrap_or(());
    ctx.line_to(x + r, y + h);
    ctx.arc_to(x, y + h, x, y + h - r, r).unwrap_or(());
    ctx.line_to(x, y + r);
    ctx.arc_to(x, y, x + r, y, r).unwrap_or(());
    ctx.close_path();
}
