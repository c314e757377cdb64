//! View transport: pan and zoom of an environment's canvas.
//!
//! Dragging the background pans; the wheel zooms. Zoom keeps the pan offset
//! untouched, so it scales about the transform origin (the container
//! center) rather than about the pointer.

use pv_core::Point;
use serde::Serialize;

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 2.0;
/// Scale change per unit of wheel delta.
pub const ZOOM_SENSITIVITY: f32 = 0.001;
/// Smoothing applied to transform changes while not dragging.
pub const TRANSITION_MS: u32 = 100;

/// Pan offset plus uniform scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewTransform {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl ViewTransform {
    pub const IDENTITY: ViewTransform = ViewTransform {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
    };

    /// Content point → screen point, scaling about `origin`.
    pub fn to_screen(&self, p: Point, origin: Point) -> Point {
        Point::new(
            origin.x + self.x + self.scale * (p.x - origin.x),
            origin.y + self.y + self.scale * (p.y - origin.y),
        )
    }

    /// Screen point → content point. Inverse of `to_screen`.
    pub fn to_content(&self, p: Point, origin: Point) -> Point {
        Point::new(
            origin.x + (p.x - origin.x - self.x) / self.scale,
            origin.y + (p.y - origin.y - self.y) / self.scale,
        )
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Gesture state machine over a `ViewTransform`.
#[derive(Debug, Clone, Default)]
pub struct ViewTransport {
    transform: ViewTransform,
    /// Pointer offset from the pan origin, set while a drag is active.
    drag_anchor: Option<Point>,
}

impl ViewTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    /// Smoothing duration the renderer should use for the next transform
    /// change. Dragging follows the pointer directly.
    pub fn transition_ms(&self) -> u32 {
        if self.is_dragging() { 0 } else { TRANSITION_MS }
    }

    pub fn begin_drag(&mut self, px: f32, py: f32) {
        self.drag_anchor = Some(Point::new(px - self.transform.x, py - self.transform.y));
    }

    /// Pan so the grabbed point stays under the pointer. Ignored when no drag
    /// is active.
    pub fn drag_to(&mut self, px: f32, py: f32) {
        if let Some(anchor) = self.drag_anchor {
            self.transform.x = px - anchor.x;
            self.transform.y = py - anchor.y;
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn zoom(&mut self, wheel_delta: f32) {
        let next = self.transform.scale * (1.0 - wheel_delta * ZOOM_SENSITIVITY);
        // NaN (from a non-finite delta) keeps the current scale.
        if next.is_nan() {
            return;
        }
        self.transform.scale = next.clamp(MIN_SCALE, MAX_SCALE);
    }

    pub fn reset(&mut self) {
        self.transform = ViewTransform::IDENTITY;
    }
}
