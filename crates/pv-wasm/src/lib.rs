//! WASM bridge for PV — exposes one environment controller per canvas.
//!
//! Compiled via `wasm-pack build --target web`. The page creates one
//! `PipelineCanvas` per environment tab, forwards pointer and wheel events,
//! calls `tick` from `requestAnimationFrame` and redraws when it reports a
//! change. Stage snapshots and events cross the boundary as JSON.

mod render2d;

use pv_core::{Environment, PipelineCatalog, StageName, Viewport};
use pv_engine::{EnvironmentController, InputEvent, SeededEntropy};
use pv_render::{Palette, hit_test_screen};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The WASM-facing pipeline canvas.
#[wasm_bindgen]
pub struct PipelineCanvas {
    controller: EnvironmentController,
    width: f64,
    height: f64,
    dark_mode: bool,
    hovered: Option<StageName>,
}

#[wasm_bindgen]
impl PipelineCanvas {
    /// Mount an environment of the built-in catalog.
    #[wasm_bindgen(constructor)]
    pub fn new(environment: &str, width: f64, height: f64, seed: f64) -> Result<PipelineCanvas, JsValue> {
        console_error_panic_hook_setup();
        let environment: Environment = environment.parse().map_err(to_js_error)?;
        Self::mount(&PipelineCatalog::builtin(), environment, width, height, seed)
    }

    /// Mount an environment of a JSON catalog.
    pub fn from_catalog_json(
        json: &str,
        environment: &str,
        width: f64,
        height: f64,
        seed: f64,
    ) -> Result<PipelineCanvas, JsValue> {
        console_error_panic_hook_setup();
        let catalog = PipelineCatalog::from_json(json).map_err(to_js_error)?;
        let environment: Environment = environment.parse().map_err(to_js_error)?;
        Self::mount(&catalog, environment, width, height, seed)
    }

    /// Set the canvas theme.
    pub fn set_theme(&mut self, is_dark: bool) {
        self.dark_mode = is_dark;
    }

    /// Render to a Canvas2D context.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let palette = if self.dark_mode {
            Palette::dark()
        } else {
            Palette::light()
        };
        render2d::render_pipeline(
            ctx,
            &self.controller,
            self.width,
            self.height,
            self.hovered,
            &palette,
        );
    }

    /// Advance the simulation clock to `now_ms`. Returns true if anything
    /// fired and the canvas should be redrawn.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.controller.advance_to(now_ms.max(0.0) as u64)
    }

    pub fn run(&mut self) {
        self.controller.run();
    }

    pub fn reset(&mut self) {
        self.controller.reset();
    }

    pub fn reset_view(&mut self) {
        self.controller.reset_view();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.controller.resize(width as f32, height as f32);
    }

    /// Handle pointer down. Returns true if the canvas needs a redraw.
    pub fn handle_pointer_down(&mut self, x: f32, y: f32) -> bool {
        let event = InputEvent::from_pointer_down(x, y);
        let hit = self.hit_for(&event);
        self.controller.handle_input(&event, hit)
    }

    /// Handle pointer move. Returns true if the canvas needs a redraw.
    pub fn handle_pointer_move(&mut self, x: f32, y: f32) -> bool {
        let event = InputEvent::from_pointer_move(x, y);
        let hit = self.hit_for(&event);
        let hover_changed = hit != self.hovered;
        self.hovered = hit;
        let panned = self.controller.handle_input(&event, hit);
        panned || hover_changed
    }

    pub fn handle_pointer_up(&mut self, x: f32, y: f32) -> bool {
        self.controller
            .handle_input(&InputEvent::from_pointer_up(x, y), None)
    }

    pub fn handle_pointer_leave(&mut self) -> bool {
        let hover_changed = self.hovered.take().is_some();
        self.controller
            .handle_input(&InputEvent::PointerLeave, None)
            || hover_changed
    }

    pub fn handle_wheel(&mut self, delta_y: f32) -> bool {
        self.controller
            .handle_input(&InputEvent::from_wheel(delta_y), None)
    }

    /// Smoothing duration (ms) the host should apply to the transform.
    pub fn transition_ms(&self) -> u32 {
        self.controller.view().transition_ms()
    }

    /// Select a stage by label. Returns the stage as JSON, or `null` when
    /// the name is unknown or absent from this environment.
    pub fn select(&mut self, name: &str) -> String {
        let Ok(name) = name.parse::<StageName>() else {
            log::warn!("select: unknown stage `{name}`");
            return "null".to_string();
        };
        match self.controller.select(name) {
            Some(stage) => to_json(&stage),
            None => "null".to_string(),
        }
    }

    pub fn close_detail(&mut self) {
        self.controller.close_detail();
    }

    /// Run status label: `Ready`, `Running...`, `Success` or `Failed`.
    pub fn status(&self) -> String {
        self.controller.status().label().to_string()
    }

    pub fn is_running(&self) -> bool {
        self.controller.status() == pv_engine::RunStatus::Running
    }

    /// The stage on display in the detail panel, as JSON (`null` if none).
    pub fn detail_json(&self) -> String {
        match self.controller.detail() {
            Some(stage) => to_json(stage),
            None => "null".to_string(),
        }
    }

    /// Full controller snapshot as JSON.
    pub fn snapshot_json(&self) -> String {
        to_json(&self.controller.snapshot())
    }

    /// Events since the last call, as a JSON array.
    pub fn take_events_json(&mut self) -> String {
        serde_json::to_string(&self.controller.take_events()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Current pan/zoom as JSON: `{"x":..,"y":..,"scale":..}`.
    pub fn transform_json(&self) -> String {
        to_json(&self.controller.view().transform())
    }
}

impl PipelineCanvas {
    fn mount(
        catalog: &PipelineCatalog,
        environment: Environment,
        width: f64,
        height: f64,
        seed: f64,
    ) -> Result<PipelineCanvas, JsValue> {
        let controller = EnvironmentController::from_catalog(catalog, environment)
            .map_err(to_js_error)?
            .with_entropy(SeededEntropy::new(seed.max(0.0) as u64))
            .with_viewport(Viewport {
                width: width as f32,
                height: height as f32,
            });
        Ok(Self {
            controller,
            width,
            height,
            dark_mode: false,
            hovered: None,
        })
    }

    /// The stage under a positioned pointer event, if any.
    fn hit_for(&self, event: &InputEvent) -> Option<StageName> {
        let (x, y) = event.position()?;
        hit_test_screen(
            self.controller.geometry(),
            &self.controller.view().transform(),
            self.controller.view_origin(),
            x,
            y,
        )
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    log::error!("PV WASM: {err}");
    JsValue::from_str(&err.to_string())
}

/// Set up a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("PV WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no canvas needed) ─────────────────────────────

/// Validate a JSON catalog. Returns JSON: `{"ok":true}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_catalog(json: &str) -> String {
    match PipelineCatalog::from_json(json) {
        Ok(_) => r#"{"ok":true}"#.to_string(),
        Err(e) => {
            log::warn!("catalog rejected: {e}");
            serde_json::json!({ "ok": false, "error": e.to_string() }).to_string()
        }
    }
}

/// The built-in catalog as pretty JSON, for hosts that want to edit it.
#[wasm_bindgen]
pub fn builtin_catalog_json() -> String {
    PipelineCatalog::builtin()
        .to_json_pretty()
        .unwrap_or_else(|_| "{}".to_string())
}

/// Environment labels, in tab order, as a JSON array.
#[wasm_bindgen]
pub fn environments_json() -> String {
    let labels: Vec<&str> = Environment::ALL.iter().map(|e| e.label()).collect();
    to_json(&labels)
}
