//! Environment controller: one interactive pipeline canvas.
//!
//! The controller owns everything mutable about an environment:
//!
//! - the live `StageGraph` and the run status driven by the `Sequencer`,
//! - the `ViewTransport` fed by pointer and wheel input,
//! - the current selection and the stage shown in the detail panel,
//! - measured node geometry, refreshed after mount, resize and view reset.
//!
//! Time is virtual. Hosts call `advance_to` with their own clock (or
//! `drain` in tests) and every due timer runs to completion before the
//! next one. Each `run()` or `reset()` bumps the run generation; sequence
//! timers from an older generation are dropped when they fire.

use crate::clock::{Entropy, Fired, SeededEntropy, Timers};
use crate::events::SimEvent;
use crate::input::InputEvent;
use crate::sequencer::{Advance, RunStatus, SequenceStep, Sequencer, SimulationSettings};
use crate::view::{ViewTransform, ViewTransport};
use pv_core::{
    ConfigError, EdgeSegment, Environment, EnvironmentConfig, LayoutMeasure, MessageScripts,
    NodeGeometry, PercentLayout, PipelineCatalog, Point, Stage, StageGraph, StageName, Viewport,
    compute_node_geometry, route_edges,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Seed used when no entropy source is injected.
pub const DEFAULT_SEED: u64 = 0x5eed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Sequence(SequenceStep),
    RefreshGeometry,
}

/// Serializable view of a controller, for hosts and the CLI report.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot<'a> {
    pub environment: Environment,
    pub status: RunStatus,
    pub transform: ViewTransform,
    pub selected: Option<StageName>,
    pub stages: Vec<&'a Stage>,
}

pub struct EnvironmentController {
    graph: StageGraph,
    view: ViewTransport,
    sequencer: Sequencer,
    timers: Timers<Timer>,
    entropy: Box<dyn Entropy>,
    layout: Box<dyn LayoutMeasure>,
    viewport: Viewport,
    geometry: BTreeMap<StageName, NodeGeometry>,
    status: RunStatus,
    /// Bumped on every run and reset.
    generation: u64,
    selected: Option<StageName>,
    /// Stage whose details are on display. Reads go through the graph so
    /// the panel follows live updates.
    detail: Option<StageName>,
    events: Vec<SimEvent>,
}

impl EnvironmentController {
    /// Mount a controller for one environment. Geometry is measured once
    /// the mount settle delay elapses.
    pub fn new(config: Arc<EnvironmentConfig>, scripts: Arc<MessageScripts>) -> Self {
        let settings = SimulationSettings::default();
        let viewport = Viewport::default();
        let mut controller = Self {
            graph: StageGraph::new(config),
            view: ViewTransport::new(),
            sequencer: Sequencer::new(scripts, settings),
            timers: Timers::new(),
            entropy: Box::new(SeededEntropy::new(DEFAULT_SEED)),
            layout: Box::new(PercentLayout::new(viewport)),
            viewport,
            geometry: BTreeMap::new(),
            status: RunStatus::Idle,
            generation: 0,
            selected: None,
            detail: None,
            events: Vec::new(),
        };
        controller.schedule_geometry_refresh();
        log::debug!(
            "{}: mounted with {} stage(s)",
            controller.environment(),
            controller.graph.stages().count()
        );
        controller
    }

    /// Mount the named environment of `catalog`.
    pub fn from_catalog(
        catalog: &PipelineCatalog,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let config = catalog
            .environment(environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment(environment.to_string()))?;
        Ok(Self::new(
            Arc::new(config.clone()),
            Arc::new(catalog.scripts.clone()),
        ))
    }

    pub fn with_entropy(mut self, entropy: impl Entropy + 'static) -> Self {
        self.entropy = Box::new(entropy);
        self
    }

    pub fn with_layout(mut self, layout: impl LayoutMeasure + 'static) -> Self {
        self.layout = Box::new(layout);
        self.layout
            .set_container_size(self.viewport.width, self.viewport.height);
        self
    }

    /// Size the container without measuring; geometry still waits for the
    /// mount settle delay.
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self.layout
            .set_container_size(viewport.width, viewport.height);
        self
    }

    pub fn with_settings(mut self, settings: SimulationSettings) -> Self {
        self.sequencer = Sequencer::new(self.sequencer.scripts().clone(), settings);
        self
    }

    // ─── Run control ─────────────────────────────────────────────────────

    /// Start a run from a clean slate. Ignored while a run is in progress.
    pub fn run(&mut self) {
        if self.status == RunStatus::Running {
            log::debug!("{}: run ignored, already running", self.environment());
            return;
        }
        self.graph.reset_all();
        self.selected = None;
        self.generation += 1;
        self.status = RunStatus::Running;
        self.events.push(SimEvent::RunStarted {
            environment: self.environment(),
        });
        log::debug!(
            "{}: run {} scheduled",
            self.environment(),
            self.generation
        );
        let settle = self.sequencer.settings().run_settle_ms;
        let first = self.sequencer.first_step();
        self.timers
            .schedule(settle, self.generation, Timer::Sequence(first));
    }

    /// Cancel any run and restore every stage to its template. Safe to call
    /// at any time, any number of times.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.graph.reset_all();
        self.status = RunStatus::Idle;
        self.selected = None;
        self.events.push(SimEvent::Reset {
            environment: self.environment(),
        });
        log::debug!(
            "{}: reset (generation {}, {} stale timer(s))",
            self.environment(),
            self.generation,
            self.timers.len()
        );
    }

    // ─── View ────────────────────────────────────────────────────────────

    /// Return to the identity transform and re-measure after it settles.
    pub fn reset_view(&mut self) {
        self.view.reset();
        self.schedule_geometry_refresh();
    }

    /// The container changed size: re-measure immediately.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Viewport { width, height };
        self.layout.set_container_size(width, height);
        self.compute_node_geometry();
    }

    pub fn compute_node_geometry(&mut self) {
        self.geometry = compute_node_geometry(self.graph.stages(), self.layout.as_ref());
        log::trace!(
            "{}: measured {} node(s)",
            self.environment(),
            self.geometry.len()
        );
    }

    /// Center of the container; the transform scales about it.
    pub fn view_origin(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    /// Screen point → content point under the current transform.
    pub fn to_content(&self, x: f32, y: f32) -> Point {
        self.view
            .transform()
            .to_content(Point::new(x, y), self.view_origin())
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select a stage and show its details. A stage this environment does
    /// not have changes nothing.
    pub fn select(&mut self, name: StageName) -> Option<Stage> {
        let stage = self.graph.get(name)?.clone();
        self.selected = Some(name);
        self.detail = Some(name);
        Some(stage)
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// Route a pointer or wheel event. `hit` is the node under the pointer,
    /// as resolved by the host's hit test. Returns whether anything visible
    /// changed.
    pub fn handle_input(&mut self, event: &InputEvent, hit: Option<StageName>) -> bool {
        match *event {
            InputEvent::PointerDown { x, y } => match hit {
                Some(name) => self.select(name).is_some(),
                None => {
                    self.view.begin_drag(x, y);
                    true
                }
            },
            InputEvent::PointerMove { x, y } => {
                if self.view.is_dragging() {
                    self.view.drag_to(x, y);
                    true
                } else {
                    false
                }
            }
            InputEvent::PointerUp { .. } | InputEvent::PointerLeave => {
                let was_dragging = self.view.is_dragging();
                self.view.end_drag();
                was_dragging
            }
            InputEvent::Wheel { delta_y } => {
                self.view.zoom(delta_y);
                true
            }
        }
    }

    // ─── Clock ───────────────────────────────────────────────────────────

    /// Run every timer due at or before `now_ms`. Returns whether any fired.
    pub fn advance_to(&mut self, now_ms: u64) -> bool {
        let mut fired_any = false;
        while let Some(fired) = self.timers.pop_due(now_ms) {
            self.fire(fired);
            fired_any = true;
        }
        self.timers.set_now(now_ms);
        fired_any
    }

    pub fn advance_by(&mut self, delta_ms: u64) -> bool {
        self.advance_to(self.timers.now().saturating_add(delta_ms))
    }

    /// Fire timers until none remain, jumping the clock as needed.
    pub fn drain(&mut self) {
        while let Some(due) = self.timers.next_due() {
            self.advance_to(due);
        }
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.next_due()
    }

    pub fn now(&self) -> u64 {
        self.timers.now()
    }

    fn schedule_geometry_refresh(&mut self) {
        let settle = self.sequencer.settings().geometry_settle_ms;
        self.timers
            .schedule(settle, self.generation, Timer::RefreshGeometry);
    }

    fn fire(&mut self, fired: Fired<Timer>) {
        match fired.task {
            Timer::RefreshGeometry => self.compute_node_geometry(),
            Timer::Sequence(step) => {
                if fired.generation != self.generation || self.status != RunStatus::Running {
                    log::trace!(
                        "{}: dropped stale step {step:?} from generation {}",
                        self.environment(),
                        fired.generation
                    );
                    return;
                }
                self.step(step);
            }
        }
    }

    fn step(&mut self, step: SequenceStep) {
        let first_new = self.events.len();
        let advance = self.sequencer.advance(
            step,
            &mut self.graph,
            self.entropy.as_mut(),
            &mut self.events,
        );

        let focused = self.events[first_new..].iter().rev().find_map(|event| match event {
            SimEvent::StageFocused { stage } => Some(*stage),
            _ => None,
        });
        if let Some(stage) = focused {
            self.selected = Some(stage);
            self.detail = Some(stage);
        }

        match advance {
            Advance::Wait { delay_ms, step } => {
                self.timers
                    .schedule(delay_ms, self.generation, Timer::Sequence(step));
            }
            Advance::Finished(outcome) => {
                self.status = outcome.status();
                log::info!(
                    "{}: run finished {} after {} ms",
                    self.environment(),
                    self.status,
                    self.timers.now()
                );
                self.events.push(SimEvent::RunFinished {
                    environment: self.environment(),
                    status: self.status,
                });
            }
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn environment(&self) -> Environment {
        self.graph.environment()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stage(&self, name: StageName) -> Option<&Stage> {
        self.graph.get(name)
    }

    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.graph.stages()
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn view(&self) -> &ViewTransport {
        &self.view
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn geometry(&self) -> &BTreeMap<StageName, NodeGeometry> {
        &self.geometry
    }

    pub fn selected(&self) -> Option<StageName> {
        self.selected
    }

    /// Live details of the stage on display.
    pub fn detail(&self) -> Option<&Stage> {
        self.detail.and_then(|name| self.graph.get(name))
    }

    /// Border-to-border segments for every edge with measured endpoints.
    pub fn edge_segments(&self) -> Vec<EdgeSegment> {
        route_edges(self.graph.edges(), &self.geometry)
    }

    pub fn snapshot(&self) -> ControllerSnapshot<'_> {
        ControllerSnapshot {
            environment: self.environment(),
            status: self.status,
            transform: self.view.transform(),
            selected: self.selected,
            stages: self.graph.stages().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_core::StageStatus;
    use pretty_assertions::assert_eq;

    fn dev() -> EnvironmentController {
        EnvironmentController::from_catalog(&PipelineCatalog::builtin(), Environment::Dev).unwrap()
    }

    #[test]
    fn geometry_appears_after_mount_settle() {
        let mut ctl = dev();
        assert!(ctl.geometry().is_empty());
        ctl.advance_to(49);
        assert!(ctl.geometry().is_empty());
        ctl.advance_to(50);
        assert_eq!(ctl.geometry().len(), ctl.stages().count());
    }

    #[test]
    fn resize_measures_immediately() {
        let mut ctl = dev();
        ctl.resize(1000.0, 500.0);
        let geom = ctl.geometry()[&StageName::DataIngestion];
        // Dev places ingestion at top 30%, left 20%.
        assert!((geom.x - 200.0).abs() < 1e-3);
        assert!((geom.y - 150.0).abs() < 1e-3);
    }

    #[test]
    fn first_stage_waits_for_run_settle() {
        let mut ctl = dev();
        ctl.run();
        assert_eq!(ctl.status(), RunStatus::Running);
        ctl.advance_by(99);
        assert_eq!(
            ctl.stage(StageName::DataIngestion).unwrap().status,
            StageStatus::Pending
        );
        ctl.advance_by(1);
        assert_eq!(
            ctl.stage(StageName::DataIngestion).unwrap().status,
            StageStatus::Running
        );
        assert_eq!(ctl.selected(), Some(StageName::DataIngestion));
        assert_eq!(ctl.detail().unwrap().name, StageName::DataIngestion);
    }

    #[test]
    fn reset_clears_selection_but_keeps_detail() {
        let mut ctl = dev();
        ctl.select(StageName::DataPreprocessing);
        ctl.reset();
        assert_eq!(ctl.selected(), None);
        assert_eq!(ctl.detail().unwrap().name, StageName::DataPreprocessing);
        ctl.close_detail();
        assert!(ctl.detail().is_none());
    }

    #[test]
    fn background_drag_pans_and_node_press_selects() {
        let mut ctl = dev();
        assert!(ctl.handle_input(&InputEvent::from_pointer_down(10.0, 10.0), None));
        assert!(ctl.handle_input(&InputEvent::from_pointer_move(40.0, 30.0), None));
        assert!(ctl.handle_input(&InputEvent::PointerLeave, None));
        assert!(!ctl.handle_input(&InputEvent::from_pointer_move(90.0, 90.0), None));
        assert_eq!(ctl.view().transform().x, 30.0);
        assert_eq!(ctl.view().transform().y, 20.0);

        assert!(ctl.handle_input(
            &InputEvent::from_pointer_down(0.0, 0.0),
            Some(StageName::DataIngestion)
        ));
        assert!(!ctl.view().is_dragging());
        assert_eq!(ctl.selected(), Some(StageName::DataIngestion));
    }

    #[test]
    fn reset_view_remeasures_after_settle() {
        let mut ctl = dev();
        ctl.handle_input(&InputEvent::from_wheel(-300.0), None);
        ctl.reset_view();
        assert_eq!(ctl.view().transform(), ViewTransform::IDENTITY);
        assert_eq!(ctl.next_due(), Some(50));
        ctl.drain();
        assert!(!ctl.geometry().is_empty());
        assert_eq!(ctl.edge_segments().len(), ctl.graph().edges().len());
    }
}
