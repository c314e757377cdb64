//! Simulation sequencer.
//!
//! Walks an environment's execution order one stage at a time. Each stage
//! goes Pending → Running, streams its scripted log lines with a jittered
//! delay between them, then ends Success (or Failed under the
//! probabilistic policy). The next stage starts only once the previous one
//! is terminal.
//!
//! The sequencer holds no run state. The controller stores the pending
//! `SequenceStep` in its timer queue and hands it back when it comes due.

use crate::clock::Entropy;
use crate::events::SimEvent;
use pv_core::{DetailValue, MessageScripts, StageGraph, StageName, StagePatch, StageStatus};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Coarse status of an environment's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Text shown next to the run controls.
    pub fn label(self) -> &'static str {
        match self {
            RunStatus::Idle => "Ready",
            RunStatus::Running => "Running...",
            RunStatus::Completed => "Success",
            RunStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Idle => "IDLE",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Whether (and how often) a finished stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Every stage succeeds.
    #[default]
    Never,
    /// Each stage succeeds with probability `success_rate`; the first
    /// failure ends the run.
    Probabilistic { success_rate: f64 },
}

/// Timing and outcome knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Pause between `run()` and the first stage starting.
    pub run_settle_ms: u64,
    /// Pause before node geometry is re-measured after mount or view reset.
    pub geometry_settle_ms: u64,
    pub min_message_delay_ms: u64,
    pub max_message_delay_ms: u64,
    pub failure: FailurePolicy,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            run_settle_ms: 100,
            geometry_settle_ms: 50,
            min_message_delay_ms: 300,
            max_message_delay_ms: 500,
            failure: FailurePolicy::Never,
        }
    }
}

/// The next unit of work in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStep {
    /// Start the stage at `index` in the execution order.
    StartStage { index: usize },
    /// Emit message `message` of the stage at `index`.
    Message { index: usize, message: usize },
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed { stage: StageName },
}

impl RunOutcome {
    pub fn status(self) -> RunStatus {
        match self {
            RunOutcome::Completed => RunStatus::Completed,
            RunOutcome::Failed { .. } => RunStatus::Failed,
        }
    }
}

/// Result of executing one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Suspend for `delay_ms`, then execute `step`.
    Wait { delay_ms: u64, step: SequenceStep },
    Finished(RunOutcome),
}

pub struct Sequencer {
    scripts: Arc<MessageScripts>,
    settings: SimulationSettings,
}

impl Sequencer {
    pub fn new(scripts: Arc<MessageScripts>, settings: SimulationSettings) -> Self {
        Self { scripts, settings }
    }

    pub fn scripts(&self) -> &Arc<MessageScripts> {
        &self.scripts
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn first_step(&self) -> SequenceStep {
        SequenceStep::StartStage { index: 0 }
    }

    /// Execute `step` against `graph`, returning what to do next.
    pub fn advance(
        &self,
        step: SequenceStep,
        graph: &mut StageGraph,
        entropy: &mut dyn Entropy,
        events: &mut Vec<SimEvent>,
    ) -> Advance {
        let mut step = step;
        // Finishing a stage flows straight into starting the next one.
        loop {
            match step {
                SequenceStep::StartStage { index } => {
                    let Some(&name) = graph.order().get(index) else {
                        return Advance::Finished(RunOutcome::Completed);
                    };
                    self.start_stage(name, graph, events);
                    if self.scripts.get(name).is_empty() {
                        match self.finish_stage(name, graph, entropy, events) {
                            StageStatus::Success => {
                                step = SequenceStep::StartStage { index: index + 1 };
                                continue;
                            }
                            _ => return Advance::Finished(RunOutcome::Failed { stage: name }),
                        }
                    }
                    return Advance::Wait {
                        delay_ms: self.jitter(entropy),
                        step: SequenceStep::Message { index, message: 0 },
                    };
                }
                SequenceStep::Message { index, message } => {
                    let Some(&name) = graph.order().get(index) else {
                        return Advance::Finished(RunOutcome::Completed);
                    };
                    let script = self.scripts.get(name);
                    if let Some(line) = script.get(message) {
                        let progress = progress_percent(message + 1, script.len());
                        let line = format!("[INFO] {line}");
                        graph.apply_patch(
                            name,
                            &StagePatch::new()
                                .append_log(line.clone())
                                .metric("progress", format!("{progress}%")),
                        );
                        log::trace!("{name}: {line} ({progress}%)");
                        events.push(SimEvent::LogAppended {
                            stage: name,
                            line,
                            progress,
                        });
                        if message + 1 < script.len() {
                            return Advance::Wait {
                                delay_ms: self.jitter(entropy),
                                step: SequenceStep::Message {
                                    index,
                                    message: message + 1,
                                },
                            };
                        }
                    }
                    match self.finish_stage(name, graph, entropy, events) {
                        StageStatus::Success => {
                            step = SequenceStep::StartStage { index: index + 1 };
                        }
                        _ => return Advance::Finished(RunOutcome::Failed { stage: name }),
                    }
                }
            }
        }
    }

    fn start_stage(&self, name: StageName, graph: &mut StageGraph, events: &mut Vec<SimEvent>) {
        let mut metrics = BTreeMap::new();
        metrics.insert("progress".to_string(), DetailValue::from("0%"));
        graph.apply_patch(
            name,
            &StagePatch::new()
                .status(StageStatus::Running)
                .replace_logs([format!("[INFO] Starting stage: {name}")])
                .replace_metrics(metrics),
        );
        log::debug!("{}: stage {name} started", graph.environment());
        events.push(SimEvent::StageStarted { stage: name });
        events.push(SimEvent::StageFocused { stage: name });
    }

    fn finish_stage(
        &self,
        name: StageName,
        graph: &mut StageGraph,
        entropy: &mut dyn Entropy,
        events: &mut Vec<SimEvent>,
    ) -> StageStatus {
        let succeeded = match self.settings.failure {
            FailurePolicy::Never => true,
            FailurePolicy::Probabilistic { success_rate } => entropy.unit() < success_rate,
        };

        let (status, patch) = if succeeded {
            let mut patch = StagePatch::new()
                .status(StageStatus::Success)
                .append_log(format!("[SUCCESS] Stage {name} completed successfully."));
            patch
                .merge_metrics
                .extend(completion_metrics(name, entropy));
            (StageStatus::Success, patch)
        } else {
            let patch = StagePatch::new()
                .status(StageStatus::Failed)
                .append_log(format!("[ERROR] Stage {name} failed."));
            (StageStatus::Failed, patch)
        };

        graph.apply_patch(name, &patch);
        log::debug!("{}: stage {name} finished {status}", graph.environment());
        events.push(SimEvent::StageFinished {
            stage: name,
            status,
        });
        status
    }

    fn jitter(&self, entropy: &mut dyn Entropy) -> u64 {
        entropy.range_u64(
            self.settings.min_message_delay_ms,
            self.settings.max_message_delay_ms,
        )
    }
}

/// `round(100 * done / total)`.
fn progress_percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

/// Extra metrics some stage kinds report on success.
fn completion_metrics(
    name: StageName,
    entropy: &mut dyn Entropy,
) -> SmallVec<[(String, DetailValue); 3]> {
    let mut metrics = SmallVec::new();
    match name {
        StageName::ModelEvaluation => {
            metrics.push(("accuracy".to_string(), DetailValue::from("98.5%")));
            metrics.push(("precision".to_string(), DetailValue::from("97.2%")));
            metrics.push(("recall".to_string(), DetailValue::from("99.1%")));
        }
        StageName::DataIngestion => {
            metrics.push(("records_ingested".to_string(), DetailValue::from("1,000,000")));
        }
        StageName::ModelVersioning => {
            let minor = entropy.range_u64(0, 4);
            let patch = entropy.range_u64(0, 9);
            metrics.push((
                "new_version".to_string(),
                DetailValue::from(format!("v1.{minor}.{patch}")),
            ));
        }
        _ => {}
    }
    metrics
}
