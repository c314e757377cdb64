//! Integration tests: full simulated runs (pv-engine).
//!
//! Drives an `EnvironmentController` through complete runs on the virtual
//! clock with a fixed entropy source, checking stage order, logs, metrics
//! and the final run status.

use pretty_assertions::assert_eq;
use pv_core::{
    DetailValue, Environment, EnvironmentConfig, MessageScripts, PipelineCatalog, StageName,
    StageStatus,
};
use pv_engine::{
    Entropy, EnvironmentController, FailurePolicy, RunStatus, SimEvent, SimulationSettings,
};
use std::sync::Arc;

/// Constant delays and a constant failure roll.
struct FixedEntropy {
    value: u64,
    roll: f64,
}

impl Entropy for FixedEntropy {
    fn range_u64(&mut self, min: u64, max: u64) -> u64 {
        self.value.clamp(min, max)
    }

    fn unit(&mut self) -> f64 {
        self.roll
    }
}

fn two_stage_config() -> Arc<EnvironmentConfig> {
    Arc::new(EnvironmentConfig::new(
        Environment::Dev,
        &[
            (StageName::DataIngestion, 50.0, 25.0),
            (StageName::DataPreprocessing, 50.0, 75.0),
        ],
        &[(StageName::DataIngestion, StageName::DataPreprocessing)],
        &[StageName::DataIngestion, StageName::DataPreprocessing],
    ))
}

fn two_message_scripts() -> Arc<MessageScripts> {
    let mut scripts = MessageScripts::new();
    scripts.insert(
        StageName::DataIngestion,
        ["Connecting to data sources...", "Data ingestion complete."],
    );
    scripts.insert(
        StageName::DataPreprocessing,
        ["Cleaning and normalizing data...", "Data preprocessing successful."],
    );
    Arc::new(scripts)
}

fn controller(policy: FailurePolicy, roll: f64) -> EnvironmentController {
    EnvironmentController::new(two_stage_config(), two_message_scripts())
        .with_entropy(FixedEntropy { value: 400, roll })
        .with_settings(SimulationSettings {
            failure: policy,
            ..SimulationSettings::default()
        })
}

fn status_of(ctl: &EnvironmentController, name: StageName) -> StageStatus {
    ctl.stage(name).unwrap().status
}

// ─── Deterministic policy ───────────────────────────────────────────────

#[test]
fn two_stage_run_completes() {
    let mut ctl = controller(FailurePolicy::Never, 0.0);
    ctl.run();
    ctl.drain();

    assert_eq!(ctl.status(), RunStatus::Completed);
    assert_eq!(status_of(&ctl, StageName::DataIngestion), StageStatus::Success);
    assert_eq!(
        status_of(&ctl, StageName::DataPreprocessing),
        StageStatus::Success
    );

    let ingestion = ctl.stage(StageName::DataIngestion).unwrap();
    assert_eq!(
        ingestion.metric("records_ingested"),
        Some(&DetailValue::from("1,000,000"))
    );
    assert_eq!(ingestion.metric("progress"), Some(&DetailValue::from("100%")));
    assert_eq!(
        ingestion.details.logs,
        vec![
            "[INFO] Starting stage: Data Ingestion",
            "[INFO] Connecting to data sources...",
            "[INFO] Data ingestion complete.",
            "[SUCCESS] Stage Data Ingestion completed successfully.",
        ]
    );

    // 100 ms settle plus two 400 ms waits per stage.
    assert_eq!(ctl.now(), 1_700);
}

#[test]
fn stages_run_strictly_in_order() {
    let mut ctl = controller(FailurePolicy::Never, 0.0);
    ctl.run();

    ctl.advance_to(500);
    assert_eq!(status_of(&ctl, StageName::DataIngestion), StageStatus::Running);
    assert!(!status_of(&ctl, StageName::DataIngestion).is_terminal());
    assert_eq!(
        ctl.stage(StageName::DataIngestion)
            .unwrap()
            .metric("progress")
            .and_then(DetailValue::as_text),
        Some("50%")
    );
    assert_eq!(
        status_of(&ctl, StageName::DataPreprocessing),
        StageStatus::Pending
    );

    ctl.advance_to(899);
    assert_eq!(
        status_of(&ctl, StageName::DataPreprocessing),
        StageStatus::Pending
    );

    // The last message finishes the stage and starts the next one at once.
    ctl.advance_to(900);
    assert_eq!(status_of(&ctl, StageName::DataIngestion), StageStatus::Success);
    assert!(status_of(&ctl, StageName::DataIngestion).is_terminal());
    assert_eq!(
        status_of(&ctl, StageName::DataPreprocessing),
        StageStatus::Running
    );
    assert_eq!(ctl.selected(), Some(StageName::DataPreprocessing));

    ctl.drain();
    let transitions: Vec<_> = ctl
        .take_events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                SimEvent::StageStarted { .. } | SimEvent::StageFinished { .. }
            )
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            SimEvent::StageStarted {
                stage: StageName::DataIngestion
            },
            SimEvent::StageFinished {
                stage: StageName::DataIngestion,
                status: StageStatus::Success
            },
            SimEvent::StageStarted {
                stage: StageName::DataPreprocessing
            },
            SimEvent::StageFinished {
                stage: StageName::DataPreprocessing,
                status: StageStatus::Success
            },
        ]
    );
}

#[test]
fn run_emits_start_and_finish_events() {
    let mut ctl = controller(FailurePolicy::Never, 0.0);
    ctl.run();
    ctl.drain();
    let events = ctl.take_events();
    assert_eq!(
        events.first(),
        Some(&SimEvent::RunStarted {
            environment: Environment::Dev
        })
    );
    assert_eq!(
        events.last(),
        Some(&SimEvent::RunFinished {
            environment: Environment::Dev,
            status: RunStatus::Completed
        })
    );
    assert!(ctl.take_events().is_empty());
}

#[test]
fn stage_without_script_finishes_immediately() {
    let mut scripts = MessageScripts::new();
    scripts.insert(StageName::DataPreprocessing, ["Cleaning..."]);
    let mut ctl = EnvironmentController::new(two_stage_config(), Arc::new(scripts))
        .with_entropy(FixedEntropy {
            value: 300,
            roll: 0.0,
        });
    ctl.run();
    ctl.advance_to(100);

    let ingestion = ctl.stage(StageName::DataIngestion).unwrap();
    assert_eq!(ingestion.status, StageStatus::Success);
    assert_eq!(ingestion.details.logs.len(), 2);
    assert_eq!(
        status_of(&ctl, StageName::DataPreprocessing),
        StageStatus::Running
    );
}

#[test]
fn versioning_reports_generated_version() {
    let config = Arc::new(EnvironmentConfig::new(
        Environment::Beta,
        &[(StageName::ModelVersioning, 50.0, 50.0)],
        &[],
        &[StageName::ModelVersioning],
    ));
    let mut ctl = EnvironmentController::new(config, Arc::new(MessageScripts::builtin()))
        .with_entropy(FixedEntropy {
            value: 3,
            roll: 0.0,
        });
    ctl.run();
    ctl.drain();
    assert_eq!(
        ctl.stage(StageName::ModelVersioning)
            .unwrap()
            .metric("new_version"),
        Some(&DetailValue::from("v1.3.3"))
    );
}

#[test]
fn prod_runs_every_stage_once_despite_feedback_edge() {
    let mut ctl =
        EnvironmentController::from_catalog(&PipelineCatalog::builtin(), Environment::Prod)
            .unwrap();
    ctl.run();
    ctl.drain();

    assert_eq!(ctl.status(), RunStatus::Completed);
    assert!(ctl.stages().all(|s| s.status == StageStatus::Success));
    let started = ctl
        .take_events()
        .iter()
        .filter(|e| matches!(e, SimEvent::StageStarted { .. }))
        .count();
    assert_eq!(started, 9);

    let evaluation = ctl.stage(StageName::ModelEvaluation).unwrap();
    assert_eq!(
        evaluation.metric("accuracy"),
        Some(&DetailValue::from("98.5%"))
    );
    assert_eq!(evaluation.metric("recall"), Some(&DetailValue::from("99.1%")));
}

// ─── Probabilistic policy ───────────────────────────────────────────────

#[test]
fn failing_roll_stops_the_run() {
    let mut ctl = controller(FailurePolicy::Probabilistic { success_rate: 0.9 }, 0.95);
    ctl.run();
    ctl.drain();

    assert_eq!(ctl.status(), RunStatus::Failed);
    let ingestion = ctl.stage(StageName::DataIngestion).unwrap();
    assert_eq!(ingestion.status, StageStatus::Failed);
    assert_eq!(
        ingestion.details.logs.last().map(String::as_str),
        Some("[ERROR] Stage Data Ingestion failed.")
    );
    assert_eq!(ingestion.metric("records_ingested"), None);
    assert_eq!(
        status_of(&ctl, StageName::DataPreprocessing),
        StageStatus::Pending
    );
}

#[test]
fn passing_roll_matches_deterministic_run() {
    let mut lucky = controller(FailurePolicy::Probabilistic { success_rate: 0.9 }, 0.5);
    let mut canonical = controller(FailurePolicy::Never, 0.5);
    for ctl in [&mut lucky, &mut canonical] {
        ctl.run();
        ctl.drain();
    }
    assert_eq!(lucky.status(), RunStatus::Completed);
    let a: Vec<_> = lucky.stages().cloned().collect();
    let b: Vec<_> = canonical.stages().cloned().collect();
    assert_eq!(a, b);
}
