//! Real-time driver and terminal report.

use pv_engine::{
    EnvironmentController, FailurePolicy, RunStatus, SimEvent, SimulationSettings,
};
use std::fmt::Write as _;
use std::time::Duration;

pub fn settings(success_rate: Option<f64>) -> SimulationSettings {
    SimulationSettings {
        failure: match success_rate {
            Some(success_rate) => FailurePolicy::Probabilistic { success_rate },
            None => FailurePolicy::Never,
        },
        ..SimulationSettings::default()
    }
}

/// Start a run and sleep between due timers until it finishes. A `speed`
/// of zero (or less) skips the sleeps.
pub async fn drive(controller: &mut EnvironmentController, speed: f64) {
    controller.run();
    report(controller);

    while controller.status() == RunStatus::Running {
        let Some(due) = controller.next_due() else {
            break;
        };
        if speed > 0.0 {
            let wait_ms = due.saturating_sub(controller.now()) as f64 / speed;
            tokio::time::sleep(Duration::from_secs_f64(wait_ms / 1000.0)).await;
        }
        controller.advance_to(due);
        report(controller);
    }
}

fn report(controller: &mut EnvironmentController) {
    let env = controller.environment();
    for event in controller.take_events() {
        match event {
            SimEvent::RunStarted { .. } => log::info!("[{env}] run started"),
            SimEvent::StageStarted { stage } => log::info!("[{env}] {stage}: started"),
            SimEvent::LogAppended {
                stage,
                line,
                progress,
            } => log::info!("[{env}] {stage}: {line} ({progress}%)"),
            SimEvent::StageFinished { stage, status } => {
                log::info!("[{env}] {stage}: {status}")
            }
            SimEvent::RunFinished { status, .. } => log::info!("[{env}] run {status}"),
            SimEvent::StageFocused { .. } | SimEvent::Reset { .. } => {}
        }
    }
}

/// One line per stage in execution order, then the run status.
pub fn summary(controller: &EnvironmentController) -> String {
    let mut out = String::new();
    for &name in controller.graph().order() {
        let Some(stage) = controller.stage(name) else {
            continue;
        };
        let metrics: Vec<String> = stage
            .details
            .metrics
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        let _ = writeln!(
            out,
            "{:<22} {:<8} {}",
            name.label(),
            stage.status.to_string(),
            metrics.join(" ")
        );
    }
    let _ = writeln!(
        out,
        "{}: {}",
        controller.environment(),
        controller.status().label()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use pv_core::{Environment, PipelineCatalog};

    #[tokio::test]
    async fn instant_drive_completes() {
        let mut controller =
            EnvironmentController::from_catalog(&PipelineCatalog::builtin(), Environment::Beta)
                .unwrap();
        drive(&mut controller, 0.0).await;
        assert_eq!(controller.status(), RunStatus::Completed);

        let text = summary(&controller);
        assert!(text.contains("Model Versioning"));
        assert!(text.contains("new_version=v1."));
        assert!(text.ends_with("Beta: Success\n"));
    }

    #[tokio::test]
    async fn certain_failure_stops_at_first_stage() {
        let mut controller =
            EnvironmentController::from_catalog(&PipelineCatalog::builtin(), Environment::Dev)
                .unwrap()
                .with_settings(settings(Some(0.0)));
        drive(&mut controller, 0.0).await;
        assert_eq!(controller.status(), RunStatus::Failed);
        assert!(summary(&controller).ends_with("Dev: Failed\n"));
    }
}
