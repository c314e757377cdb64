//! Notifications emitted while an environment runs.
//!
//! The controller queues these; hosts drain them with `take_events` to
//! update their UI or logs. They are informational only: the stage map is
//! always the source of truth.

use crate::sequencer::RunStatus;
use pv_core::{Environment, StageName, StageStatus};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SimEvent {
    RunStarted {
        environment: Environment,
    },
    StageStarted {
        stage: StageName,
    },
    /// The host should bring this stage's detail into view.
    StageFocused {
        stage: StageName,
    },
    LogAppended {
        stage: StageName,
        line: String,
        progress: u32,
    },
    StageFinished {
        stage: StageName,
        status: StageStatus,
    },
    RunFinished {
        environment: Environment,
        status: RunStatus,
    },
    Reset {
        environment: Environment,
    },
}
