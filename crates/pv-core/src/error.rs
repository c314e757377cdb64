//! Configuration errors.
//!
//! Loading and validating a catalog is the only fallible surface of the
//! core. Everything at runtime degrades to a silent no-op instead.

use crate::config::Environment;
use crate::model::StageName;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown environment `{0}`")]
    UnknownEnvironment(String),

    #[error("unknown stage `{0}`")]
    UnknownStage(String),

    #[error("environment {0} is defined more than once")]
    DuplicateEnvironment(Environment),

    #[error("{environment}: stage entry {key} is named {name}")]
    StageKeyMismatch {
        environment: Environment,
        key: StageName,
        name: StageName,
    },

    #[error("{environment}: execution order references missing stage {stage}")]
    OrderStageMissing {
        environment: Environment,
        stage: StageName,
    },

    #[error("{environment}: stage {stage} appears more than once in the execution order")]
    DuplicateOrderStage {
        environment: Environment,
        stage: StageName,
    },

    #[error("{environment}: edge {from} -> {to} references a missing stage")]
    EdgeEndpointMissing {
        environment: Environment,
        from: StageName,
        to: StageName,
    },

    #[error("no message script for stage {0}")]
    MissingScript(StageName),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
