//! Core data model for pipeline stages.
//!
//! A pipeline is a fixed vocabulary of nine stage kinds. Each environment
//! instantiates a subset of them as `Stage` values, positioned with
//! percentage anchors on the canvas and carrying their own logs, metrics
//! and (read-only) configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ─── Stage vocabulary ────────────────────────────────────────────────────

/// The closed set of stage kinds. Declaration order is the canonical
/// paint order and the iteration order of stage maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageName {
    #[serde(rename = "Data Ingestion")]
    DataIngestion,
    #[serde(rename = "Data Preprocessing")]
    DataPreprocessing,
    #[serde(rename = "Model Fine-Tuning")]
    ModelFineTuning,
    #[serde(rename = "Model Evaluation")]
    ModelEvaluation,
    #[serde(rename = "Model Versioning")]
    ModelVersioning,
    #[serde(rename = "Deployment Staging")]
    DeploymentStaging,
    #[serde(rename = "Deployment Production")]
    DeploymentProduction,
    #[serde(rename = "Monitoring")]
    Monitoring,
    #[serde(rename = "Human Feedback")]
    HumanFeedback,
}

impl StageName {
    pub const ALL: [StageName; 9] = [
        StageName::DataIngestion,
        StageName::DataPreprocessing,
        StageName::ModelFineTuning,
        StageName::ModelEvaluation,
        StageName::ModelVersioning,
        StageName::DeploymentStaging,
        StageName::DeploymentProduction,
        StageName::Monitoring,
        StageName::HumanFeedback,
    ];

    /// Human-readable label, also the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            StageName::DataIngestion => "Data Ingestion",
            StageName::DataPreprocessing => "Data Preprocessing",
            StageName::ModelFineTuning => "Model Fine-Tuning",
            StageName::ModelEvaluation => "Model Evaluation",
            StageName::ModelVersioning => "Model Versioning",
            StageName::DeploymentStaging => "Deployment Staging",
            StageName::DeploymentProduction => "Deployment Production",
            StageName::Monitoring => "Monitoring",
            StageName::HumanFeedback => "Human Feedback",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StageName {
    type Err = ConfigError;

    /// Accepts the display label (`"Model Evaluation"`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StageName::ALL
            .into_iter()
            .find(|name| name.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownStage(s.to_string()))
    }
}

/// Lifecycle of a single stage within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
}

impl StageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Success | StageStatus::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageStatus::Pending => "Pending",
            StageStatus::Running => "Running",
            StageStatus::Success => "Success",
            StageStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

// ─── Details ─────────────────────────────────────────────────────────────

/// A metric or config value: text, number or flag.
///
/// Serialized untagged so catalogs read naturally:
/// `{"timeout": "60s", "retries": 3, "gpu-enabled": true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl DetailValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DetailValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DetailValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailValue::Flag(b) => write!(f, "{b}"),
            DetailValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            DetailValue::Number(n) => write!(f, "{n}"),
            DetailValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DetailValue {
    fn from(s: &str) -> Self {
        DetailValue::Text(s.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(s: String) -> Self {
        DetailValue::Text(s)
    }
}

impl From<f64> for DetailValue {
    fn from(n: f64) -> Self {
        DetailValue::Number(n)
    }
}

impl From<bool> for DetailValue {
    fn from(b: bool) -> Self {
        DetailValue::Flag(b)
    }
}

/// Everything the detail panel shows for a stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageDetails {
    /// Append-only during a run; replaced when a stage (re)starts.
    pub logs: Vec<String>,
    pub metrics: BTreeMap<String, DetailValue>,
    /// Static stage configuration. Never touched by the simulation.
    pub config: BTreeMap<String, DetailValue>,
}

// ─── Stage ───────────────────────────────────────────────────────────────

/// Percentage anchor of a node's center within the canvas container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// 0.0 ..= 100.0, measured from the top edge.
    pub top: f32,
    /// 0.0 ..= 100.0, measured from the left edge.
    pub left: f32,
}

impl Anchor {
    pub const fn new(top: f32, left: f32) -> Self {
        Self { top, left }
    }
}

/// One named step of a simulated pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: StageName,
    pub status: StageStatus,
    pub position: Anchor,
    pub details: StageDetails,
}

impl Stage {
    /// A freshly initialized stage: pending, one init log line, zero
    /// progress and the default runtime config.
    pub fn new(name: StageName, position: Anchor) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert("progress".to_string(), DetailValue::from("0%"));

        let mut config = BTreeMap::new();
        config.insert("timeout".to_string(), DetailValue::from("60s"));
        config.insert("retries".to_string(), DetailValue::from(3.0));
        config.insert("gpu-enabled".to_string(), DetailValue::from(true));

        Self {
            name,
            status: StageStatus::Pending,
            position,
            details: StageDetails {
                logs: vec![format!("Stage {name} initialized.")],
                metrics,
                config,
            },
        }
    }

    pub fn metric(&self, key: &str) -> Option<&DetailValue> {
        self.details.metrics.get(key)
    }
}
