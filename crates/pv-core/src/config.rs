//! Static pipeline catalog: per-environment stage layouts, render edges,
//! execution orders and the per-stage message scripts.
//!
//! The catalog is immutable once loaded. Controllers receive their
//! environment's configuration behind an `Arc` and never write to it.

use crate::error::{ConfigError, Result};
use crate::model::{Anchor, Stage, StageName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// ─── Environments ────────────────────────────────────────────────────────

/// The four fixed deployment contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Environment {
    Dev,
    Beta,
    Preprod,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Dev,
        Environment::Beta,
        Environment::Preprod,
        Environment::Prod,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Environment::Dev => "Dev",
            Environment::Beta => "Beta",
            Environment::Preprod => "Preprod",
            Environment::Prod => "Prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Environment::ALL
            .into_iter()
            .find(|env| env.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownEnvironment(s.to_string()))
    }
}

// ─── Environment configuration ───────────────────────────────────────────

/// Immutable description of one environment's pipeline.
///
/// `connections` is only drawn; `order` is only executed. Neither is
/// derived from the other, so a feedback edge back to the first stage
/// never causes re-execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub environment: Environment,
    /// Initial stage templates, keyed by stage kind.
    pub stages: BTreeMap<StageName, Stage>,
    pub connections: Vec<(StageName, StageName)>,
    pub order: Vec<StageName>,
}

impl EnvironmentConfig {
    /// Build a configuration from `(stage, top%, left%)` placements.
    pub fn new(
        environment: Environment,
        placements: &[(StageName, f32, f32)],
        connections: &[(StageName, StageName)],
        order: &[StageName],
    ) -> Self {
        let stages = placements
            .iter()
            .map(|&(name, top, left)| (name, Stage::new(name, Anchor::new(top, left))))
            .collect();
        Self {
            environment,
            stages,
            connections: connections.to_vec(),
            order: order.to_vec(),
        }
    }

    /// Check that each stage entry is named after its key, that every order
    /// entry and edge endpoint exists in the stage set, and that no stage is
    /// executed twice.
    pub fn validate(&self) -> Result<()> {
        let environment = self.environment;
        for (&key, stage) in &self.stages {
            if stage.name != key {
                return Err(ConfigError::StageKeyMismatch {
                    environment,
                    key,
                    name: stage.name,
                });
            }
        }
        let mut seen = BTreeSet::new();
        for &stage in &self.order {
            if !self.stages.contains_key(&stage) {
                return Err(ConfigError::OrderStageMissing { environment, stage });
            }
            if !seen.insert(stage) {
                return Err(ConfigError::DuplicateOrderStage { environment, stage });
            }
        }
        for &(from, to) in &self.connections {
            if !self.stages.contains_key(&from) || !self.stages.contains_key(&to) {
                return Err(ConfigError::EdgeEndpointMissing {
                    environment,
                    from,
                    to,
                });
            }
        }
        Ok(())
    }
}

// ─── Message scripts ─────────────────────────────────────────────────────

/// Canned log lines emitted while a stage runs, keyed by stage kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageScripts(BTreeMap<StageName, Vec<String>>);

impl MessageScripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the script for one stage kind.
    pub fn insert<I, S>(&mut self, stage: StageName, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(stage, messages.into_iter().map(Into::into).collect());
    }

    /// The script for a stage kind; empty when none is configured.
    pub fn get(&self, stage: StageName) -> &[String] {
        self.0.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The scripts shipped with the built-in catalog.
    pub fn builtin() -> Self {
        use StageName::*;
        let mut scripts = Self::new();
        scripts.insert(
            DataIngestion,
            [
                "Connecting to data sources...",
                "Validating data schema...",
                "Ingesting 1M records...",
                "Data ingestion complete.",
            ],
        );
        scripts.insert(
            DataPreprocessing,
            [
                "Cleaning and normalizing data...",
                "Handling missing values...",
                "Feature engineering in progress...",
                "Data preprocessing successful.",
            ],
        );
        scripts.insert(
            ModelFineTuning,
            [
                "Starting fine-tuning job on Gemini...",
                "Epoch 1/5 completed.",
                "Epoch 2/5 completed.",
                "Epoch 3/5 completed.",
                "Epoch 4/5 completed.",
                "Epoch 5/5 completed. Finalizing model.",
            ],
        );
        scripts.insert(
            ModelEvaluation,
            [
                "Running model against test dataset...",
                "Calculating accuracy: 98.5%",
                "Calculating precision: 97.2%",
                "Calculating recall: 99.1%",
                "Evaluation metrics meet thresholds.",
            ],
        );
        scripts.insert(
            ModelVersioning,
            [
                "Creating new model version: v1.2.0...",
                "Tagging model in registry...",
                "Storing model artifacts...",
                "Versioning complete.",
            ],
        );
        scripts.insert(
            DeploymentStaging,
            [
                "Provisioning staging environment...",
                "Deploying model v1.2.0 to staging...",
                "Running smoke tests...",
                "Staging deployment successful.",
            ],
        );
        scripts.insert(
            DeploymentProduction,
            [
                "Initiating blue/green deployment...",
                "Routing 10% of traffic to new model...",
                "Monitoring initial production metrics...",
                "Shifting 100% traffic to v1.2.0. Deployment complete.",
            ],
        );
        scripts.insert(
            Monitoring,
            [
                "Monitoring for performance degradation...",
                "Analyzing user interaction patterns...",
                "No anomalies detected.",
                "Live monitoring active.",
            ],
        );
        scripts.insert(
            HumanFeedback,
            [
                "Collecting user feedback...",
                "Aggregating feedback data...",
                "Identifying areas for model improvement...",
                "Feedback loop integrated.",
            ],
        );
        scripts
    }
}

// ─── Catalog ─────────────────────────────────────────────────────────────

/// All environments plus the scripts they share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineCatalog {
    pub environments: Vec<EnvironmentConfig>,
    pub scripts: MessageScripts,
}

impl PipelineCatalog {
    /// Parse and validate a catalog from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: PipelineCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        log::debug!(
            "loaded catalog with {} environment(s)",
            catalog.environments.len()
        );
        Ok(catalog)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn environment(&self, environment: Environment) -> Option<&EnvironmentConfig> {
        self.environments
            .iter()
            .find(|c| c.environment == environment)
    }

    /// Validate every environment and check each executed stage has a
    /// non-empty script.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for config in &self.environments {
            if !seen.insert(config.environment) {
                return Err(ConfigError::DuplicateEnvironment(config.environment));
            }
            config.validate()?;
            for &stage in &config.order {
                if self.scripts.get(stage).is_empty() {
                    return Err(ConfigError::MissingScript(stage));
                }
            }
        }
        Ok(())
    }

    /// The stock catalog: four environments of
    /// growing size, Prod closing the loop from feedback back to ingestion.
    pub fn builtin() -> Self {
        use StageName::*;

        let dev = EnvironmentConfig::new(
            Environment::Dev,
            &[
                (DataIngestion, 30.0, 20.0),
                (DataPreprocessing, 30.0, 50.0),
                (ModelFineTuning, 30.0, 80.0),
                (ModelEvaluation, 70.0, 50.0),
            ],
            &[
                (DataIngestion, DataPreprocessing),
                (DataPreprocessing, ModelFineTuning),
                (ModelFineTuning, ModelEvaluation),
            ],
            &[DataIngestion, DataPreprocessing, ModelFineTuning, ModelEvaluation],
        );

        let beta = EnvironmentConfig::new(
            Environment::Beta,
            &[
                (DataIngestion, 25.0, 15.0),
                (DataPreprocessing, 25.0, 40.0),
                (ModelFineTuning, 25.0, 65.0),
                (ModelEvaluation, 60.0, 65.0),
                (ModelVersioning, 60.0, 40.0),
                (DeploymentStaging, 60.0, 15.0),
            ],
            &[
                (DataIngestion, DataPreprocessing),
                (DataPreprocessing, ModelFineTuning),
                (ModelFineTuning, ModelEvaluation),
                (ModelEvaluation, ModelVersioning),
                (ModelVersioning, DeploymentStaging),
            ],
            &[
                DataIngestion,
                DataPreprocessing,
                ModelFineTuning,
                ModelEvaluation,
                ModelVersioning,
                DeploymentStaging,
            ],
        );

        let preprod = EnvironmentConfig::new(
            Environment::Preprod,
            &[
                (DataIngestion, 20.0, 10.0),
                (DataPreprocessing, 20.0, 30.0),
                (ModelFineTuning, 20.0, 50.0),
                (ModelEvaluation, 20.0, 70.0),
                (ModelVersioning, 20.0, 90.0),
                (DeploymentStaging, 65.0, 35.0),
                (DeploymentProduction, 65.0, 65.0),
            ],
            &[
                (DataIngestion, DataPreprocessing),
                (DataPreprocessing, ModelFineTuning),
                (ModelFineTuning, ModelEvaluation),
                (ModelEvaluation, ModelVersioning),
                (ModelVersioning, DeploymentStaging),
                (DeploymentStaging, DeploymentProduction),
            ],
            &[
                DataIngestion,
                DataPreprocessing,
                ModelFineTuning,
                ModelEvaluation,
                ModelVersioning,
                DeploymentStaging,
                DeploymentProduction,
            ],
        );

        let prod = EnvironmentConfig::new(
            Environment::Prod,
            &[
                (DataIngestion, 15.0, 15.0),
                (DataPreprocessing, 15.0, 50.0),
                (ModelFineTuning, 15.0, 85.0),
                (ModelEvaluation, 50.0, 85.0),
                (ModelVersioning, 50.0, 50.0),
                (DeploymentStaging, 50.0, 15.0),
                (DeploymentProduction, 85.0, 15.0),
                (Monitoring, 85.0, 50.0),
                (HumanFeedback, 85.0, 85.0),
            ],
            &[
                (DataIngestion, DataPreprocessing),
                (DataPreprocessing, ModelFineTuning),
                (ModelFineTuning, ModelEvaluation),
                (ModelEvaluation, ModelVersioning),
                (ModelVersioning, DeploymentStaging),
                (DeploymentStaging, DeploymentProduction),
                (DeploymentProduction, Monitoring),
                (Monitoring, HumanFeedback),
                (HumanFeedback, DataIngestion),
            ],
            &StageName::ALL,
        );

        Self {
            environments: vec![dev, beta, preprod, prod],
            scripts: MessageScripts::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = PipelineCatalog::builtin();
        catalog.validate().unwrap();
        assert_eq!(catalog.environments.len(), 4);
    }

    #[test]
    fn builtin_script_lengths() {
        let scripts = MessageScripts::builtin();
        for stage in StageName::ALL {
            let n = scripts.get(stage).len();
            assert!((3..=6).contains(&n), "{stage} has {n} messages");
        }
        assert_eq!(scripts.get(StageName::ModelFineTuning).len(), 6);
    }

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!("PREPROD".parse::<Environment>().unwrap(), Environment::Preprod);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn validate_rejects_missing_order_stage() {
        let config = EnvironmentConfig::new(
            Environment::Dev,
            &[(StageName::DataIngestion, 50.0, 50.0)],
            &[],
            &[StageName::DataIngestion, StageName::Monitoring],
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OrderStageMissing {
                stage: StageName::Monitoring,
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_stage_named_after_another_key() {
        let mut config = EnvironmentConfig::new(
            Environment::Dev,
            &[
                (StageName::DataIngestion, 25.0, 50.0),
                (StageName::DataPreprocessing, 75.0, 50.0),
            ],
            &[(StageName::DataIngestion, StageName::DataPreprocessing)],
            &[StageName::DataIngestion, StageName::DataPreprocessing],
        );
        config.validate().unwrap();

        config
            .stages
            .get_mut(&StageName::DataIngestion)
            .unwrap()
            .name = StageName::Monitoring;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::StageKeyMismatch {
                key: StageName::DataIngestion,
                name: StageName::Monitoring,
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_dangling_edge() {
        let config = EnvironmentConfig::new(
            Environment::Beta,
            &[(StageName::DataIngestion, 50.0, 50.0)],
            &[(StageName::DataIngestion, StageName::ModelEvaluation)],
            &[StageName::DataIngestion],
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EdgeEndpointMissing { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_order_entry() {
        let config = EnvironmentConfig::new(
            Environment::Dev,
            &[(StageName::DataIngestion, 50.0, 50.0)],
            &[],
            &[StageName::DataIngestion, StageName::DataIngestion],
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateOrderStage { .. })
        ));
    }

    #[test]
    fn catalog_requires_scripts_for_executed_stages() {
        let mut catalog = PipelineCatalog::builtin();
        catalog.scripts = MessageScripts::new();
        assert!(matches!(
            catalog.validate(),
            Err(ConfigError::MissingScript(StageName::DataIngestion))
        ));
    }
}
