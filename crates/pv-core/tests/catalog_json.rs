//! Integration tests: catalog JSON loading and validation.

use pretty_assertions::assert_eq;
use pv_core::{
    ConfigError, DetailValue, Environment, PipelineCatalog, Stage, StageName, StageStatus,
};

#[test]
fn minimal_fixture_loads() {
    let catalog = PipelineCatalog::from_json(include_str!("fixtures/minimal.json")).unwrap();
    let dev = catalog.environment(Environment::Dev).expect("Dev missing");

    assert_eq!(
        dev.order,
        vec![StageName::DataIngestion, StageName::DataPreprocessing]
    );
    assert!(catalog.environment(Environment::Prod).is_none());

    let ingestion = &dev.stages[&StageName::DataIngestion];
    assert_eq!(ingestion.status, StageStatus::Pending);
    assert_eq!(
        ingestion.details.config.get("retries"),
        Some(&DetailValue::Number(3.0))
    );
    assert_eq!(catalog.scripts.get(StageName::DataIngestion).len(), 2);
}

#[test]
fn fixture_stage_matches_constructed_template() {
    let catalog = PipelineCatalog::from_json(include_str!("fixtures/minimal.json")).unwrap();
    let dev = catalog.environment(Environment::Dev).unwrap();
    let expected = Stage::new(
        StageName::DataPreprocessing,
        pv_core::Anchor::new(50.0, 75.0),
    );
    assert_eq!(dev.stages[&StageName::DataPreprocessing], expected);
}

#[test]
fn builtin_catalog_survives_json() {
    let catalog = PipelineCatalog::builtin();
    let json = catalog.to_json_pretty().unwrap();
    let reloaded = PipelineCatalog::from_json(&json).unwrap();
    assert_eq!(reloaded, catalog);
}

#[test]
fn malformed_json_is_reported() {
    let err = PipelineCatalog::from_json("{ \"environments\": [").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn dangling_order_entry_is_rejected_on_load() {
    let json = include_str!("fixtures/minimal.json").replace(
        r#""order": ["Data Ingestion", "Data Preprocessing"]"#,
        r#""order": ["Data Ingestion", "Model Evaluation"]"#,
    );
    let err = PipelineCatalog::from_json(&json).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Dev: execution order references missing stage Model Evaluation"
    );
}

#[test]
fn stage_entry_named_after_another_stage_is_rejected_on_load() {
    let json = include_str!("fixtures/minimal.json").replace(
        r#""name": "Data Ingestion""#,
        r#""name": "Monitoring""#,
    );
    let err = PipelineCatalog::from_json(&json).unwrap_err();
    assert!(matches!(err, ConfigError::StageKeyMismatch { .. }));
    assert_eq!(
        err.to_string(),
        "Dev: stage entry Data Ingestion is named Monitoring"
    );
}
