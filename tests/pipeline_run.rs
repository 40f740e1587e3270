mod common;

use common::StubEngine;
use loan_docflow::{
    oracle::{FixtureOracle, Oracle, Reply},
    pipeline::{Pipeline, Repair, Schema, StageContext},
};
use tempfile::tempdir;

#[test]
fn standard_stage_order() {
    assert_eq!(
        Pipeline::standard().stage_names(),
        ["organize", "extract", "repair", "schema", "map"]
    );
}

#[test]
fn missing_oracle_fails_only_the_stages_that_need_it() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    common::write(
        &cfg.json_output_dir().join("KYC_Docs.json"),
        r#"{"a.jpg": {"raw_response": "{\"n\": 1}"}}"#,
    );

    let ctx = StageContext::new(&cfg, &StubEngine, None)
        .oracle_unavailable("no oracle API key: set one of GOOGLE_API_KEY".into());
    let report = Pipeline::standard().run(&ctx);

    let status: Vec<(&str, bool)> = report
        .stages
        .iter()
        .map(|s| (s.stage.as_str(), s.ok))
        .collect();
    assert_eq!(
        status,
        [
            ("organize", false),
            ("extract", false),
            ("repair", true),
            ("schema", false),
            ("map", false),
        ]
    );
    let err = report.stages[0].error.as_deref().unwrap_or_default();
    assert!(err.contains("oracle unavailable"), "{err}");
    assert_eq!(report.stages[2].detail["repaired"], 1);
    assert!(cfg.json_corrected_dir().join("KYC_Docs.json").is_file());
}

#[test]
fn repair_with_nothing_extracted_is_ok_and_empty() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let oracle = FixtureOracle::new().on_complete("", Reply::Text("{}".into()));
    let ctx = StageContext::new(&cfg, &StubEngine, Some(&oracle as &dyn Oracle));

    let report = Pipeline::run_stage(&Repair, &ctx);
    assert!(report.ok, "{:?}", report.error);
    assert!(report.elapsed_secs >= 0.0);
    assert_eq!(report.detail["files"], 0);
    assert_eq!(report.detail["repaired"], 0);
}

#[test]
fn missing_form_fails_the_schema_stage() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let oracle = FixtureOracle::new().on_complete("", Reply::Text("{}".into()));
    let ctx = StageContext::new(&cfg, &StubEngine, Some(&oracle as &dyn Oracle));

    let report = Pipeline::run_stage(&Schema, &ctx);
    assert!(!report.ok);
    assert!(report.detail.is_null());
    let err = report.error.unwrap_or_default();
    assert!(err.contains("HTML form not found"), "{err}");
}
