mod common;

use common::StubEngine;
use loan_docflow::{
    extract::{extract_all, normalize_text},
    oracle::{FixtureOracle, Reply},
    repair::repair_dir,
    util::read_json,
};
use serde_json::{Value, json};
use tempfile::tempdir;

#[test]
fn extract_then_repair() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let loan = cfg.loan_dir();
    common::write(
        &loan.join("KYC Docs").join("aadhaar_card.jpg"),
        "Name: A\nAadhaar: 1234 5678",
    );
    common::write(
        &loan.join("Income Docs").join("salary_slip.pdf"),
        "NET PAY 1000\u{c}page two\u{c}",
    );
    common::write(&loan.join("Income Docs").join("blank.jpg"), "  \n ");

    let oracle = FixtureOracle::new()
        .on_structure(
            "Aadhaar: 1234",
            Reply::Text("```json\n{\"name\": \"A\"}\n```".into()),
        )
        .on_structure("NET PAY", Reply::Text(r#"{"net_pay": 1000}"#.into()));

    let report = extract_all(&cfg, &StubEngine, &oracle).expect("extract");
    assert_eq!(
        report.missing,
        ["Property Docs", "Business Proof", "Others"]
    );
    assert_eq!(report.folders.len(), 2);
    assert_eq!(report.folders[0].raw, 1);
    assert_eq!(report.folders[1].extracted, 1);
    assert_eq!(report.folders[1].skipped, ["blank.jpg"]);

    let out = cfg.json_output_dir();
    let kyc: Value = read_json(&out.join("KYC_Docs.json")).expect("kyc");
    assert_eq!(
        kyc,
        json!({"aadhaar_card.jpg": {"raw_response": "```json\n{\"name\": \"A\"}\n```"}})
    );
    let income: Value = read_json(&out.join("Income_Docs.json")).expect("income");
    assert_eq!(income, json!({"salary_slip.pdf": {"net_pay": 1000}}));

    let repaired = repair_dir(&out, &cfg.json_corrected_dir()).expect("repair");
    assert_eq!(repaired.repaired, 1);
    assert_eq!(repaired.untouched, 1);
    let fixed: Value = read_json(&cfg.json_corrected_dir().join("KYC_Docs.json")).expect("fixed");
    assert_eq!(fixed, json!({"aadhaar_card.jpg": {"name": "A"}}));
}

#[test]
fn structuring_failure_skips_the_document() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    common::write(
        &cfg.loan_dir().join("KYC Docs").join("pan_card.png"),
        "PAN ABCDE1234F",
    );
    let oracle = FixtureOracle::new().on_structure("PAN", Reply::Fail("quota exceeded".into()));

    let report = extract_all(&cfg, &StubEngine, &oracle).expect("extract");
    assert_eq!(report.folders[0].skipped, ["pan_card.png"]);
    let kyc: Value = read_json(&cfg.json_output_dir().join("KYC_Docs.json")).expect("kyc");
    assert_eq!(kyc, json!({}));
}

#[test]
fn missing_loan_folder_yields_an_empty_report() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let report = extract_all(&cfg, &StubEngine, &FixtureOracle::new()).expect("extract");
    assert!(report.folders.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.missing, cfg.extract.categories);
    assert!(!cfg.json_output_dir().exists());
}

#[test]
fn unwritable_output_is_reported_as_failed() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let loan = cfg.loan_dir();
    common::write(&loan.join("KYC Docs").join("pan_card.png"), "PAN ABCDE1234F");
    common::write(&loan.join("Income Docs").join("payslip.png"), "NET PAY 1000");
    // a directory where the KYC output file should go
    std::fs::create_dir_all(cfg.json_output_dir().join("KYC_Docs.json")).expect("mkdir");

    let oracle = FixtureOracle::new()
        .on_structure("PAN", Reply::Text(r#"{"pan": "ABCDE1234F"}"#.into()))
        .on_structure("NET PAY", Reply::Text(r#"{"net_pay": 1000}"#.into()));

    let report = extract_all(&cfg, &StubEngine, &oracle).expect("extract");
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].file, "KYC Docs");
    assert_eq!(report.folders.len(), 1);
    assert_eq!(report.folders[0].category, "Income Docs");
}

#[test]
fn text_normalization() {
    let cfg = common::config_at(std::path::Path::new("."));
    assert_eq!(
        normalize_text(&cfg, "  ﬁle no.  \r\nline two\t\r\n\n"),
        "file no.\nline two"
    );
}
