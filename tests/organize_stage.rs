mod common;

use common::StubEngine;
use loan_docflow::{
    oracle::{FixtureOracle, Reply},
    organize::organize,
    route::Category,
};
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn oracle() -> FixtureOracle {
    FixtureOracle::new()
        .on_label(
            b"AADHAAR-IMG",
            Reply::Text(r#"{"document_type": "aadhaar card"}"#.into()),
        )
        .on_label(
            b"PAYSLIP",
            Reply::Text("```json\n{\"document_type\": \"Salary Slip\"}\n```".into()),
        )
        .on_label(b"MYSTERY", Reply::Fail("network down".into()))
}

#[test]
fn routes_every_accepted_input() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let input = dir.path().join("new_all_samples");
    common::write(&input.join("scan1.jpg"), "AADHAAR-IMG");
    common::write(&input.join("scan2.pdf"), "PAYSLIP");
    common::write(&input.join("scan3.png"), "MYSTERY");
    common::write(&input.join("notes.txt"), "AADHAAR-IMG");

    let report = organize(&cfg, &StubEngine, &oracle()).expect("organize");
    assert!(report.failed.is_empty());
    assert_eq!(report.routed.len(), 3);

    let loan = dir.path().join("organized_docs").join("Home Loan");
    let kyc = loan.join("KYC Docs").join("aadhaar_card.jpg");
    let income = loan.join("Income Docs").join("salary_slip.pdf");
    let others = loan.join("Others").join("unknown.png");
    assert!(kyc.is_file());
    assert!(income.is_file());
    assert!(others.is_file());

    assert!(!input.join("scan1.jpg").exists());
    assert!(!input.join("scan2.pdf").exists());
    assert!(!input.join("scan3.png").exists());
    assert!(input.join("notes.txt").exists());

    let first = &report.routed[0];
    assert_eq!(first.category, Category::Kyc);
    assert_eq!(first.label, "aadhaar card");
    assert_eq!(first.destination, kyc);
    assert_eq!(
        first.sha256,
        format!("{:x}", Sha256::digest(b"AADHAAR-IMG"))
    );

    assert_eq!(report.routed[2].category, Category::Others);
    assert_eq!(report.routed[2].label, "unknown");
    assert_eq!(report.missing_expected, ["Property Docs"]);
    assert_eq!(report.unexpected, ["Others"]);
}

#[test]
fn duplicate_labels_get_numbered() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let input = dir.path().join("new_all_samples");
    common::write(&input.join("a.jpg"), "AADHAAR-IMG front");
    common::write(&input.join("b.jpg"), "AADHAAR-IMG back");

    let report = organize(&cfg, &StubEngine, &oracle()).expect("organize");
    let names: Vec<String> = report
        .routed
        .iter()
        .map(|r| r.destination.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["aadhaar_card.jpg", "aadhaar_card_2.jpg"]);
}

#[test]
fn missing_input_folder_is_not_an_error() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let report = organize(&cfg, &StubEngine, &oracle()).expect("organize");
    assert!(report.routed.is_empty());
    assert!(!dir.path().join("organized_docs").exists());
}
