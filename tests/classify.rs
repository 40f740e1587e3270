mod common;

use common::StubEngine;
use loan_docflow::{
    classify::{UNKNOWN_RESPONSE, classify, classify_raw, image_payload, scrape_label},
    document::Document,
    oracle::{FixtureOracle, Reply},
};
use tempfile::tempdir;

#[test]
fn scrape_reads_well_formed_json() {
    assert_eq!(scrape_label(r#"{"document_type": "PAN Card"}"#), "PAN Card");
    assert_eq!(
        scrape_label("```json\n{\"document_type\": \"Salary Slip\"}\n```"),
        "Salary Slip"
    );
}

#[test]
fn scrape_falls_back_to_last_colon() {
    assert_eq!(scrape_label(r#"document_type: "Voter ID""#), "Voter ID");
    assert_eq!(scrape_label("{document_type: Sale Deed}"), "Sale Deed");
    assert_eq!(scrape_label("Aadhaar Card"), "Aadhaar Card");
}

#[test]
fn scrape_empty_is_unknown() {
    assert_eq!(scrape_label(""), "unknown");
    assert_eq!(scrape_label(r#"{"document_type": ""}"#), "unknown");
    assert_eq!(scrape_label(UNKNOWN_RESPONSE), "unknown");
}

#[test]
fn image_payload_uses_media_type() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let png = dir.path().join("scan.png");
    common::write(&png, "PNGDATA");
    let doc = Document::open(&png).expect("open");
    let payload = image_payload(&cfg, &StubEngine, &doc).expect("payload");
    assert_eq!(payload.mime_type, "image/png");
    assert_eq!(payload.data, b"PNGDATA");
}

#[test]
fn pdf_is_rendered_as_png() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let pdf = dir.path().join("statement.pdf");
    common::write(&pdf, "BANK STATEMENT");
    let doc = Document::open(&pdf).expect("open");

    let oracle = FixtureOracle::new().on_label(
        b"BANK",
        Reply::Text(r#" {"document_type": "Bank Statement"} "#.into()),
    );
    let payload = image_payload(&cfg, &StubEngine, &doc).expect("payload");
    assert_eq!(payload.mime_type, "image/png");
    assert_eq!(
        classify(&cfg, &StubEngine, &oracle, &doc).expect("classify"),
        "Bank Statement"
    );
}

#[test]
fn oracle_failure_degrades_to_unknown() {
    let dir = tempdir().expect("tempdir");
    let cfg = common::config_at(dir.path());
    let jpg = dir.path().join("photo.jpg");
    common::write(&jpg, "anything");
    let doc = Document::open(&jpg).expect("open");

    let oracle = FixtureOracle::new().on_label(b"", Reply::Fail("connection reset".into()));
    let raw = classify_raw(&cfg, &StubEngine, &oracle, &doc).expect("classify");
    assert_eq!(raw, UNKNOWN_RESPONSE);
}
