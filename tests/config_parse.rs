use loan_docflow::config::Config;
use std::path::Path;

#[test]
fn parse_example_config() {
    let raw = include_str!("../loan-docflow.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.routing.loan_type, "Home Loan");
    assert_eq!(cfg.products.len(), 5);
    assert_eq!(cfg.extract.categories.len(), 5);
    assert!(cfg.routing.keywords.kyc_address.iter().any(|k| k == "aadhaar"));
}

#[test]
fn empty_file_yields_defaults() {
    let cfg: Config = toml::from_str("").expect("parse TOML");
    assert_eq!(cfg.paths.input_dir, "new_all_samples");
    assert_eq!(cfg.oracle.api_key_envs[0], "GOOGLE_API_KEY");
    assert_eq!(cfg.products.len(), 5);
    assert_eq!(cfg.tools.timeout_seconds, 120);
}

#[test]
fn partial_section_keeps_other_defaults() {
    let cfg: Config = toml::from_str(
        r#"
        [routing]
        loan_type = "Small Ticket Business Loan"
        "#,
    )
    .expect("parse TOML");
    assert_eq!(cfg.routing.input_extensions, ["jpg", "jpeg", "png", "pdf"]);
    let product = cfg.product("Small Ticket Business Loan").expect("product");
    assert!(product.categories.iter().any(|c| c == "Business Proof"));
}

#[test]
fn derived_paths() {
    let mut cfg = Config::default();
    cfg.paths.project_root = "/srv/loans".into();
    assert_eq!(
        cfg.loan_dir(),
        Path::new("/srv/loans/organized_docs/Home Loan")
    );
    assert_eq!(
        cfg.schema_path(),
        Path::new("/srv/loans/schema/form_schema.json")
    );
    assert_eq!(
        cfg.fill_plan_path(),
        Path::new("/srv/loans/form_fill/fill_plan.json")
    );
}
