use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub routing: Routing,
    #[serde(default = "default_products")]
    pub products: Vec<LoanProduct>,
    #[serde(default)]
    pub classify: Classify,
    #[serde(default)]
    pub extract: Extract,
    #[serde(default)]
    pub oracle: Oracle,
    #[serde(default)]
    pub tools: Tools,
    #[serde(default)]
    pub form: Form,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global: Default::default(),
            paths: Default::default(),
            routing: Default::default(),
            products: default_products(),
            classify: Default::default(),
            extract: Default::default(),
            oracle: Default::default(),
            tools: Default::default(),
            form: Default::default(),
            output: Default::default(),
            logging: Default::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Resolves a configured path against `paths.project_root`.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        Path::new(&self.paths.project_root).join(rel)
    }

    pub fn input_dir(&self) -> PathBuf {
        self.resolve(&self.paths.input_dir)
    }

    pub fn organized_dir(&self) -> PathBuf {
        self.resolve(&self.paths.organized_dir)
    }

    /// `organized_docs/<loan_type>`
    pub fn loan_dir(&self) -> PathBuf {
        self.organized_dir().join(&self.routing.loan_type)
    }

    pub fn json_output_dir(&self) -> PathBuf {
        self.resolve(&self.paths.json_output_dir)
    }

    pub fn json_corrected_dir(&self) -> PathBuf {
        self.resolve(&self.paths.json_corrected_dir)
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.resolve(&self.paths.schema_dir)
    }

    pub fn form_path(&self) -> PathBuf {
        self.resolve(&self.paths.forms_dir).join(&self.form.html_file)
    }

    /// `schema/<form_stem>_schema.json`
    pub fn schema_path(&self) -> PathBuf {
        let stem = Path::new(&self.form.html_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("form");
        self.schema_dir().join(format!("{stem}_schema.json"))
    }

    pub fn fill_plan_path(&self) -> PathBuf {
        self.resolve(&self.paths.fill_dir).join(&self.form.fill_plan_file)
    }

    pub fn work_dir(&self) -> PathBuf {
        self.resolve(&self.paths.work_dir)
    }

    pub fn product(&self, name: &str) -> Option<&LoanProduct> {
        self.products.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub project_root: String,
    pub input_dir: String,
    pub organized_dir: String,
    pub json_output_dir: String,
    pub json_corrected_dir: String,
    pub schema_dir: String,
    pub forms_dir: String,
    pub fill_dir: String,
    pub work_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            project_root: ".".into(),
            input_dir: "new_all_samples".into(),
            organized_dir: "organized_docs".into(),
            json_output_dir: "json_output".into(),
            json_corrected_dir: "json_corrected".into(),
            schema_dir: "schema".into(),
            forms_dir: "forms".into(),
            fill_dir: "form_fill".into(),
            work_dir: ".loan-docflow-work".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Routing {
    pub loan_type: String,
    pub input_extensions: Vec<String>,
    pub keywords: Keywords,
}
impl Default for Routing {
    fn default() -> Self {
        Self {
            loan_type: "Home Loan".into(),
            input_extensions: strings(&["jpg", "jpeg", "png", "pdf"]),
            keywords: Default::default(),
        }
    }
}

/// Keyword phrases per category. The three KYC lists are merged into one
/// bucket at routing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub kyc_identity: Vec<String>,
    pub kyc_address: Vec<String>,
    pub kyc_age: Vec<String>,
    pub income: Vec<String>,
    pub property: Vec<String>,
    pub business: Vec<String>,
}
impl Default for Keywords {
    fn default() -> Self {
        Self {
            kyc_identity: strings(&[
                "voter id",
                "passport",
                "driving license",
                "pan card",
                "employee id",
            ]),
            kyc_address: strings(&[
                "passport",
                "ration card",
                "voter id",
                "employee id",
                "driving license",
                "telephone bill",
                "gas bill",
                "aadhaar",
                "aadhar card",
            ]),
            kyc_age: strings(&[
                "school leaving certificate",
                "passport",
                "driving license",
                "voter id",
                "birth certificate",
                "lic policy",
                "pan card",
                "aadhaar",
                "aadhar card",
            ]),
            income: strings(&[
                "salary slip",
                "form 16",
                "bank statement",
                "income tax return",
                "payslip",
            ]),
            property: strings(&[
                "sale deed",
                "agreement",
                "property tax",
                "electricity bill",
                "possession letter",
                "allotment letter",
            ]),
            business: strings(&[
                "gst certificate",
                "shop act license",
                "partnership deed",
                "udhyam registration",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanProduct {
    pub name: String,
    pub categories: Vec<String>,
}

fn default_products() -> Vec<LoanProduct> {
    let housing = ["KYC Docs", "Income Docs", "Property Docs"];
    let business = ["KYC Docs", "Income Docs", "Business Proof"];
    [
        ("Home Loan", housing),
        ("Small Ticket Home Loan", housing),
        ("Home Improvement Loans", housing),
        ("Small Ticket Business Loan", business),
        ("Loan Against Property", housing),
    ]
    .into_iter()
    .map(|(name, cats)| LoanProduct {
        name: name.into(),
        categories: strings(&cats),
    })
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Classify {
    pub render_scale: f32,
    pub fallback_media_type: String,
}
impl Default for Classify {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            fallback_media_type: "image/jpeg".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Extract {
    pub categories: Vec<String>,
    pub ocr_lang: String,
    pub normalize_unicode: bool,
    pub trim_trailing_whitespace: bool,
}
impl Default for Extract {
    fn default() -> Self {
        Self {
            categories: strings(&[
                "KYC Docs",
                "Income Docs",
                "Property Docs",
                "Business Proof",
                "Others",
            ]),
            ocr_lang: "eng".into(),
            normalize_unicode: true,
            trim_trailing_whitespace: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Oracle {
    pub model: String,
    pub base_url: String,
    pub api_key_envs: Vec<String>,
    /// 0 disables the client-side timeout.
    pub timeout_seconds: u64,
}
impl Default for Oracle {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key_envs: strings(&["GOOGLE_API_KEY", "GEMINI_API_KEY", "GENIE_API_KEY"]),
            timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub pdftoppm: String,
    pub pdftotext: String,
    pub tesseract: String,
    pub timeout_seconds: u64,
}
impl Default for Tools {
    fn default() -> Self {
        Self {
            pdftoppm: "pdftoppm".into(),
            pdftotext: "pdftotext".into(),
            tesseract: "tesseract".into(),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Form {
    pub html_file: String,
    pub fill_plan_file: String,
}
impl Default for Form {
    fn default() -> Self {
        Self {
            html_file: "form.html".into(),
            fill_plan_file: "fill_plan.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_run_report: bool,
    pub run_report_file: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_run_report: true,
            run_report_file: "run-report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
