pub const CLASSIFY: &str = r#"You are an AI document classifier for Indian loan applications.
Identify which document this is (e.g., Aadhaar Card, PAN Card, Driving License, Salary Slip, etc.)
Respond strictly in lowercase JSON format:
{"document_type": "<type>"}"#;

pub fn structure(text: &str, category: &str) -> String {
    format!(
        r#"You are an expert document analyzer and data extractor.
You are given text extracted from a scanned document.
Based on the folder type "{category}", convert the extracted text into a structured JSON.

Your task:
1. Identify details like names, addresses, IDs (Aadhaar, PAN, registration numbers), dates, amounts, companies, bank details, etc.
2. Output a **strictly valid JSON** (no markdown, no explanation).
3. Ensure hierarchical grouping where needed, with clear keys (e.g., name, aadhaar_number, address, date, etc.).

Document Text:
"""{text}""""#
    )
}

pub fn form_schema(html: &str, loan_type: &str) -> String {
    format!(
        r#"You are an AI that generates structured JSON schemas from HTML forms.

Here is an HTML form used for collecting {loan_type} information.

Your task:
- Analyze the <form> structure and its inputs.
- Create a JSON schema representing the logical data model.
- Group related inputs (e.g., identity_proof, address_proof, etc.)
- Include empty string values for fields that accept text input.
- Use nested JSON for grouped form sections (e.g., KYC, Income, Property Documents).
- Output only the JSON, no explanations.

HTML Form:
{html}"#
    )
}

pub fn field_mapping(html_fields: &[String], schema_keys: &[String], data_keys: &[String]) -> String {
    format!(
        r#"You are an expert in intelligent data mapping.

We have:
1. HTML form fields (to be filled automatically)
2. Form schema (defines what each field represents)
3. User data keys (from KYC, Income, Property docs)

### HTML Input Names:
{html_fields:?}

### Form Schema Keys:
{schema_keys:?}

### User Data Keys:
{data_keys:?}

Task:
Map each HTML input/select field name to the most relevant user data key.
Return pure JSON, no markdown or explanation."#
    )
}
