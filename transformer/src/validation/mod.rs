//! JSON Schema validation for output schema documents.
//!
//! A custom output schema (see [`crate::models::OutputSchema`]) is checked
//! against the embedded `schemas/output-schema.json` (Draft 7) before it is
//! deserialized, so a malformed file is reported with every violation at once
//! instead of the first serde error.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use risreport::validation::validate_output_schema;
//!
//! let doc = json!({ "columns": [{ "name": "Sede", "rule": { "kind": "source" } }] });
//! assert!(validate_output_schema(&doc).is_ok());
//! ```

use serde_json::Value;

const OUTPUT_SCHEMA_FORMAT: &str = include_str!("../../schemas/output-schema.json");

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with every violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

fn output_schema_format() -> Result<Value, Vec<String>> {
    serde_json::from_str(OUTPUT_SCHEMA_FORMAT)
        .map_err(|e| vec![format!("Embedded schema format is not JSON: {}", e)])
}

/// Validate an output schema document.
pub fn validate_output_schema(document: &Value) -> Result<(), Vec<String>> {
    let format = output_schema_format()?;
    validate(&format, document)
}

/// Quick check of an output schema document.
pub fn is_valid_output_schema(document: &Value) -> bool {
    output_schema_format()
        .map(|format| is_valid(&format, document))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutputSchema;
    use serde_json::json;

    #[test]
    fn test_default_schema_is_valid() {
        let doc = serde_json::to_value(OutputSchema::report()).unwrap();
        assert!(validate_output_schema(&doc).is_ok());
    }

    #[test]
    fn test_constant_requires_value() {
        let doc = json!({
            "columns": [{ "name": "Valor unitario", "rule": { "kind": "constant" } }]
        });
        assert!(!is_valid_output_schema(&doc));
    }

    #[test]
    fn test_unknown_rule_kind() {
        let doc = json!({
            "columns": [{ "name": "Sede", "rule": { "kind": "lookup" } }]
        });
        let errors = validate_output_schema(&doc).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_sheet_name_rejects_forbidden_chars() {
        let doc = json!({
            "sheetName": "a/b",
            "columns": [{ "name": "Sede" }]
        });
        assert!(!is_valid_output_schema(&doc));
    }

    #[test]
    fn test_missing_columns_reports_error() {
        let errors = validate_output_schema(&json!({ "sheetName": "X" })).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("columns")));
    }
}
