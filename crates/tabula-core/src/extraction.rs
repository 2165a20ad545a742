//! Turning an extraction model's JSON results into pending review records.
//!
//! The model is asked for a `{"results": [...]}` object with one entry per
//! requested field. Whatever comes back, the document ends up with exactly
//! one record per requested field so reviewers always see the full table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::record::ExtractedRecord;
use crate::schema::{SchemaField, default_fields};

/// A single field extracted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub field_name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub normalization: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsPayload {
    Wrapped { results: Vec<ExtractionResult> },
    Bare(Vec<ExtractionResult>),
}

/// Parse a model response: either `{"results": [...]}` or a bare array.
pub fn parse_results(json: &str) -> Result<Vec<ExtractionResult>, CoreError> {
    let payload: ResultsPayload =
        serde_json::from_str(json).map_err(|e| CoreError::InvalidResults(e.to_string()))?;
    Ok(match payload {
        ResultsPayload::Wrapped { results } => results,
        ResultsPayload::Bare(results) => results,
    })
}

/// Fields to extract for a project: its own schema, or the default set when empty.
pub fn effective_fields(project_id: i64, schema: &[SchemaField]) -> Vec<SchemaField> {
    if schema.is_empty() {
        default_fields(project_id)
    } else {
        schema.to_vec()
    }
}

/// Build one pending record per requested field, in schema order.
///
/// The first result carrying a field's name fills that record; fields the
/// model skipped get null value and confidence. Results for fields that were
/// not requested are dropped.
pub fn records_from_results(
    document_id: i64,
    fields: &[SchemaField],
    results: Vec<ExtractionResult>,
) -> Vec<ExtractedRecord> {
    let mut by_name: HashMap<String, ExtractionResult> = HashMap::with_capacity(results.len());
    for result in results {
        if !fields.iter().any(|f| f.field_name == result.field_name) {
            tracing::warn!(
                document_id,
                field = %result.field_name,
                "dropping result for unrequested field"
            );
            continue;
        }
        by_name.entry(result.field_name.clone()).or_insert(result);
    }

    fields
        .iter()
        .map(|field| match by_name.remove(&field.field_name) {
            Some(result) => {
                let mut record = ExtractedRecord::pending(
                    document_id,
                    &field.field_name,
                    result.value.filter(|v| !v.is_empty()),
                    result.confidence,
                );
                record.citation = result.citation;
                record.normalization = result.normalization;
                record
            }
            None => ExtractedRecord::pending(document_id, &field.field_name, None, None),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordStatus;
    use crate::schema::FieldType;

    fn field(name: &str) -> SchemaField {
        SchemaField {
            id: 0,
            project_id: 1,
            field_name: name.into(),
            field_description: String::new(),
            data_type: FieldType::String,
        }
    }

    #[test]
    fn parse_wrapped_results() {
        let json = r#"{"results": [
            {"field_name": "Parties", "value": "Acme Ltd; Beta LLP", "confidence": 0.92,
             "citation": "between Acme Ltd and Beta LLP", "normalization": "ACME LTD; BETA LLP"},
            {"field_name": "Governing Law", "value": null}
        ]}"#;
        let results = parse_results(json).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].confidence, Some(0.92));
        assert!(results[1].value.is_none());
        assert!(results[1].confidence.is_none());
    }

    #[test]
    fn parse_bare_array() {
        let json = r#"[{"field_name": "F1", "value": "A", "confidence": 0.9}]"#;
        let results = parse_results(json).unwrap();
        assert_eq!(results[0].field_name, "F1");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_results("not json"),
            Err(CoreError::InvalidResults(_))
        ));
        assert!(parse_results(r#"{"items": []}"#).is_err());
    }

    #[test]
    fn empty_schema_uses_defaults() {
        let fields = effective_fields(4, &[]);
        assert_eq!(fields.len(), 5);
        assert!(fields.iter().any(|f| f.field_name == "Governing Law"));
    }

    #[test]
    fn custom_schema_replaces_defaults() {
        let fields = effective_fields(4, &[field("Liability Cap")]);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_name, "Liability Cap");
    }

    #[test]
    fn one_record_per_field_with_nulls_for_missing() {
        let fields = vec![field("Parties"), field("Effective Date")];
        let results = vec![ExtractionResult {
            field_name: "Parties".into(),
            value: Some("Acme".into()),
            confidence: Some(0.8),
            citation: Some("Acme".into()),
            normalization: None,
        }];
        let records = records_from_results(9, &fields, results);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].field_name, "Parties");
        assert_eq!(records[0].value.as_deref(), Some("Acme"));
        assert_eq!(records[0].ai_value.as_deref(), Some("Acme"));
        assert_eq!(records[0].ai_confidence, Some(0.8));
        assert_eq!(records[0].citation.as_deref(), Some("Acme"));

        assert_eq!(records[1].field_name, "Effective Date");
        assert!(records[1].value.is_none());
        assert!(records[1].confidence.is_none());
        assert!(records.iter().all(|r| r.status == RecordStatus::Pending));
        assert!(records.iter().all(|r| r.document_id == 9));
    }

    #[test]
    fn unrequested_and_duplicate_results_dropped() {
        let fields = vec![field("Parties")];
        let results = vec![
            ExtractionResult {
                field_name: "Parties".into(),
                value: Some("first".into()),
                confidence: None,
                citation: None,
                normalization: None,
            },
            ExtractionResult {
                field_name: "Parties".into(),
                value: Some("second".into()),
                confidence: None,
                citation: None,
                normalization: None,
            },
            ExtractionResult {
                field_name: "Contract Title".into(),
                value: Some("NDA".into()),
                confidence: None,
                citation: None,
                normalization: None,
            },
        ];
        let records = records_from_results(1, &fields, results);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value.as_deref(), Some("first"));
    }
}
