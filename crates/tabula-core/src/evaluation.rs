//! Accuracy evaluation of AI extraction against human review.
//!
//! Compares each reviewed record's final value with the value the model
//! originally produced, project-wide and per field name. The computation is
//! a single pass over the records; nothing is cached between calls, so
//! callers re-evaluate after every review to see fresh numbers.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::record::ExtractedRecord;

/// Project-wide accuracy statistics plus a per-field breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationStats {
    pub total_fields: usize,
    pub reviewed_fields: usize,
    pub correct_fields: usize,
    /// Whole-number percentage in `[0, 100]`; 0 when nothing is reviewed.
    #[serde(deserialize_with = "deserialize_percent")]
    pub accuracy: u32,
    /// One entry per distinct field name, in first-seen order.
    #[serde(default)]
    pub field_breakdown: Vec<FieldBreakdown>,
}

/// Accuracy statistics scoped to a single field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBreakdown {
    pub field_name: String,
    pub total: usize,
    pub reviewed: usize,
    #[serde(default)]
    pub correct: usize,
    #[serde(deserialize_with = "deserialize_percent")]
    pub accuracy: u32,
}

/// Running counts for one aggregation scope.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    total: usize,
    reviewed: usize,
    correct: usize,
}

impl Tally {
    fn add(&mut self, record: &ExtractedRecord) {
        self.total += 1;
        if record.is_reviewed() {
            self.reviewed += 1;
            if record.is_correct() {
                self.correct += 1;
            }
        }
    }

    fn accuracy(&self) -> u32 {
        accuracy_percent(self.correct, self.reviewed)
    }
}

/// `round(100 * correct / reviewed)` with halves rounded up, or 0 when
/// `reviewed` is 0. Integer arithmetic only, clamped to 100.
pub fn accuracy_percent(correct: usize, reviewed: usize) -> u32 {
    if reviewed == 0 {
        return 0;
    }
    let correct = correct.min(reviewed) as u64;
    let reviewed = reviewed as u64;
    ((correct * 200 + reviewed) / (reviewed * 2)) as u32
}

/// Accept integer or float percentages (the REST backend reports `50.0`).
fn deserialize_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Ok(0);
    }
    Ok((raw + 0.5).floor().clamp(0.0, 100.0) as u32)
}

/// Evaluate a project's records.
///
/// Every record counts towards `total_fields`, including duplicates of the
/// same field name from different documents. Pending, rejected and
/// unrecognised statuses never count as reviewed.
pub fn evaluate(records: &[ExtractedRecord]) -> EvaluationStats {
    let mut overall = Tally::default();
    let mut order: Vec<&str> = Vec::new();
    let mut per_field: HashMap<&str, Tally> = HashMap::new();

    for record in records {
        overall.add(record);
        let name = record.field_name.as_str();
        per_field
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Tally::default()
            })
            .add(record);
    }

    let field_breakdown = order
        .into_iter()
        .map(|name| {
            let tally = per_field[name];
            FieldBreakdown {
                field_name: name.to_string(),
                total: tally.total,
                reviewed: tally.reviewed,
                correct: tally.correct,
                accuracy: tally.accuracy(),
            }
        })
        .collect();

    tracing::debug!(
        total = overall.total,
        reviewed = overall.reviewed,
        correct = overall.correct,
        "evaluated records"
    );

    EvaluationStats {
        total_fields: overall.total,
        reviewed_fields: overall.reviewed,
        correct_fields: overall.correct,
        accuracy: overall.accuracy(),
        field_breakdown,
    }
}

impl EvaluationStats {
    /// Breakdown entry for a field name, if any record carried it.
    pub fn field(&self, field_name: &str) -> Option<&FieldBreakdown> {
        self.field_breakdown
            .iter()
            .find(|f| f.field_name == field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordStatus;

    fn rec(field: &str, status: RecordStatus, value: Option<&str>, ai: Option<&str>) -> ExtractedRecord {
        ExtractedRecord {
            id: 0,
            document_id: 1,
            field_name: field.to_string(),
            value: value.map(String::from),
            ai_value: ai.map(String::from),
            confidence: None,
            ai_confidence: None,
            citation: None,
            normalization: None,
            status,
        }
    }

    fn check_invariants(records: &[ExtractedRecord]) {
        let stats = evaluate(records);
        assert_eq!(stats.total_fields, records.len());
        assert!(stats.reviewed_fields <= stats.total_fields);
        assert!(stats.correct_fields <= stats.reviewed_fields);
        assert!(stats.accuracy <= 100);

        let summed: usize = stats.field_breakdown.iter().map(|f| f.total).sum();
        assert_eq!(summed, stats.total_fields);
        let summed: usize = stats.field_breakdown.iter().map(|f| f.reviewed).sum();
        assert_eq!(summed, stats.reviewed_fields);
        let summed: usize = stats.field_breakdown.iter().map(|f| f.correct).sum();
        assert_eq!(summed, stats.correct_fields);

        let mut names: Vec<&str> = records.iter().map(|r| r.field_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(stats.field_breakdown.len(), names.len());
        for name in names {
            assert_eq!(
                stats
                    .field_breakdown
                    .iter()
                    .filter(|f| f.field_name == name)
                    .count(),
                1,
                "field {name} should appear exactly once"
            );
        }
    }

    #[test]
    fn empty_input_is_all_zero() {
        let stats = evaluate(&[]);
        assert_eq!(stats, EvaluationStats::default());
        assert_eq!(stats.accuracy, 0);
        assert!(stats.field_breakdown.is_empty());
    }

    #[test]
    fn worked_example() {
        let records = vec![
            rec("Date", RecordStatus::Approved, Some("2020-01-01"), Some("2020-01-01")),
            rec("Date", RecordStatus::ManualUpdated, Some("2020-02-02"), Some("2020-01-05")),
            rec("Party", RecordStatus::Pending, None, Some("Acme")),
        ];
        let stats = evaluate(&records);
        assert_eq!(stats.total_fields, 3);
        assert_eq!(stats.reviewed_fields, 2);
        assert_eq!(stats.correct_fields, 1);
        assert_eq!(stats.accuracy, 50);

        let date = stats.field("Date").unwrap();
        assert_eq!((date.total, date.reviewed, date.accuracy), (2, 2, 50));
        let party = stats.field("Party").unwrap();
        assert_eq!((party.total, party.reviewed, party.accuracy), (1, 0, 0));
        check_invariants(&records);
    }

    #[test]
    fn pending_never_contributes() {
        let records = vec![
            rec("Parties", RecordStatus::Pending, Some("A"), Some("A")),
            rec("Parties", RecordStatus::Pending, Some("B"), Some("A")),
        ];
        let stats = evaluate(&records);
        assert_eq!(stats.reviewed_fields, 0);
        assert_eq!(stats.correct_fields, 0);
        assert_eq!(stats.accuracy, 0);
    }

    #[test]
    fn rejected_is_not_reviewed() {
        let records = vec![rec("Parties", RecordStatus::Rejected, Some("A"), Some("A"))];
        let stats = evaluate(&records);
        assert_eq!(stats.total_fields, 1);
        assert_eq!(stats.reviewed_fields, 0);
    }

    #[test]
    fn approved_but_differing_is_not_correct() {
        let records = vec![rec("Governing Law", RecordStatus::Approved, Some("Scotland"), Some("England"))];
        let stats = evaluate(&records);
        assert_eq!(stats.reviewed_fields, 1);
        assert_eq!(stats.correct_fields, 0);
        assert_eq!(stats.accuracy, 0);
    }

    #[test]
    fn manual_update_back_to_ai_value_is_correct() {
        let records = vec![
            rec("Governing Law", RecordStatus::ManualUpdated, Some("England"), Some("England")),
            rec("Governing Law", RecordStatus::ManualUpdated, Some("Wales"), Some("England")),
        ];
        let stats = evaluate(&records);
        assert_eq!(stats.correct_fields, 1);
        assert_eq!(stats.accuracy, 50);
    }

    #[test]
    fn null_and_empty_count_as_matching() {
        let records = vec![
            rec("Termination Clause", RecordStatus::Approved, None, None),
            rec("Termination Clause", RecordStatus::ManualUpdated, Some(""), None),
        ];
        let stats = evaluate(&records);
        assert_eq!(stats.correct_fields, 2);
        assert_eq!(stats.accuracy, 100);
    }

    #[test]
    fn unknown_status_counts_in_total_only() {
        let json = r#"[
            {"field_name": "Parties", "value": "A", "ai_value": "A", "status": "escalated"},
            {"field_name": "Parties", "value": "A", "ai_value": "A", "status": "approved"}
        ]"#;
        let records: Vec<ExtractedRecord> = serde_json::from_str(json).unwrap();
        let stats = evaluate(&records);
        assert_eq!(stats.total_fields, 2);
        assert_eq!(stats.reviewed_fields, 1);
        assert_eq!(stats.correct_fields, 1);
        assert_eq!(stats.accuracy, 100);
    }

    #[test]
    fn breakdown_is_first_seen_order() {
        let records = vec![
            rec("Parties", RecordStatus::Pending, None, None),
            rec("Effective Date", RecordStatus::Pending, None, None),
            rec("Parties", RecordStatus::Pending, None, None),
            rec("Contract Title", RecordStatus::Pending, None, None),
        ];
        let names: Vec<String> = evaluate(&records)
            .field_breakdown
            .into_iter()
            .map(|f| f.field_name)
            .collect();
        assert_eq!(names, vec!["Parties", "Effective Date", "Contract Title"]);
        check_invariants(&records);
    }

    #[test]
    fn duplicates_across_documents_count_independently() {
        let mut a = rec("Parties", RecordStatus::Approved, Some("A"), Some("A"));
        a.document_id = 1;
        let mut b = rec("Parties", RecordStatus::Approved, Some("B"), Some("B"));
        b.document_id = 2;
        let stats = evaluate(&[a, b]);
        let parties = stats.field("Parties").unwrap();
        assert_eq!(parties.total, 2);
        assert_eq!(parties.correct, 2);
    }

    #[test]
    fn accuracy_rounds_half_up() {
        assert_eq!(accuracy_percent(0, 0), 0);
        assert_eq!(accuracy_percent(1, 3), 33);
        assert_eq!(accuracy_percent(2, 3), 67);
        assert_eq!(accuracy_percent(1, 8), 13); // 12.5
        assert_eq!(accuracy_percent(1, 200), 1); // 0.5
        assert_eq!(accuracy_percent(1, 201), 0);
        assert_eq!(accuracy_percent(7, 7), 100);
    }

    #[test]
    fn accuracy_clamped_when_correct_exceeds_reviewed() {
        assert_eq!(accuracy_percent(5, 3), 100);
    }

    #[test]
    fn invariants_hold_over_mixed_set() {
        let statuses = RecordStatus::ALL;
        let values = [None, Some(""), Some("A"), Some("a")];
        let mut records = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            for (j, v) in values.iter().enumerate() {
                for ai in values.iter() {
                    let field = format!("F{}", (i + j) % 3);
                    records.push(rec(&field, *status, *v, *ai));
                }
            }
        }
        check_invariants(&records);
    }

    #[test]
    fn stats_json_shape() {
        let records = vec![rec("Date", RecordStatus::Approved, Some("x"), Some("x"))];
        let json = serde_json::to_value(evaluate(&records)).unwrap();
        assert_eq!(json["total_fields"], 1);
        assert_eq!(json["reviewed_fields"], 1);
        assert_eq!(json["correct_fields"], 1);
        assert_eq!(json["accuracy"], 100);
        assert_eq!(json["field_breakdown"][0]["field_name"], "Date");
        assert_eq!(json["field_breakdown"][0]["total"], 1);
        assert_eq!(json["field_breakdown"][0]["reviewed"], 1);
        assert_eq!(json["field_breakdown"][0]["accuracy"], 100);
    }

    #[test]
    fn stats_json_without_breakdown_parses() {
        // The original backend endpoint omits the breakdown.
        let json = r#"{"total_fields": 2, "reviewed_fields": 2, "correct_fields": 1, "accuracy": 50.0}"#;
        let stats: EvaluationStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.accuracy, 50);
        assert!(stats.field_breakdown.is_empty());
    }
}
