//! Extracted field records and the reviewer actions that move them between statuses.

use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::matching::values_match;

/// Review status of an extracted record.
///
/// Serialised as snake_case strings (`pending`, `approved`, `rejected`,
/// `manual_updated`). Any other string, or null, reads as [`Pending`](Self::Pending)
/// so a bad row is never counted as reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordStatus {
    /// Extracted but not yet acted on by a reviewer.
    #[default]
    Pending,
    /// Reviewer accepted the AI value as-is.
    Approved,
    /// Reviewer rejected the extraction without supplying a value.
    Rejected,
    /// Reviewer supplied their own value.
    ManualUpdated,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 4] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::ManualUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ManualUpdated => "manual_updated",
        }
    }

    /// Parse a stored status string, mapping anything unrecognised to `Pending`.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim() {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "manual_updated" => Self::ManualUpdated,
            "pending" => Self::Pending,
            other => {
                tracing::debug!(status = other, "unknown record status, treating as pending");
                Self::Pending
            }
        }
    }

    /// Only approved and manually updated records count towards accuracy.
    pub fn is_reviewed(&self) -> bool {
        match self {
            Self::Approved | Self::ManualUpdated => true,
            Self::Pending | Self::Rejected => false,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Wire form of a status: a string, or anything else (null, numbers, objects).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Text(String),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for RecordStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawStatus::deserialize(deserializer)? {
            RawStatus::Text(s) => Ok(Self::parse_lossy(&s)),
            RawStatus::Other(_) => {
                tracing::debug!("non-string record status, treating as pending");
                Ok(Self::Pending)
            }
        }
    }
}

/// Null reads as the type's default, same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One extracted field value for one document.
///
/// `ai_value` / `ai_confidence` are the audit copy of what the model produced;
/// `value` / `confidence` are the current (possibly reviewer-edited) values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub document_id: i64,
    pub field_name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub ai_value: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub normalization: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

/// A reviewer decision on a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    /// Accept the AI value; the current value is reset to it.
    Approve,
    /// Reject the extraction, leaving the current value untouched.
    Reject,
    /// Replace the current value with a reviewer-supplied one.
    Edit(Option<String>),
}

impl ReviewAction {
    /// Status a record ends up in after this action.
    pub fn resulting_status(&self) -> RecordStatus {
        match self {
            Self::Approve => RecordStatus::Approved,
            Self::Reject => RecordStatus::Rejected,
            Self::Edit(_) => RecordStatus::ManualUpdated,
        }
    }
}

impl ExtractedRecord {
    /// A fresh pending record whose current value starts out as the AI value.
    pub fn pending(
        document_id: i64,
        field_name: impl Into<String>,
        ai_value: Option<String>,
        ai_confidence: Option<f64>,
    ) -> Self {
        Self {
            id: 0,
            document_id,
            field_name: field_name.into(),
            value: ai_value.clone(),
            ai_value,
            confidence: ai_confidence,
            ai_confidence,
            citation: None,
            normalization: None,
            status: RecordStatus::Pending,
        }
    }

    pub fn is_reviewed(&self) -> bool {
        self.status.is_reviewed()
    }

    /// Reviewed and the final value still matches what the model extracted.
    pub fn is_correct(&self) -> bool {
        self.is_reviewed() && values_match(self.value.as_deref(), self.ai_value.as_deref())
    }

    /// Apply a reviewer action. Allowed from any status.
    pub fn apply(&mut self, action: ReviewAction) {
        let status = action.resulting_status();
        match action {
            ReviewAction::Approve => {
                self.value = self.ai_value.clone();
                self.confidence = self.ai_confidence;
            }
            ReviewAction::Reject => {}
            ReviewAction::Edit(value) => {
                self.value = value.filter(|v| !v.is_empty());
            }
        }
        tracing::debug!(
            record_id = self.id,
            field = %self.field_name,
            from = %self.status,
            to = %status,
            "review applied"
        );
        self.status = status;
    }
}
