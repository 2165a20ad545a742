//! Projects, documents, and the per-project extraction schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// A review project grouping documents and their extraction schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default)]
    pub created_at: String,
}

/// Processing state of an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Uploaded,
    Ingested,
    Extracted,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Ingested => "ingested",
            Self::Extracted => "extracted",
            Self::Error => "error",
        }
    }

    /// Unknown values read as `Uploaded`.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim() {
            "ingested" => Self::Ingested,
            "extracted" => Self::Extracted,
            "error" => Self::Error,
            _ => Self::Uploaded,
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse_lossy).unwrap_or_default())
    }
}

/// A legal document whose text has been ingested into a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: i64,
    pub project_id: i64,
    pub filename: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub status: DocumentStatus,
    /// ISO 8601 timestamp string.
    #[serde(default)]
    pub created_at: String,
}

/// Declared type of an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Date => "date",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "date" => Some(Self::Date),
            _ => None,
        }
    }
}

impl FromStr for FieldType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownFieldType(s.to_string()))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field a project asks the extractor to fill in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub project_id: i64,
    pub field_name: String,
    #[serde(default)]
    pub field_description: String,
    #[serde(default)]
    pub data_type: FieldType,
}

/// Field set used when a project has not defined its own schema.
pub const DEFAULT_FIELDS: &[(&str, &str)] = &[
    ("Contract Title", "The title of the agreement"),
    ("Effective Date", "The date the agreement becomes effective"),
    ("Parties", "The names of the parties entering the agreement"),
    ("Governing Law", "The law governing the agreement"),
    (
        "Termination Clause",
        "Conditions under which the agreement can be terminated",
    ),
];

/// The default legal field set as schema fields (not yet persisted, id 0).
pub fn default_fields(project_id: i64) -> Vec<SchemaField> {
    DEFAULT_FIELDS
        .iter()
        .map(|&(name, description)| SchemaField {
            id: 0,
            project_id,
            field_name: name.to_string(),
            field_description: description.to_string(),
            data_type: FieldType::String,
        })
        .collect()
}
