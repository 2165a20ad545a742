//! Core review types, status transitions, and the extraction accuracy engine.

mod error;
pub mod evaluation;
pub mod extraction;
pub mod matching;
pub mod record;
pub mod schema;

pub use error::CoreError;
pub use evaluation::{EvaluationStats, FieldBreakdown, accuracy_percent, evaluate};
pub use extraction::{ExtractionResult, effective_fields, parse_results, records_from_results};
pub use matching::values_match;
pub use record::{ExtractedRecord, RecordStatus, ReviewAction};
pub use schema::{Document, DocumentStatus, FieldType, Project, SchemaField, default_fields};
