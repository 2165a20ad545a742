use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid extraction results: {0}")]
    InvalidResults(String),

    #[error("unknown field type: {0}")]
    UnknownFieldType(String),
}
