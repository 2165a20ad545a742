//! Storage layer: DuckDB tables for projects, documents, schema fields, and extracted records.

mod error;
pub use error::StoreError;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::ReviewStore;
