//! Client layer: typed access to the review backend's REST endpoints.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ApiClient, ClientError};
