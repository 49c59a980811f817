//! Lookup clients for technology discovery.
//!
//! The processor only depends on the `TechnologyLookup` trait. The Tomba
//! HTTP client is the production implementation.

/// Tomba technology API client
pub mod tomba;

pub use tomba::TombaClient;

use crate::error::TechFinderError;
use async_trait::async_trait;

/// A source of technology data for a domain.
///
/// Implementations return the raw response document; interpreting its shape
/// is left to `parse::parse_response`.
#[async_trait]
pub trait TechnologyLookup: Send + Sync {
    /// List the technologies detected on `domain`.
    async fn list_technologies(&self, domain: &str) -> Result<serde_json::Value, TechFinderError>;
}
