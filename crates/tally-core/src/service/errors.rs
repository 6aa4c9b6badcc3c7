use crate::ingest::IngestError;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the report service.
///
/// Source errors arrive pre-wrapped in `Arc` because the dataset layer
/// shares one failure among all coalesced waiters.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The upstream data source could not be fetched; never cached, safe to
    /// retry immediately.
    #[error("data source error: {0}")]
    Source(#[from] Arc<IngestError>),

    /// The month filter is not a valid `YYYY-MM` key.
    #[error("invalid month filter: {0}")]
    InvalidMonth(String),

    /// A computed report failed to serialize.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ReportError {
    /// Whether this failure is the upstream's (maps to 502 at the HTTP
    /// layer) rather than the caller's or ours.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}
