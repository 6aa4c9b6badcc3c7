use thiserror::Error;

/// Errors raised while fetching raw data from the upstream CSV exports.
///
/// Any of these is a hard failure for the computation that triggered the
/// fetch: the result is never cached and the key stays eligible for
/// immediate retry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestError {
    /// Upstream answered with a non-success HTTP status.
    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),

    /// Network-level error from the underlying HTTP client.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The export body was empty or whitespace-only.
    #[error("empty sheet export: {0}")]
    EmptySheet(String),
}
