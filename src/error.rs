//! Error types for the harvester.
//!
//! Per-URL failures never leave the worker that produced them; they are
//! turned into entries of the `http` or `doc` error buckets. The variants
//! below surface either inside a worker (and get classified there) or from
//! setup steps that legitimately abort a run.

/// Error type for harvesting operations.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// A site identifier with no entry in the rule table.
    #[error("no extraction rules for site `{0}`")]
    UnknownSite(String),

    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The origin answered with a non-success status.
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// The page was fetched but every extracted field came back empty.
    #[error("no extractable field on page {0}")]
    BlankPage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The network-identity rotation hook failed.
    #[error("identity rotation failed: {0}")]
    Identity(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for harvesting operations.
pub type Result<T> = std::result::Result<T, HarvestError>;
