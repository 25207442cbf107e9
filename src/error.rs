// src/error.rs
// =============================================================================
// Errors that stop a probe session.
//
// Only fatal conditions live here: a bad proxy endpoint, a seed page that
// cannot be fetched, or a failure writing the report. A link that fails its
// probe is NOT an error of the session; it is reported as "not reachable"
// through `ProbeFailure` (see checker/http.rs).
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The proxy address/port could not be turned into a proxy URL
    #[error("invalid proxy endpoint '{endpoint}': {reason}")]
    InvalidProxy { endpoint: String, reason: String },

    /// The extra suffixes could not be compiled into one link grammar
    #[error("invalid link suffixes: {0}")]
    InvalidSuffixes(#[from] regex::Error),

    /// reqwest refused the client configuration
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The seed address is not an absolute URL
    #[error("invalid seed address '{address}': {source}")]
    InvalidSeed {
        address: String,
        #[source]
        source: url::ParseError,
    },

    /// The seed page could not be fetched or its body could not be read
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The tokenizer worker panicked or was cancelled
    #[error("link extraction aborted: {0}")]
    Extract(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
