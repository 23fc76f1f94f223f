//! Typed failures for every stage of the pipeline, each carrying the
//! context (url, path, operation) a caller needs to report it

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the fetch pipeline
#[derive(Error, Debug)]
pub enum FetchError {
    /// Bucket listing request failed (network or HTTP status)
    #[error("Bucket listing request to '{url}' failed")]
    Listing {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Bucket listing response was not a parseable index document
    #[error("Bucket listing from '{url}' could not be parsed: {reason}")]
    ListingDecode { url: String, reason: String },

    /// Object request failed at the network or status level
    #[error("Request for '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Body ended before the declared content length was reached
    #[error("Transfer from '{url}' ended early: expected {expected} bytes, received {received}")]
    IncompleteTransfer {
        url: String,
        expected: u64,
        received: u64,
    },

    /// Retry exhaustion with the last failure preserved
    #[error("Giving up on '{url}' after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// Local I/O failure, tagged with the operation that hit it
    #[error("File system error while {operation} '{path}'")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// Archive entry would land outside the extraction directory
    #[error("Archive entry '{entry}' in '{archive}' escapes the extraction directory")]
    UnsafeArchiveEntry { entry: String, archive: PathBuf },

    /// Blocking extraction task did not run to completion
    #[error("Extraction task for '{archive}' failed: {reason}")]
    ArchiveTask { archive: PathBuf, reason: String },

    /// Endpoint answered but the body failed the geodata shape check
    #[error("Response from '{url}' is not valid geodata: {reason}")]
    BoundaryShape { url: String, reason: String },

    /// Primary and fallback boundary endpoints both failed
    #[error("Boundary fetch failed on both endpoints (primary: {primary}; fallback: {fallback})")]
    BoundaryFailed { primary: String, fallback: String },

    /// URL parsing errors
    #[error("Invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// HTTP client construction failed
    #[error("Failed to build HTTP client")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    /// Config values that cannot be turned into a working pipeline
    #[error("Configuration problem: {message}")]
    Configuration { message: String },
}

/// Which file operation an I/O error happened during
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Move,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Metadata => write!(f, "reading metadata"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl FetchError {
    /// Whether another transfer attempt could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Connect/timeout errors and 5xx/429 statuses are worth retrying;
            // other statuses (4xx) will not change between attempts
            FetchError::HttpRequest { source, .. } => source
                .status()
                .map_or(true, |status| status.is_server_error() || status == 429),
            // Truncated bodies are usually transient server/proxy trouble
            FetchError::IncompleteTransfer { .. } => true,
            FetchError::FileSystem { source, .. } => {
                matches!(
                    source.kind(),
                    std::io::ErrorKind::Interrupted
                        | std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                )
            }
            FetchError::RetriesExhausted { .. } => false,
            FetchError::Listing { .. } => false,
            FetchError::ListingDecode { .. } => false,
            FetchError::UnsafeArchiveEntry { .. } => false,
            FetchError::ArchiveTask { .. } => false,
            FetchError::BoundaryShape { .. } => false,
            FetchError::BoundaryFailed { .. } => false,
            FetchError::InvalidUrl { .. } => false,
            FetchError::Client { .. } => false,
            FetchError::Configuration { .. } => false,
        }
    }
}
