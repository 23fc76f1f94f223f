//! Core types used throughout the fetch pipeline
//!
//! This module contains the fundamental types that all other modules depend on.
//! By organizing these in a core module, we make the dependency relationships clear.

pub mod error;
pub mod files;
pub mod progress;

// Re-export main types for convenience
pub use error::{FetchError, FileOperation, Result};
pub use progress::{
    ConsoleProgressReporter, IntoProgressCallback, NullProgressReporter, ProgressCallback,
    ProgressEvent, ProgressReporter, human_size,
};

use std::path::PathBuf;

/// Sort key assigned to locators whose name carries no parseable window,
/// greater than every real month so they order last.
pub const WINDOW_SENTINEL: u32 = 99;

/// A remote object discovered by the listing resolver
///
/// Immutable once resolved: the URL to fetch, the local file name to
/// materialize under, and the time-window key embedded in the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    /// Absolute URL of the remote object
    pub url: String,
    /// File name the object is stored under locally
    pub file_name: String,
    /// Month embedded in the object key, when one could be parsed
    pub window: Option<u32>,
}

impl SourceLocator {
    pub fn new<U: Into<String>, F: Into<String>>(url: U, file_name: F, window: Option<u32>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
            window,
        }
    }

    /// Ordering key for window-sorted output; unparsable windows sort last.
    pub fn sort_key(&self) -> u32 {
        self.window.unwrap_or(WINDOW_SENTINEL)
    }
}

/// A single unit of work for the fetch coordinator
///
/// Created from a locator at dispatch time and consumed by exactly one job.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// What to fetch
    pub locator: SourceLocator,
    /// Full path the object should end up at
    pub destination: PathBuf,
    /// Re-fetch even when the destination already exists
    pub overwrite: bool,
}

impl FetchRequest {
    pub fn new<P: Into<PathBuf>>(locator: SourceLocator, destination: P) -> Self {
        Self {
            locator,
            destination: destination.into(),
            overwrite: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Terminal status of one fetch job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Destination already present, nothing transferred
    Skipped,
    /// Body transferred (and materialized, for archives)
    Succeeded,
    /// All attempts failed or a hard error ended the job
    Failed,
}

/// What became of an archive after a successful transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Contents extracted and the archive file removed
    Extracted { entries: usize },
    /// Container was unreadable; the archive file was kept for diagnosis
    Corrupted,
}

/// Result of one fetch job, produced exactly once per request
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub request: FetchRequest,
    pub status: FetchStatus,
    /// Bytes actually transferred (0 for skips)
    pub bytes: u64,
    /// Failure detail when `status` is `Failed`
    pub error: Option<String>,
    /// Set when the destination was an archive and the transfer succeeded
    pub materialized: Option<MaterializeOutcome>,
}

impl FetchOutcome {
    pub fn skipped(request: FetchRequest) -> Self {
        Self {
            request,
            status: FetchStatus::Skipped,
            bytes: 0,
            error: None,
            materialized: None,
        }
    }

    pub fn succeeded(request: FetchRequest, bytes: u64) -> Self {
        Self {
            request,
            status: FetchStatus::Succeeded,
            bytes,
            error: None,
            materialized: None,
        }
    }

    pub fn failed(request: FetchRequest, error: &FetchError) -> Self {
        Self {
            request,
            status: FetchStatus::Failed,
            bytes: 0,
            error: Some(error.to_string()),
            materialized: None,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == FetchStatus::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        self.status == FetchStatus::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == FetchStatus::Skipped
    }
}

/// Aggregate of one coordinator run, one outcome per request
///
/// Plain data: counting and summing only, no formatting concerns.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<FetchOutcome>,
}

impl FetchReport {
    pub fn new(outcomes: Vec<FetchOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// Total bytes moved over the network this run.
    pub fn bytes_transferred(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes).sum()
    }

    /// Outcomes that ended in failure, for error reporting.
    pub fn failures(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }
}

/// Result of the auxiliary boundary fetch
///
/// The failure case is the surfaced [`FetchError::BoundaryFailed`], not a
/// variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryOutcome {
    /// Destination already present, nothing transferred
    Skipped { size: u64 },
    /// Body validated and written; `fallback` says which endpoint served it
    Fetched { size: u64, fallback: bool },
}
