//! Fetcher Library
//!
//! This library materializes monthly ride-share trip archives and a city
//! boundary document into a local directory tree. It supports paginated
//! bucket listing, batch downloads with retry logic, safe archive
//! extraction, idempotent skip-if-present semantics, and progress
//! tracking.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fetcher::{FetchConfig, Fetcher, ProgressEvent, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> fetcher::Result<()> {
//! // Configure endpoints and retry behavior
//! let config = FetchConfig::default();
//!
//! // Create the pipeline
//! let fetcher = Fetcher::new(config)?;
//!
//! // Set up progress callback (optional)
//! let progress = Arc::new(|event: ProgressEvent| match event {
//!     ProgressEvent::DownloadComplete { url, final_size } => {
//!         println!("done: {} ({} bytes)", url, final_size);
//!     }
//!     ProgressEvent::RetryAttempt { url, attempt, max_attempts } => {
//!         println!("retry {}/{}: {}", attempt, max_attempts, url);
//!     }
//!     _ => {}
//! });
//!
//! // Fetch everything for the configured year into ./data
//! let options = SyncOptions::new("data").with_concurrency(4);
//! let outcome = fetcher.sync(&options, Some(progress)).await?;
//! println!(
//!     "{} fetched, {} skipped, {} failed",
//!     outcome.report.succeeded(),
//!     outcome.report.skipped(),
//!     outcome.report.failed()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Paginated listing**: Bucket index enumeration with continuation tokens
//! - **Retry logic**: Configurable attempt budget with linear backoff
//! - **Batch fetching**: Bounded-concurrency worker pool with per-item outcomes
//! - **Archive materialization**: Zip extraction with traversal checks
//! - **Idempotent runs**: Existing destinations are skipped, not re-fetched
//! - **Endpoint fallback**: Boundary document tried on two endpoints
//! - **Progress tracking**: Real-time progress events with speed calculation
//! - **Async/await**: Full async support with Tokio runtime

pub mod archive;
pub mod batch;
pub mod boundary;
pub mod config;
pub mod core;
pub mod listing;
pub mod pipeline;
pub mod transfer;


// Re-export commonly used types for convenience
pub use crate::config::{DEFAULT_BOUNDARY_BASENAME, FetchConfig};
pub use crate::core::{
    BoundaryOutcome, ConsoleProgressReporter, FetchError, FetchOutcome, FetchReport, FetchRequest,
    FetchStatus, IntoProgressCallback, MaterializeOutcome, NullProgressReporter, ProgressCallback,
    ProgressEvent, ProgressReporter, Result, SourceLocator, human_size,
};
pub use crate::pipeline::{Fetcher, SyncOptions, SyncOutcome};
