//! Coordinated batch fetching with bounded concurrency
//!
//! Jobs run through a fixed-width pool; one job is a retrying transfer
//! plus, for archives, materialization of the contents. A failing job
//! never takes its siblings down, and every request produces exactly one
//! outcome in the report.

use std::collections::HashSet;
use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::archive;
use crate::core::{
    FetchOutcome, FetchReport, FetchRequest, FetchStatus, MaterializeOutcome, ProgressCallback,
    ProgressEvent,
};
use crate::transfer::Downloader;

/// Run every request through a pool at most `concurrency` wide.
///
/// Duplicate destinations within one run are short-circuited to skips so
/// two jobs never write the same path. The report holds exactly one
/// outcome per request, in completion order.
pub async fn run_batch(
    downloader: &Downloader,
    requests: Vec<FetchRequest>,
    concurrency: usize,
    progress: Option<ProgressCallback>,
) -> FetchReport {
    let concurrency = concurrency.max(1);
    debug!(
        "starting batch of {} requests with concurrency={}",
        requests.len(),
        concurrency
    );

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let requests: Vec<(FetchRequest, bool)> = requests
        .into_iter()
        .map(|request| {
            let duplicate = !seen.insert(request.destination.clone());
            (request, duplicate)
        })
        .collect();

    let outcomes: Vec<FetchOutcome> = stream::iter(requests)
        .map(|(request, duplicate)| {
            let progress_cb = progress.clone();
            async move {
                if duplicate {
                    warn!(
                        "duplicate destination in one batch, skipping: {}",
                        request.destination.display()
                    );
                    return FetchOutcome::skipped(request);
                }
                run_one(downloader, request, progress_cb).await
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    FetchReport::new(outcomes)
}

/// One job: fetch, then materialize when the destination is an archive.
/// A materialize error turns the job into a failure; a corrupted container
/// only gets recorded.
async fn run_one(
    downloader: &Downloader,
    request: FetchRequest,
    progress: Option<ProgressCallback>,
) -> FetchOutcome {
    let mut outcome = downloader.fetch(request, progress.clone()).await;

    if outcome.is_succeeded() && archive::is_archive(&outcome.request.destination) {
        let dest = outcome.request.destination.clone();
        let target = dest.parent().map(PathBuf::from).unwrap_or_default();

        match archive::materialize(&dest, &target).await {
            Ok(MaterializeOutcome::Extracted { entries }) => {
                if let Some(ref callback) = progress {
                    callback(ProgressEvent::ArchiveExtracted {
                        path: dest.display().to_string(),
                        entries,
                    });
                }
                outcome.materialized = Some(MaterializeOutcome::Extracted { entries });
            }
            Ok(MaterializeOutcome::Corrupted) => {
                if let Some(ref callback) = progress {
                    callback(ProgressEvent::ArchiveCorrupted {
                        path: dest.display().to_string(),
                    });
                }
                outcome.materialized = Some(MaterializeOutcome::Corrupted);
            }
            Err(e) => {
                warn!("materialize failed for {}: {}", dest.display(), e);
                if let Some(ref callback) = progress {
                    callback(ProgressEvent::Error {
                        url: outcome.request.locator.url.clone(),
                        error: e.to_string(),
                    });
                }
                outcome.status = FetchStatus::Failed;
                outcome.error = Some(e.to_string());
            }
        }
    }

    outcome
}
