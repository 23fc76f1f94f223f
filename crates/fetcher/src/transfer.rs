//! Retrying transfer of one remote object to one destination path
//!
//! One streamed GET per attempt, written to a sibling partial file and
//! promoted onto the destination only once the whole body has arrived.
//! Between attempts the job sleeps on a linear backoff. Failures never
//! escape as errors here; they are folded into the returned outcome.

use std::path::Path;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::core::files;
use crate::core::{
    FetchError, FetchOutcome, FetchRequest, FileOperation, ProgressCallback, ProgressEvent, Result,
};

/// Report progress at most this often to avoid spamming the callback
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Delay before the next attempt after `completed_attempts` have failed.
///
/// Grows linearly: one base delay after the first failure, two after the
/// second, and so on.
pub fn backoff_delay(completed_attempts: u32, base: Duration) -> Duration {
    base.saturating_mul(completed_attempts)
}

/// Transfers single objects with retry and skip semantics
#[derive(Debug)]
pub struct Downloader {
    client: Client,
    attempts: u32,
    backoff_base: Duration,
    timeout: Duration,
}

impl Downloader {
    pub fn new(client: Client, config: &FetchConfig) -> Self {
        Self {
            client,
            attempts: config.attempts.max(1),
            backoff_base: config.backoff_base,
            timeout: config.transfer_timeout,
        }
    }

    /// Fetch one object, honoring the request's overwrite flag.
    ///
    /// An existing destination wins before any network work unless
    /// `overwrite` is set. All failure modes end up in the outcome, never
    /// as a panic or an `Err`.
    pub async fn fetch(
        &self,
        request: FetchRequest,
        progress: Option<ProgressCallback>,
    ) -> FetchOutcome {
        if !request.overwrite {
            match files::existing_size(&request.destination).await {
                Ok(Some(size)) => {
                    debug!(
                        "destination already present: {} ({} bytes)",
                        request.destination.display(),
                        size
                    );
                    if let Some(ref callback) = progress {
                        callback(ProgressEvent::DownloadSkipped {
                            path: request.destination.display().to_string(),
                            size,
                        });
                    }
                    return FetchOutcome::skipped(request);
                }
                Ok(None) => {}
                Err(e) => return failed(request, e, progress.as_ref()),
            }
        }

        match self.fetch_with_retry(&request, progress.as_ref()).await {
            Ok(bytes) => FetchOutcome::succeeded(request, bytes),
            Err(e) => failed(request, e, progress.as_ref()),
        }
    }

    async fn fetch_with_retry(
        &self,
        request: &FetchRequest,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64> {
        let url = &request.locator.url;
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=self.attempts {
            if attempt > 1 {
                let delay = backoff_delay(attempt - 1, self.backoff_base);
                debug!(
                    "retry attempt {}/{} for {} after {:?}",
                    attempt, self.attempts, url, delay
                );
                if let Some(callback) = progress {
                    callback(ProgressEvent::RetryAttempt {
                        url: url.clone(),
                        attempt,
                        max_attempts: self.attempts,
                    });
                }
                tokio::time::sleep(delay).await;
            }

            match self.attempt_transfer(request, progress).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    if !e.is_recoverable() {
                        debug!("error is not recoverable, failing immediately: {}", e);
                        return Err(e);
                    }
                    debug!("attempt {}/{} for {} failed: {}", attempt, self.attempts, url, e);
                    last_error = Some(e);
                }
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts were made".to_string());
        Err(FetchError::RetriesExhausted {
            url: url.clone(),
            attempts: self.attempts,
            last_error,
        })
    }

    /// One attempt: stream the body to a partial file, then promote it.
    /// A failed attempt cleans its partial up and leaves the destination
    /// untouched.
    async fn attempt_transfer(
        &self,
        request: &FetchRequest,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64> {
        files::ensure_parent_dir(&request.destination).await?;
        let part = files::part_path(&request.destination);

        let result = self
            .stream_to_part(&request.locator.url, &request.destination, &part, progress)
            .await;
        if result.is_err() {
            files::discard_partial(&part).await;
        }
        result
    }

    async fn stream_to_part(
        &self,
        url: &str,
        dest: &Path,
        part: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::HttpRequest {
                url: url.to_string(),
                source: e,
            })?;

        let declared = response.content_length();

        if let Some(callback) = progress {
            callback(ProgressEvent::DownloadStarted {
                url: url.to_string(),
                total_size: declared,
            });
        }

        // Create truncates, so a stale partial from an earlier attempt is gone
        let mut file = fs::File::create(part)
            .await
            .map_err(|e| FetchError::FileSystem {
                path: part.to_path_buf(),
                operation: FileOperation::Create,
                source: e,
            })?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let start_time = Instant::now();
        let mut last_progress_time = start_time;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| FetchError::HttpRequest {
                url: url.to_string(),
                source: e,
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::FileSystem {
                    path: part.to_path_buf(),
                    operation: FileOperation::Write,
                    source: e,
                })?;
            downloaded += chunk.len() as u64;

            let now = Instant::now();
            if now.duration_since(last_progress_time) >= PROGRESS_INTERVAL {
                if let Some(callback) = progress {
                    let elapsed = start_time.elapsed().as_secs_f64();
                    let speed = if elapsed > 0.0 {
                        downloaded as f64 / elapsed
                    } else {
                        0.0
                    };
                    callback(ProgressEvent::DownloadProgress {
                        url: url.to_string(),
                        downloaded,
                        total: declared,
                        speed_bps: speed,
                    });
                }
                last_progress_time = now;
            }
        }

        file.flush().await.map_err(|e| FetchError::FileSystem {
            path: part.to_path_buf(),
            operation: FileOperation::Write,
            source: e,
        })?;
        file.sync_all().await.map_err(|e| FetchError::FileSystem {
            path: part.to_path_buf(),
            operation: FileOperation::Write,
            source: e,
        })?;
        drop(file);

        if let Some(expected) = declared {
            if downloaded != expected {
                return Err(FetchError::IncompleteTransfer {
                    url: url.to_string(),
                    expected,
                    received: downloaded,
                });
            }
        }

        files::promote(part, dest).await?;

        if let Some(callback) = progress {
            callback(ProgressEvent::DownloadComplete {
                url: url.to_string(),
                final_size: downloaded,
            });
        }

        debug!("transfer complete: {} ({} bytes)", url, downloaded);
        Ok(downloaded)
    }
}

fn failed(
    request: FetchRequest,
    error: FetchError,
    progress: Option<&ProgressCallback>,
) -> FetchOutcome {
    warn!("fetch failed for {}: {}", request.locator.url, error);
    if let Some(callback) = progress {
        callback(ProgressEvent::Error {
            url: request.locator.url.clone(),
            error: error.to_string(),
        });
    }
    FetchOutcome::failed(request, &error)
}
