//! Auxiliary city-boundary fetch with endpoint fallback
//!
//! One small geodata document, buffered in full so its shape can be
//! checked before anything lands on disk. The primary endpoint is tried
//! first; on any failure the fallback endpoint gets the same treatment.
//! Only when both fail does the error surface to the caller.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::core::files;
use crate::core::{
    BoundaryOutcome, FetchError, FileOperation, ProgressCallback, ProgressEvent, Result,
};

/// Minimal shape a geodata document must have: GeoJSON's top-level
/// discriminator field.
#[derive(Debug, Deserialize)]
struct GeoDocument {
    #[serde(rename = "type")]
    kind: String,
}

/// Fetch the boundary document to `dest`, falling back to the secondary
/// endpoint when the primary cannot deliver a valid body.
pub async fn fetch_boundary(
    client: &Client,
    config: &FetchConfig,
    dest: &Path,
    overwrite: bool,
    progress: Option<ProgressCallback>,
) -> Result<BoundaryOutcome> {
    if !overwrite {
        if let Some(size) = files::existing_size(dest).await? {
            debug!(
                "boundary already present: {} ({} bytes)",
                dest.display(),
                size
            );
            if let Some(ref callback) = progress {
                callback(ProgressEvent::DownloadSkipped {
                    path: dest.display().to_string(),
                    size,
                });
            }
            return Ok(BoundaryOutcome::Skipped { size });
        }
    }

    let primary_err = match try_endpoint(client, &config.boundary_url, config.timeout, dest).await {
        Ok(size) => {
            if let Some(ref callback) = progress {
                callback(ProgressEvent::DownloadComplete {
                    url: config.boundary_url.clone(),
                    final_size: size,
                });
            }
            return Ok(BoundaryOutcome::Fetched {
                size,
                fallback: false,
            });
        }
        Err(e) => e,
    };

    warn!(
        "primary boundary endpoint failed ({}), trying fallback",
        primary_err
    );
    if let Some(ref callback) = progress {
        callback(ProgressEvent::Warning {
            url: config.boundary_url.clone(),
            message: format!("primary endpoint failed: {primary_err}"),
        });
    }

    match try_endpoint(client, &config.boundary_fallback_url, config.timeout, dest).await {
        Ok(size) => {
            if let Some(ref callback) = progress {
                callback(ProgressEvent::DownloadComplete {
                    url: config.boundary_fallback_url.clone(),
                    final_size: size,
                });
            }
            Ok(BoundaryOutcome::Fetched {
                size,
                fallback: true,
            })
        }
        Err(fallback_err) => {
            if let Some(ref callback) = progress {
                callback(ProgressEvent::Error {
                    url: config.boundary_fallback_url.clone(),
                    error: fallback_err.to_string(),
                });
            }
            Err(FetchError::BoundaryFailed {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            })
        }
    }
}

/// One endpoint: buffered GET, shape check, atomic write.
async fn try_endpoint(client: &Client, url: &str, timeout: Duration, dest: &Path) -> Result<u64> {
    debug!("boundary request: {}", url);
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| FetchError::HttpRequest {
            url: url.to_string(),
            source: e,
        })?;

    let body = response.bytes().await.map_err(|e| FetchError::HttpRequest {
        url: url.to_string(),
        source: e,
    })?;

    let document: GeoDocument =
        serde_json::from_slice(&body).map_err(|e| FetchError::BoundaryShape {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    debug!("boundary document type: {}", document.kind);

    files::ensure_parent_dir(dest).await?;
    let part = files::part_path(dest);
    if let Err(e) = fs::write(&part, &body).await {
        files::discard_partial(&part).await;
        return Err(FetchError::FileSystem {
            path: part.clone(),
            operation: FileOperation::Write,
            source: e,
        });
    }
    if let Err(e) = files::promote(&part, dest).await {
        files::discard_partial(&part).await;
        return Err(e);
    }

    Ok(body.len() as u64)
}
