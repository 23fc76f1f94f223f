//! File operation utilities
//!
//! Shared file handling for the transfer and boundary paths so partial
//! content never lands on a final destination path.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::core::error::{FetchError, FileOperation, Result};

/// Size of an existing destination, or `None` when nothing is there yet.
pub async fn existing_size(dest: &Path) -> Result<Option<u64>> {
    match fs::metadata(dest).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FetchError::FileSystem {
            path: dest.to_path_buf(),
            operation: FileOperation::Metadata,
            source: e,
        }),
    }
}

/// Create the destination's parent directory if it is missing.
pub async fn ensure_parent_dir(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::FileSystem {
                    path: parent.to_path_buf(),
                    operation: FileOperation::CreateDir,
                    source: e,
                })?;
        }
    }
    Ok(())
}

/// Sibling path used while a body is still being written.
///
/// The suffix is appended rather than swapped in so `x.zip` and `x.csv`
/// in the same directory never share a partial file.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Atomically promote a finished partial file onto its destination.
///
/// The destination either holds the complete body or whatever was there
/// before, never a truncated mix.
pub async fn promote(part: &Path, dest: &Path) -> Result<()> {
    fs::rename(part, dest)
        .await
        .map_err(|e| FetchError::FileSystem {
            path: dest.to_path_buf(),
            operation: FileOperation::Move,
            source: e,
        })?;
    debug!("promoted {} to {}", part.display(), dest.display());
    Ok(())
}

/// Best-effort removal of a partial file after a failed attempt.
pub async fn discard_partial(part: &Path) {
    if let Err(e) = fs::remove_file(part).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!("could not remove partial file {}: {}", part.display(), e);
        }
    }
}
