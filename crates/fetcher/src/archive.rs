//! Archive materialization
//!
//! Downloaded zip containers are expanded next to themselves and removed
//! once their contents are on disk. An unreadable container is a per-file
//! condition, not a pipeline failure: it stays in place for diagnosis.

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::core::{FetchError, FileOperation, MaterializeOutcome, Result};

/// Destinations with this extension go through the materializer.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Expand `archive` into `target_dir`, then delete the archive.
///
/// The container walk runs on the blocking pool. A container that cannot
/// be read comes back as `Corrupted` with the archive left in place; an
/// entry that would land outside `target_dir` is a hard error and nothing
/// is written there.
pub async fn materialize(archive: &Path, target_dir: &Path) -> Result<MaterializeOutcome> {
    let archive_path = archive.to_path_buf();
    let target = target_dir.to_path_buf();

    let outcome = tokio::task::spawn_blocking(move || extract_zip(&archive_path, &target))
        .await
        .map_err(|e| FetchError::ArchiveTask {
            archive: archive.to_path_buf(),
            reason: e.to_string(),
        })??;

    match outcome {
        MaterializeOutcome::Extracted { entries } => {
            tokio::fs::remove_file(archive)
                .await
                .map_err(|e| FetchError::FileSystem {
                    path: archive.to_path_buf(),
                    operation: FileOperation::Delete,
                    source: e,
                })?;
            debug!(
                "extracted {} entries from {}, archive removed",
                entries,
                archive.display()
            );
            Ok(MaterializeOutcome::Extracted { entries })
        }
        MaterializeOutcome::Corrupted => {
            warn!("corrupted archive kept in place: {}", archive.display());
            Ok(MaterializeOutcome::Corrupted)
        }
    }
}

/// Synchronous container walk. Same-named files are overwritten, so a
/// repeated run converges on the same final set.
fn extract_zip(archive: &Path, target_dir: &Path) -> Result<MaterializeOutcome> {
    let file = File::open(archive).map_err(|e| FetchError::FileSystem {
        path: archive.to_path_buf(),
        operation: FileOperation::Read,
        source: e,
    })?;

    let mut container = match ZipArchive::new(file) {
        Ok(container) => container,
        Err(e) => {
            debug!("archive {} did not open: {}", archive.display(), e);
            return Ok(MaterializeOutcome::Corrupted);
        }
    };

    let mut entries = 0usize;
    for index in 0..container.len() {
        let mut entry = match container.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("entry {} of {} unreadable: {}", index, archive.display(), e);
                return Ok(MaterializeOutcome::Corrupted);
            }
        };

        let Some(relative) = entry.enclosed_name() else {
            return Err(FetchError::UnsafeArchiveEntry {
                entry: entry.name().to_string(),
                archive: archive.to_path_buf(),
            });
        };
        let out_path = target_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| FetchError::FileSystem {
                path: out_path.clone(),
                operation: FileOperation::CreateDir,
                source: e,
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FetchError::FileSystem {
                path: parent.to_path_buf(),
                operation: FileOperation::CreateDir,
                source: e,
            })?;
        }

        let mut out_file = File::create(&out_path).map_err(|e| FetchError::FileSystem {
            path: out_path.clone(),
            operation: FileOperation::Create,
            source: e,
        })?;
        io::copy(&mut entry, &mut out_file).map_err(|e| FetchError::FileSystem {
            path: out_path.clone(),
            operation: FileOperation::Write,
            source: e,
        })?;
        entries += 1;
    }

    Ok(MaterializeOutcome::Extracted { entries })
}
