//! Progress events and the reporters that consume them

use std::sync::Arc;

/// Callback handed through the pipeline; invoked once per event
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Everything the pipeline announces while it runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    DownloadStarted {
        url: String,
        total_size: Option<u64>,
    },
    DownloadProgress {
        url: String,
        downloaded: u64,
        total: Option<u64>,
        speed_bps: f64,
    },
    DownloadComplete {
        url: String,
        final_size: u64,
    },
    DownloadSkipped {
        path: String,
        size: u64,
    },
    RetryAttempt {
        url: String,
        attempt: u32,
        max_attempts: u32,
    },
    ArchiveExtracted {
        path: String,
        entries: usize,
    },
    ArchiveCorrupted {
        path: String,
    },
    Warning {
        url: String,
        message: String,
    },
    Error {
        url: String,
        error: String,
    },
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_download_started(&self, _url: &str, _total_size: Option<u64>) {}
    fn on_download_progress(&self, _url: &str, _downloaded: u64, _total: Option<u64>, _speed_bps: f64) {}
    fn on_download_complete(&self, _url: &str, _final_size: u64) {}
    fn on_download_skipped(&self, _path: &str, _size: u64) {}
    fn on_retry_attempt(&self, _url: &str, _attempt: u32, _max_attempts: u32) {}
    fn on_archive_extracted(&self, _path: &str, _entries: usize) {}
    fn on_archive_corrupted(&self, _path: &str) {}
    fn on_warning(&self, _url: &str, _message: &str) {}
    fn on_error(&self, _url: &str, _error: &str) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            ProgressEvent::DownloadStarted { url, total_size } => {
                self.on_download_started(&url, total_size);
            }
            ProgressEvent::DownloadProgress { url, downloaded, total, speed_bps } => {
                self.on_download_progress(&url, downloaded, total, speed_bps);
            }
            ProgressEvent::DownloadComplete { url, final_size } => {
                self.on_download_complete(&url, final_size);
            }
            ProgressEvent::DownloadSkipped { path, size } => {
                self.on_download_skipped(&path, size);
            }
            ProgressEvent::RetryAttempt { url, attempt, max_attempts } => {
                self.on_retry_attempt(&url, attempt, max_attempts);
            }
            ProgressEvent::ArchiveExtracted { path, entries } => {
                self.on_archive_extracted(&path, entries);
            }
            ProgressEvent::ArchiveCorrupted { path } => {
                self.on_archive_corrupted(&path);
            }
            ProgressEvent::Warning { url, message } => {
                self.on_warning(&url, &message);
            }
            ProgressEvent::Error { url, error } => {
                self.on_error(&url, &error);
            }
        })
    }
}

/// Simple console progress reporter implementation
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter {
    pub verbose: bool,
}

impl ConsoleProgressReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn on_download_started(&self, url: &str, total_size: Option<u64>) {
        if self.verbose {
            match total_size {
                Some(size) => println!("-> {} ({})", url, human_size(size)),
                None => println!("-> {}", url),
            }
        }
    }

    fn on_download_progress(&self, url: &str, downloaded: u64, total: Option<u64>, speed_bps: f64) {
        if self.verbose {
            let speed_mb = speed_bps / 1_000_000.0;
            match total {
                Some(total) => {
                    let percent = (downloaded as f64 / total as f64) * 100.0;
                    println!(
                        "   {}: {:.1}% ({} / {}, {:.1} MB/s)",
                        url,
                        percent,
                        human_size(downloaded),
                        human_size(total),
                        speed_mb
                    );
                }
                None => {
                    println!("   {}: {} ({:.1} MB/s)", url, human_size(downloaded), speed_mb);
                }
            }
        }
    }

    fn on_download_complete(&self, url: &str, final_size: u64) {
        println!("ok {} ({})", url, human_size(final_size));
    }

    fn on_download_skipped(&self, path: &str, _size: u64) {
        println!("-- already exists: {}", path);
    }

    fn on_retry_attempt(&self, url: &str, attempt: u32, max_attempts: u32) {
        println!("retry {}/{} for {}", attempt, max_attempts, url);
    }

    fn on_archive_extracted(&self, path: &str, entries: usize) {
        println!("ok extracted {} ({} entries)", path, entries);
    }

    fn on_archive_corrupted(&self, path: &str) {
        eprintln!("!! corrupted archive kept in place: {}", path);
    }

    fn on_warning(&self, url: &str, message: &str) {
        eprintln!("warn {}: {}", url, message);
    }

    fn on_error(&self, url: &str, error: &str) {
        eprintln!("!! {}: {}", url, error);
    }
}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}

/// Format a byte count the way the console output wants it, 1024-based
/// with one decimal place.
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{size:.1}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1}PB")
}
