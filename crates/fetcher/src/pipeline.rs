//! Main entry point for the fetch pipeline
//!
//! [`Fetcher`] owns the shared HTTP client and ties the listing resolver,
//! the batch coordinator and the boundary fetch together behind one
//! facade; `sync` drives a whole acquisition run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::info;

use crate::batch;
use crate::boundary;
use crate::config::{DEFAULT_BOUNDARY_BASENAME, FetchConfig};
use crate::core::{
    BoundaryOutcome, FetchError, FetchReport, FetchRequest, ProgressCallback, Result,
    SourceLocator,
};
use crate::listing::ListingResolver;
use crate::transfer::Downloader;

/// Options for one whole acquisition run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Existing directory everything is materialized into
    pub out_dir: PathBuf,
    /// Restrict the batch to these window keys; `None` fetches everything
    pub months: Option<BTreeSet<u32>>,
    /// Re-fetch objects whose destinations already exist
    pub overwrite: bool,
    /// Width of the batch worker pool
    pub concurrency: usize,
    /// File name for the boundary document inside `out_dir`
    pub boundary_basename: String,
}

impl SyncOptions {
    pub fn new<P: Into<PathBuf>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.into(),
            months: None,
            overwrite: false,
            concurrency: 4,
            boundary_basename: DEFAULT_BOUNDARY_BASENAME.to_string(),
        }
    }

    pub fn with_months(mut self, months: Option<BTreeSet<u32>>) -> Self {
        self.months = months;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Everything one `sync` run produced
#[derive(Debug)]
pub struct SyncOutcome {
    /// How many locators the listing resolved after filtering
    pub resolved: usize,
    /// One outcome per batch request
    pub report: FetchReport,
    /// The auxiliary fetch result, independent of the batch
    pub boundary: Result<BoundaryOutcome>,
}

/// Fetch pipeline facade
///
/// This is the main entry point for users. It provides:
/// - Locator resolution from the bucket index
/// - Batch fetching with concurrency control and retries
/// - The auxiliary boundary fetch with endpoint fallback
/// - A combined `sync` run driving both in parallel
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
    resolver: ListingResolver,
    downloader: Downloader,
}

impl Fetcher {
    /// Create a new pipeline over one shared HTTP client
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| FetchError::Client { source: e })?;
        let resolver = ListingResolver::new(client.clone(), &config)?;
        let downloader = Downloader::new(client.clone(), &config);

        Ok(Self {
            client,
            config,
            resolver,
            downloader,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Resolve the set of objects currently in the bucket for the
    /// configured year and dataset, optionally narrowed to `months`.
    pub async fn resolve_listing(
        &self,
        months: Option<&BTreeSet<u32>>,
    ) -> Result<Vec<SourceLocator>> {
        self.resolver.resolve(months).await
    }

    /// Expand locators into per-object requests under `out_dir`.
    pub fn requests_for(
        &self,
        locators: &[SourceLocator],
        out_dir: &Path,
        overwrite: bool,
    ) -> Vec<FetchRequest> {
        locators
            .iter()
            .map(|locator| {
                let destination = out_dir.join(&locator.file_name);
                FetchRequest::new(locator.clone(), destination).with_overwrite(overwrite)
            })
            .collect()
    }

    /// Fetch every request through the bounded worker pool.
    pub async fn run_batch(
        &self,
        requests: Vec<FetchRequest>,
        concurrency: usize,
        progress: Option<ProgressCallback>,
    ) -> FetchReport {
        batch::run_batch(&self.downloader, requests, concurrency, progress).await
    }

    /// Fetch the boundary document into `out_dir` under `basename`.
    pub async fn fetch_boundary(
        &self,
        out_dir: &Path,
        basename: &str,
        overwrite: bool,
        progress: Option<ProgressCallback>,
    ) -> Result<BoundaryOutcome> {
        let dest = out_dir.join(basename);
        boundary::fetch_boundary(&self.client, &self.config, &dest, overwrite, progress).await
    }

    /// One whole acquisition run: resolve and fetch the batch while the
    /// boundary document is fetched as an independent concurrent task.
    ///
    /// A listing failure aborts the run; the boundary task's own failure
    /// stays inside the returned outcome.
    pub async fn sync(
        &self,
        options: &SyncOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<SyncOutcome> {
        let batch_side = async {
            let locators = self.resolve_listing(options.months.as_ref()).await?;
            info!("resolved {} objects to fetch", locators.len());
            let requests = self.requests_for(&locators, &options.out_dir, options.overwrite);
            let report = self
                .run_batch(requests, options.concurrency, progress.clone())
                .await;
            Ok::<_, FetchError>((locators.len(), report))
        };
        let boundary_side = self.fetch_boundary(
            &options.out_dir,
            &options.boundary_basename,
            options.overwrite,
            progress.clone(),
        );

        let (batch_result, boundary) = tokio::join!(batch_side, boundary_side);
        let (resolved, report) = batch_result?;

        Ok(SyncOutcome {
            resolved,
            report,
            boundary,
        })
    }
}
