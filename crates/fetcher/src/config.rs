//! Configuration types for the fetch pipeline

use std::time::Duration;

/// File name the boundary document is materialized under by default.
pub const DEFAULT_BOUNDARY_BASENAME: &str = "Boundaries_City_Chicago.geojson";

/// Configuration for a fetch run
///
/// Endpoints live here rather than as module constants so the pipeline can
/// be pointed at mock servers in tests.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Bucket-style listing endpoint the locators are resolved from
    pub bucket_url: String,
    /// Dataset slug embedded in every object key
    pub dataset: String,
    /// Year whose monthly objects are in scope
    pub year: u16,
    /// Primary endpoint for the city boundary document
    pub boundary_url: String,
    /// Secondary endpoint tried when the primary fails
    pub boundary_fallback_url: String,
    /// Transfer attempt budget per object, first try included
    pub attempts: u32,
    /// Base delay for the linear backoff between attempts
    pub backoff_base: Duration,
    /// Timeout for listing and boundary requests
    pub timeout: Duration,
    /// Timeout for object transfers
    pub transfer_timeout: Duration,
    pub user_agent: String,
}

impl FetchConfig {
    pub fn with_bucket_url<S: Into<String>>(mut self, bucket_url: S) -> Self {
        self.bucket_url = bucket_url.into();
        self
    }

    pub fn with_dataset<S: Into<String>>(mut self, dataset: S) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = year;
        self
    }

    pub fn with_boundary_urls<P: Into<String>, F: Into<String>>(
        mut self,
        primary: P,
        fallback: F,
    ) -> Self {
        self.boundary_url = primary.into();
        self.boundary_fallback_url = fallback.into();
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            bucket_url: "https://divvy-tripdata.s3.amazonaws.com".to_string(),
            dataset: "divvy-tripdata".to_string(),
            year: 2024,
            boundary_url:
                "https://data.cityofchicago.org/api/geospatial/ewy2-6yfk?method=export&format=GeoJSON"
                    .to_string(),
            boundary_fallback_url: "https://data.cityofchicago.org/resource/ewy2-6yfk.geojson"
                .to_string(),
            attempts: 3,
            backoff_base: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(60), // Whole-body budget per attempt
            user_agent: "fetcher/0.1.0".to_string(),
        }
    }
}
