//! Paginated bucket listing and locator resolution
//!
//! Speaks the ListObjectsV2-style index protocol: `GET {bucket}/?list-type=2`
//! answers with an XML document of object keys plus a truncation marker and
//! an opaque continuation token for the next page. Keys are narrowed to the
//! configured year and dataset slug and turned into window-sorted locators.

use std::collections::BTreeSet;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::core::{FetchError, Result, SourceLocator};

/// One decoded page of the bucket index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub keys: Vec<String>,
    pub is_truncated: bool,
    pub next_token: Option<String>,
}

/// Decode one listing response body.
///
/// Element local names are matched without regard to the namespace the
/// bucket stamps on the document.
pub fn parse_listing_page(url: &str, body: &str) -> Result<ListingPage> {
    let doc = roxmltree::Document::parse(body).map_err(|e| FetchError::ListingDecode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "ListBucketResult" {
        return Err(FetchError::ListingDecode {
            url: url.to_string(),
            reason: format!("unexpected root element '{}'", root.tag_name().name()),
        });
    }

    let mut keys = Vec::new();
    let mut is_truncated = false;
    let mut next_token = None;

    for node in doc.descendants().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "Key" => {
                if let Some(text) = node.text() {
                    keys.push(text.to_string());
                }
            }
            "IsTruncated" => {
                is_truncated = node.text().map(str::trim) == Some("true");
            }
            "NextContinuationToken" => {
                next_token = node
                    .text()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    Ok(ListingPage {
        keys,
        is_truncated,
        next_token,
    })
}

/// Compiled matcher for object keys in scope: `{year}{MM}-{dataset}.{ext}`
/// with a zip, csv or parquet extension, case-insensitive. The single
/// capture group is the month digits.
pub(crate) fn key_pattern(year: u16, dataset: &str) -> Result<Regex> {
    let expr = format!(
        r"(?i){year}(\d{{2}})-{}\.(zip|csv|parquet)$",
        regex::escape(dataset)
    );
    Regex::new(&expr).map_err(|e| FetchError::Configuration {
        message: format!("bad key pattern for dataset '{dataset}': {e}"),
    })
}

/// Resolves the set of objects to fetch from the bucket index
#[derive(Debug)]
pub struct ListingResolver {
    client: Client,
    bucket_url: Url,
    timeout: Duration,
    pattern: Regex,
}

impl ListingResolver {
    pub fn new(client: Client, config: &FetchConfig) -> Result<Self> {
        let bucket_url = Url::parse(&config.bucket_url).map_err(|e| FetchError::InvalidUrl {
            url: config.bucket_url.clone(),
            source: e,
        })?;
        let pattern = key_pattern(config.year, &config.dataset)?;
        Ok(Self {
            client,
            bucket_url,
            timeout: config.timeout,
            pattern,
        })
    }

    /// Enumerate the bucket and return window-sorted locators.
    ///
    /// Follows continuation tokens until the index reports no further
    /// pages. Any page-level failure aborts resolution, so a partial
    /// listing is never returned. With a `window_filter`, only locators
    /// whose window is in the set survive.
    pub async fn resolve(
        &self,
        window_filter: Option<&BTreeSet<u32>>,
    ) -> Result<Vec<SourceLocator>> {
        let mut locators = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let url = self.page_url(token.as_deref());
            let page = self.fetch_page(url.as_str()).await?;
            pages += 1;

            for key in &page.keys {
                if let Some(locator) = self.locator_from_key(key)? {
                    locators.push(locator);
                }
            }

            if !page.is_truncated {
                break;
            }
            match page.next_token {
                Some(next) => token = Some(next),
                // Truncated page without a token; nothing left to follow
                None => break,
            }
        }

        if let Some(filter) = window_filter {
            locators.retain(|l| l.window.is_some_and(|w| filter.contains(&w)));
        }
        locators.sort_by_key(|l| l.sort_key());

        debug!(
            "resolved {} locators across {} listing pages",
            locators.len(),
            pages
        );
        Ok(locators)
    }

    fn page_url(&self, token: Option<&str>) -> Url {
        let mut url = self.bucket_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("list-type", "2");
            if let Some(token) = token {
                pairs.append_pair("continuation-token", token);
            }
        }
        url
    }

    async fn fetch_page(&self, url: &str) -> Result<ListingPage> {
        debug!("listing page: {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Listing {
                url: url.to_string(),
                source: e,
            })?;

        let body = response.text().await.map_err(|e| FetchError::Listing {
            url: url.to_string(),
            source: e,
        })?;

        parse_listing_page(url, &body)
    }

    fn locator_from_key(&self, key: &str) -> Result<Option<SourceLocator>> {
        let Some(caps) = self.pattern.captures(key) else {
            return Ok(None);
        };
        let window = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());

        let url = self.bucket_url.join(key).map_err(|e| FetchError::InvalidUrl {
            url: format!("{}/{}", self.bucket_url, key),
            source: e,
        })?;
        let file_name = key.rsplit('/').next().unwrap_or(key).to_string();

        Ok(Some(SourceLocator::new(url.to_string(), file_name, window)))
    }
}
