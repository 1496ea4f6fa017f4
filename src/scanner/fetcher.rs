use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{page_filter, RawListing, SessionToken, SiteApi};
use crate::core::{Result, SyncError, SyncMetrics};

/// Results per search page, fixed by the site.
pub const PAGE_SIZE: u32 = 10;

/// What a failed page request does to the whole fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFailurePolicy {
    /// Any failed page fails the fetch.
    #[default]
    Strict,
    /// Failed pages contribute nothing; only all pages failing is fatal.
    Lenient,
}

pub fn page_count(total_listings: u32) -> u32 {
    total_listings.div_ceil(PAGE_SIZE)
}

/// Listings of one fetch, deduplicated by id, in page order.
#[derive(Debug, Clone, Default)]
pub struct ListingSet {
    listings: Vec<RawListing>,
    complete: bool,
}

impl ListingSet {
    /// Concatenates pages in order and keeps the first occurrence of each id.
    pub fn from_pages(pages: Vec<Vec<RawListing>>, complete: bool) -> Self {
        let mut seen = HashSet::new();
        let listings = pages
            .into_iter()
            .flatten()
            .filter(|listing| seen.insert(listing.listing_id.clone()))
            .collect();

        Self { listings, complete }
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// False when some pages failed under [`PageFailurePolicy::Lenient`].
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawListing> {
        self.listings.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.listings
            .iter()
            .map(|l| l.listing_id.as_str().to_string())
            .collect()
    }
}

pub struct ListingFetcher {
    site: Arc<dyn SiteApi>,
    base_filter: String,
    policy: PageFailurePolicy,
    max_concurrent_pages: usize,
    metrics: Arc<SyncMetrics>,
}

impl ListingFetcher {
    pub fn new(site: Arc<dyn SiteApi>, base_filter: String, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            site,
            base_filter,
            policy: PageFailurePolicy::Strict,
            max_concurrent_pages: 0,
            metrics,
        }
    }

    pub fn with_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_concurrent_pages(mut self, max: usize) -> Self {
        self.max_concurrent_pages = max;
        self
    }

    pub async fn get_total_listings(&self, token: &SessionToken) -> Result<u32> {
        let response = self
            .site
            .find(token, &self.base_filter)
            .await
            .map_err(|e| SyncError::fetch(format!("Total listing count query failed: {}", e)))?;

        Ok(response.total_search_results)
    }

    pub async fn fetch_all_listings(&self, token: &SessionToken) -> Result<ListingSet> {
        let total = self.get_total_listings(token).await?;
        let pages = page_count(total);
        tracing::info!("📄 {} listings on the site, fetching {} pages", total, pages);

        if pages == 0 {
            return Ok(ListingSet::from_pages(Vec::new(), true));
        }

        let concurrency = if self.max_concurrent_pages == 0 {
            pages as usize
        } else {
            self.max_concurrent_pages
        };

        // `buffered` yields in page order whatever order the requests finish in.
        let results: Vec<(u32, Result<Vec<RawListing>>)> = stream::iter(1..=pages)
            .map(|page| self.fetch_page(token, page))
            .buffered(concurrency)
            .collect()
            .await;

        let mut fetched = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        for (page, result) in results {
            match result {
                Ok(listings) => fetched.push(listings),
                Err(e) => failed.push((page, e)),
            }
        }

        self.metrics.add_pages_fetched(fetched.len() as u64);
        self.metrics.add_pages_failed(failed.len() as u64);

        if !failed.is_empty() {
            let summary = failed
                .iter()
                .map(|(page, e)| format!("page {}: {}", page, e))
                .collect::<Vec<_>>()
                .join("; ");

            match self.policy {
                PageFailurePolicy::Strict => {
                    return Err(SyncError::fetch(format!(
                        "{} of {} page requests failed ({})",
                        failed.len(),
                        pages,
                        summary
                    )));
                }
                PageFailurePolicy::Lenient if fetched.is_empty() => {
                    return Err(SyncError::fetch(format!("All {} page requests failed ({})", pages, summary)));
                }
                PageFailurePolicy::Lenient => {
                    tracing::warn!("Continuing without {} failed pages: {}", failed.len(), summary);
                }
            }
        }

        let set = ListingSet::from_pages(fetched, failed.is_empty());
        tracing::info!("Fetched {} distinct listings", set.len());

        Ok(set)
    }

    async fn fetch_page(&self, token: &SessionToken, page: u32) -> (u32, Result<Vec<RawListing>>) {
        let filter = page_filter(&self.base_filter, page);
        let result = self.site.find(token, &filter).await.map(|response| {
            tracing::debug!("Page {} returned {} listings", page, response.results.len());
            response.results
        });

        (page, result)
    }
}
