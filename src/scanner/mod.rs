pub mod diff;
pub mod fetcher;

pub use diff::{DiffEngine, ListingSummary, Location};
pub use fetcher::{page_count, ListingFetcher, ListingSet, PageFailurePolicy, PAGE_SIZE};
