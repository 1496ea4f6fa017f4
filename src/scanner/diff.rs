use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::fetcher::ListingSet;
use crate::api::RawListing;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Notification-ready projection of a [`RawListing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub listing_id: String,
    pub location: Option<Location>,
    pub price: Option<String>,
    pub url: String,
    pub region: Option<String>,
    pub room_count: Option<u32>,
    pub description: Option<String>,
    pub end_date: Option<String>,
    pub address: Option<String>,
}

/// Finds listings whose id is not in the known set.
pub struct DiffEngine {
    endpoint: String,
}

impl DiffEngine {
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn summarize(&self, listing: &RawListing) -> ListingSummary {
        let location = match (listing.latitude, listing.longitude) {
            (Some(lat), Some(lng)) => Some(Location { lat, lng }),
            _ => None,
        };

        ListingSummary {
            listing_id: listing.listing_id.as_str().to_string(),
            location,
            price: listing.price.clone(),
            url: self.listing_url(listing.preview_path.as_deref()),
            region: listing.region.clone(),
            room_count: listing.room_count,
            description: listing.description.clone(),
            end_date: listing.publication_end_date.clone(),
            address: listing.address.clone(),
        }
    }

    /// Summaries of the new listings, in fetch order.
    pub fn diff_new(&self, listings: &ListingSet, known_ids: &HashSet<String>) -> Vec<ListingSummary> {
        listings
            .iter()
            .filter(|listing| !known_ids.contains(listing.listing_id.as_str()))
            .map(|listing| self.summarize(listing))
            .collect()
    }

    fn listing_url(&self, preview_path: Option<&str>) -> String {
        match preview_path {
            Some(path) if path.starts_with("http://") || path.starts_with("https://") => {
                path.to_string()
            }
            Some(path) if path.starts_with('/') => format!("{}{}", self.endpoint, path),
            Some(path) if !path.is_empty() => format!("{}/{}", self.endpoint, path),
            _ => self.endpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ListingId;

    fn listing(id: &str) -> RawListing {
        RawListing {
            listing_id: ListingId::new(id),
            latitude: Some(51.44),
            longitude: Some(5.47),
            price: Some("612.50".to_string()),
            address: Some(format!("Stratumseind {}", id)),
            region: Some("Centrum".to_string()),
            room_count: Some(2),
            description: Some("Licht appartement".to_string()),
            publication_end_date: Some("2026-10-20".to_string()),
            preview_path: Some(format!("/aanbod/{}", id)),
        }
    }

    fn set(ids: &[&str]) -> ListingSet {
        ListingSet::from_pages(vec![ids.iter().map(|id| listing(id)).collect()], true)
    }

    fn known(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_diff_is_set_difference_in_fetch_order() {
        let engine = DiffEngine::new("https://example.org");
        let new = engine.diff_new(&set(&["4", "1", "3", "2"]), &known(&["1", "2"]));

        let ids: Vec<&str> = new.iter().map(|s| s.listing_id.as_str()).collect();
        assert_eq!(ids, vec!["4", "3"]);
    }

    #[test]
    fn test_unchanged_dataset_yields_nothing() {
        let engine = DiffEngine::new("https://example.org");
        assert!(engine
            .diff_new(&set(&["1", "2"]), &known(&["1", "2", "9"]))
            .is_empty());
    }

    #[test]
    fn test_empty_known_set_makes_everything_new() {
        let engine = DiffEngine::new("https://example.org");
        assert_eq!(engine.diff_new(&set(&["1", "2"]), &HashSet::new()).len(), 2);
    }

    #[test]
    fn test_summary_fields() {
        let engine = DiffEngine::new("https://example.org/");
        let summary = engine.summarize(&listing("7"));

        assert_eq!(summary.location, Some(Location { lat: 51.44, lng: 5.47 }));
        assert_eq!(summary.url, "https://example.org/aanbod/7");
        assert_eq!(summary.price.as_deref(), Some("612.50"));
        assert_eq!(summary.end_date.as_deref(), Some("2026-10-20"));
        assert_eq!(summary.room_count, Some(2));
    }

    #[test]
    fn test_summary_without_coordinates_or_path() {
        let engine = DiffEngine::new("https://example.org");
        let mut raw = listing("8");
        raw.longitude = None;
        raw.preview_path = None;

        let summary = engine.summarize(&raw);
        assert_eq!(summary.location, None);
        assert_eq!(summary.url, "https://example.org");
    }

    #[test]
    fn test_listing_url_variants() {
        let engine = DiffEngine::new("https://example.org");
        assert_eq!(engine.listing_url(Some("aanbod/1")), "https://example.org/aanbod/1");
        assert_eq!(
            engine.listing_url(Some("https://cdn.example.org/x")),
            "https://cdn.example.org/x"
        );
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let engine = DiffEngine::new("https://example.org");
        let json = serde_json::to_value(engine.summarize(&listing("1"))).unwrap();
        assert_eq!(json["roomCount"], 2);
        assert_eq!(json["endDate"], "2026-10-20");
        assert_eq!(json["location"]["lat"], 51.44);
    }
}
