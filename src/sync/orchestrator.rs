use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::{LoginDriver, SiteApi};
use crate::core::health::{Component, CycleReport};
use crate::core::{Config, HealthChecker, Result, SyncError, SyncMetrics};
use crate::scanner::{DiffEngine, ListingFetcher, ListingSet, ListingSummary};
use crate::session::{Authenticator, SessionValidator};
use crate::storage::{SessionStore, SyncState};

/// Runs one sync cycle: session, fetch, diff, persist.
pub struct SyncOrchestrator {
    validator: SessionValidator,
    fetcher: ListingFetcher,
    diff: DiffEngine,
    state: SyncState,
    metrics: Arc<SyncMetrics>,
    health: HealthChecker,
    in_flight: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        validator: SessionValidator,
        fetcher: ListingFetcher,
        diff: DiffEngine,
        state: SyncState,
        metrics: Arc<SyncMetrics>,
        health: HealthChecker,
    ) -> Self {
        Self {
            validator,
            fetcher,
            diff,
            state,
            metrics,
            health,
            in_flight: Mutex::new(()),
        }
    }

    /// Wires every component from configuration and the three collaborators.
    pub fn from_config(
        config: &Config,
        site: Arc<dyn SiteApi>,
        login: Arc<dyn LoginDriver>,
        store: Arc<dyn SessionStore>,
        metrics: Arc<SyncMetrics>,
        health: HealthChecker,
    ) -> Self {
        let state = SyncState::new(store, &config.storage.key_prefix);
        let authenticator = Authenticator::new(login, &config.site);
        let validator =
            SessionValidator::new(site.clone(), authenticator, state.clone(), metrics.clone())
                .with_probe_retries(config.sync.probe_retries, config.sync.probe_retry_delay());
        let fetcher = ListingFetcher::new(site, config.site.base_filter.clone(), metrics.clone())
            .with_policy(config.sync.page_failure_policy)
            .with_max_concurrent_pages(config.sync.max_concurrent_pages);
        let diff = DiffEngine::new(config.site.endpoint());

        Self::new(validator, fetcher, diff, state, metrics, health)
    }

    /// Returns summaries of listings not seen in the previous successful cycle.
    ///
    /// A failed cycle leaves the stored token and known identifiers untouched. Fails with
    /// [`SyncError::CycleInProgress`] when another cycle is still running.
    pub async fn run_sync_cycle(&self) -> Result<Vec<ListingSummary>> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SyncError::CycleInProgress)?;

        let span = tracing::info_span!("sync_cycle", cycle = %Uuid::new_v4());
        let started = Instant::now();
        self.metrics.increment_cycles_started();

        let result = self.cycle().instrument(span).await;

        self.metrics.record_cycle_duration(started.elapsed());
        self.record_outcome(&result).await;

        result
    }

    async fn cycle(&self) -> Result<Vec<ListingSummary>> {
        tracing::info!("🔄 Sync cycle starting");

        let session = self.validator.get_valid_session_id().await?;
        let listings = self.fetcher.fetch_all_listings(&session.token).await?;
        let known = self.state.known_ids().await?;

        let new_summaries = self.diff.diff_new(&listings, &known);
        let ids = known_ids_after(&listings, &known);

        if session.renewed {
            self.state.set_session_token(&session.token).await?;
        }
        self.state.set_known_ids(&ids).await?;

        tracing::info!(
            "✅ Sync cycle finished: {} listings, {} new",
            listings.len(),
            new_summaries.len()
        );
        self.metrics.add_new_listings(new_summaries.len() as u64);

        Ok(new_summaries)
    }

    async fn record_outcome(&self, result: &Result<Vec<ListingSummary>>) {
        match result {
            Ok(new) => {
                self.health.update_component(Component::Site, true).await;
                self.health.update_component(Component::Store, true).await;
                self.health
                    .record_cycle(CycleReport {
                        finished_at: Utc::now(),
                        succeeded: true,
                        new_listings: new.len(),
                        error: None,
                    })
                    .await;
            }
            Err(e) => {
                self.metrics.increment_cycles_failed();
                tracing::error!("❌ Sync cycle failed: {}", e);

                match e {
                    SyncError::Persistence { .. } => self.health.update_component(Component::Store, false).await,
                    SyncError::Authentication { .. } | SyncError::Fetch { .. } => {
                        self.health.update_component(Component::Site, false).await
                    }
                    _ => {}
                }
                self.health
                    .record_cycle(CycleReport {
                        finished_at: Utc::now(),
                        succeeded: false,
                        new_listings: 0,
                        error: Some(e.to_string()),
                    })
                    .await;
            }
        }
    }
}

/// The full fetch replaces the known set. A partial fetch keeps the old ids
/// as well, so listings on failed pages are not announced again.
fn known_ids_after(listings: &ListingSet, known: &HashSet<String>) -> Vec<String> {
    let mut ids = listings.ids();
    if listings.is_complete() {
        return ids;
    }

    let fetched: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut retained: Vec<String> = known
        .iter()
        .filter(|id| !fetched.contains(id.as_str()))
        .cloned()
        .collect();
    retained.sort();
    ids.extend(retained);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::MockSiteApi;
    use crate::api::login::MockLoginDriver;
    use crate::api::{ListingId, ProbeStatus, RawListing, SearchResponse, SessionToken};
    use crate::scanner::PageFailurePolicy;
    use crate::storage::{MemoryStore, MockSessionStore};

    fn listing(id: &str) -> RawListing {
        RawListing {
            listing_id: ListingId::new(id),
            latitude: None,
            longitude: None,
            price: None,
            address: None,
            region: None,
            room_count: None,
            description: None,
            publication_end_date: None,
            preview_path: Some(format!("/aanbod/{}", id)),
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.site.username = "student".to_string();
        config.site.password = "secret".to_string();
        config.site.endpoint = "https://example.org".to_string();
        config.site.base_filter = "model[A]".to_string();
        config.storage.key_prefix = "t".to_string();
        config.sync.probe_retry_delay_ms = 1;
        config
    }

    /// Site with `ids` spread over pages of ten; page `fail_page` answers 503.
    fn site(ids: Vec<&'static str>, fail_page: Option<u32>) -> MockSiteApi {
        let mut site = MockSiteApi::new();
        site.expect_probe().returning(|_| Ok(ProbeStatus::Valid));
        site.expect_find().returning(move |_, filter| {
            let total = ids.len() as u32;
            if filter == "model[A]" {
                return Ok(SearchResponse {
                    total_search_results: total,
                    results: Vec::new(),
                });
            }
            let page: u32 = filter
                .trim_start_matches("model[A]~page[")
                .trim_end_matches(']')
                .parse()
                .unwrap();
            if Some(page) == fail_page {
                return Err(SyncError::fetch("503"));
            }
            let start = ((page - 1) * 10) as usize;
            Ok(SearchResponse {
                total_search_results: total,
                results: ids.iter().skip(start).take(10).map(|id| listing(id)).collect(),
            })
        });
        site
    }

    fn no_login() -> MockLoginDriver {
        let mut driver = MockLoginDriver::new();
        driver.expect_submit_credentials().times(0);
        driver
    }

    async fn seeded_store(known: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let state = SyncState::new(store.clone(), "t");
        state.set_session_token(&SessionToken::new("valid")).await.unwrap();
        let known: Vec<String> = known.iter().map(|s| s.to_string()).collect();
        state.set_known_ids(&known).await.unwrap();
        store
    }

    fn orchestrator(config: &Config, site: MockSiteApi, store: Arc<dyn SessionStore>) -> SyncOrchestrator {
        SyncOrchestrator::from_config(
            config,
            Arc::new(site),
            Arc::new(no_login()),
            store,
            Arc::new(SyncMetrics::new()),
            HealthChecker::new(),
        )
    }

    async fn stored_ids(store: Arc<MemoryStore>) -> Vec<String> {
        let mut ids: Vec<String> = SyncState::new(store, "t")
            .known_ids()
            .await
            .unwrap()
            .into_iter()
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_cycle_reports_new_listings_and_overwrites_known_ids() {
        let store = seeded_store(&["1", "2", "gone"]).await;
        let orchestrator = orchestrator(&config(), site(vec!["1", "2", "3", "4"], None), store.clone());

        let new = orchestrator.run_sync_cycle().await.unwrap();
        let ids: Vec<&str> = new.iter().map(|s| s.listing_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4"]);
        assert_eq!(new[0].url, "https://example.org/aanbod/3");

        assert_eq!(stored_ids(store).await, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_rerun_with_unchanged_dataset_is_empty() {
        let store = seeded_store(&[]).await;
        let orchestrator = orchestrator(&config(), site(vec!["1", "2"], None), store.clone());

        assert_eq!(orchestrator.run_sync_cycle().await.unwrap().len(), 2);
        assert!(orchestrator.run_sync_cycle().await.unwrap().is_empty());
        assert_eq!(stored_ids(store).await, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_page_failure_leaves_state_untouched() {
        let ids: Vec<&'static str> = vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];
        let store = seeded_store(&["1"]).await;
        let orchestrator = orchestrator(&config(), site(ids, Some(2)), store.clone());

        assert!(orchestrator.run_sync_cycle().await.unwrap_err().is_fetch());
        assert_eq!(stored_ids(store).await, vec!["1"]);

        let status = orchestrator.health.get_status().await;
        assert!(!status.components.site);
        assert!(!status.last_cycle.unwrap().succeeded);
    }

    #[tokio::test]
    async fn test_renewed_token_not_stored_when_fetch_fails() {
        let store = seeded_store(&["1"]).await;
        let state = SyncState::new(store.clone(), "t");
        state.set_session_token(&SessionToken::new("stale")).await.unwrap();

        let mut site = MockSiteApi::new();
        site.expect_probe()
            .times(1)
            .returning(|_| Ok(ProbeStatus::Rejected(401)));
        site.expect_find()
            .returning(|_, _| Err(SyncError::fetch("503")));

        let mut driver = MockLoginDriver::new();
        driver.expect_submit_credentials().times(1).returning(|_, _| {
            let mut cookies = crate::api::Cookies::new();
            cookies.insert("ASP.NET_SessionId".to_string(), "fresh".to_string());
            Ok(cookies)
        });

        let orchestrator = SyncOrchestrator::from_config(
            &config(),
            Arc::new(site),
            Arc::new(driver),
            store.clone(),
            Arc::new(SyncMetrics::new()),
            HealthChecker::new(),
        );

        assert!(orchestrator.run_sync_cycle().await.unwrap_err().is_fetch());
        assert_eq!(
            state.session_token().await.unwrap(),
            Some(SessionToken::new("stale"))
        );
        assert_eq!(stored_ids(store).await, vec!["1"]);
    }

    #[tokio::test]
    async fn test_renewed_token_stored_after_successful_cycle() {
        let store = seeded_store(&[]).await;
        let state = SyncState::new(store.clone(), "t");
        state.set_session_token(&SessionToken::new("stale")).await.unwrap();

        let mut site = MockSiteApi::new();
        site.expect_probe()
            .returning(|_| Ok(ProbeStatus::Rejected(401)));
        site.expect_find().returning(|_, filter| {
            Ok(SearchResponse {
                total_search_results: 1,
                results: if filter == "model[A]" { vec![] } else { vec![listing("1")] },
            })
        });

        let mut driver = MockLoginDriver::new();
        driver.expect_submit_credentials().times(1).returning(|_, _| {
            let mut cookies = crate::api::Cookies::new();
            cookies.insert("ASP.NET_SessionId".to_string(), "fresh".to_string());
            Ok(cookies)
        });

        let orchestrator = SyncOrchestrator::from_config(
            &config(),
            Arc::new(site),
            Arc::new(driver),
            store.clone(),
            Arc::new(SyncMetrics::new()),
            HealthChecker::new(),
        );

        assert_eq!(orchestrator.run_sync_cycle().await.unwrap().len(), 1);
        assert_eq!(
            state.session_token().await.unwrap(),
            Some(SessionToken::new("fresh"))
        );
    }

    #[tokio::test]
    async fn test_lenient_partial_fetch_keeps_previous_ids() {
        let ids: Vec<&'static str> = vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11"];
        let mut config = config();
        config.sync.page_failure_policy = PageFailurePolicy::Lenient;
        let store = seeded_store(&["11", "old"]).await;
        let orchestrator = orchestrator(&config, site(ids, Some(2)), store.clone());

        let new = orchestrator.run_sync_cycle().await.unwrap();
        assert_eq!(new.len(), 10);

        let stored = stored_ids(store).await;
        assert!(stored.contains(&"11".to_string()));
        assert!(stored.contains(&"old".to_string()));
        assert_eq!(stored.len(), 12);
    }

    #[tokio::test]
    async fn test_persistence_failure_fails_cycle() {
        let mut store = MockSessionStore::new();
        store
            .expect_get_string()
            .returning(|_| Ok(Some("valid".to_string())));
        store
            .expect_get_string_list()
            .returning(|_| Ok(Some(vec![])));
        store
            .expect_set_string_list()
            .times(1)
            .returning(|_, _| Err(SyncError::persistence("disk full")));

        let orchestrator = orchestrator(&config(), site(vec!["1"], None), Arc::new(store));
        let err = orchestrator.run_sync_cycle().await.unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(orchestrator.metrics.snapshot().cycles_failed, 1);
        assert!(!orchestrator.health.get_status().await.components.store);
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_rejected() {
        let store = seeded_store(&[]).await;
        let orchestrator = orchestrator(&config(), site(vec!["1"], None), store);

        let _held = orchestrator.in_flight.lock().await;
        assert!(matches!(
            orchestrator.run_sync_cycle().await,
            Err(SyncError::CycleInProgress)
        ));
    }

    #[test]
    fn test_known_ids_after_complete_fetch_is_fetch_order() {
        let listings = ListingSet::from_pages(vec![vec![listing("b"), listing("a")]], true);
        let known: HashSet<String> = ["z".to_string()].into_iter().collect();
        assert_eq!(known_ids_after(&listings, &known), vec!["b", "a"]);
    }
}
