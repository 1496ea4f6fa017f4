use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::Filter;

use super::metrics::SyncMetrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentHealth,
    pub last_cycle: Option<CycleReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub store: bool,
    pub site: bool,
    pub notifier: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Store,
    Site,
    Notifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub new_listings: usize,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    status: Arc<RwLock<ComponentHealth>>,
    last_cycle: Arc<RwLock<Option<CycleReport>>>,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            status: Arc::new(RwLock::new(ComponentHealth {
                store: false,
                site: false,
                notifier: true,
            })),
            last_cycle: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();
        let last_cycle = self.last_cycle.read().await.clone();

        let cycle_ok = last_cycle.as_ref().map(|c| c.succeeded).unwrap_or(true);
        let status = if components.store && components.site && components.notifier && cycle_ok {
            "healthy"
        } else {
            "degraded"
        };

        HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            last_cycle,
        }
    }

    pub async fn update_component(&self, component: Component, healthy: bool) {
        let mut status = self.status.write().await;
        match component {
            Component::Store => status.store = healthy,
            Component::Site => status.site = healthy,
            Component::Notifier => status.notifier = healthy,
        }
    }

    pub async fn record_cycle(&self, report: CycleReport) {
        *self.last_cycle.write().await = Some(report);
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// `GET /health` and `GET /metrics`, both JSON.
pub fn routes(
    checker: HealthChecker,
    metrics: Arc<SyncMetrics>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::any().map(move || checker.clone()))
        .and_then(|checker: HealthChecker| async move {
            let status = checker.get_status().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&status))
        });

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || warp::reply::json(&metrics.snapshot()));

    health.or(metrics)
}

pub async fn serve(checker: HealthChecker, metrics: Arc<SyncMetrics>, port: u16) {
    warp::serve(routes(checker, metrics))
        .run(([0, 0, 0, 0], port))
        .await;
}
