use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use super::orchestrator::SyncOrchestrator;
use crate::core::health::Component;
use crate::core::{HealthChecker, Result, SyncMetrics};
use crate::notify::{deliver_all, DeliveryReport, Notifier};
use crate::scanner::ListingSummary;

/// New listings of one cycle and how their delivery went.
#[derive(Debug, Default)]
pub struct TickReport {
    pub new_listings: Vec<ListingSummary>,
    pub delivery: DeliveryReport,
}

/// Drives sync cycles on a fixed interval and forwards new listings.
pub struct Scheduler {
    orchestrator: Arc<SyncOrchestrator>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<SyncMetrics>,
    health: HealthChecker,
    interval: Duration,
    run_on_start: bool,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<SyncMetrics>,
        health: HealthChecker,
        interval: Duration,
        run_on_start: bool,
    ) -> Self {
        Self {
            orchestrator,
            notifier,
            metrics,
            health,
            interval,
            run_on_start,
        }
    }

    /// One cycle plus delivery. A failed cycle notifies nobody.
    pub async fn tick(&self) -> Result<TickReport> {
        let new_listings = self.orchestrator.run_sync_cycle().await?;
        if new_listings.is_empty() {
            tracing::debug!("No new listings this cycle");
            return Ok(TickReport::default());
        }

        tracing::info!("🆕 Found {} new listings", new_listings.len());
        let delivery = deliver_all(self.notifier.as_ref(), &new_listings).await;
        self.metrics
            .add_notifications(delivery.sent as u64, delivery.failed.len() as u64);
        self.health
            .update_component(Component::Notifier, delivery.is_complete())
            .await;

        Ok(TickReport {
            new_listings,
            delivery,
        })
    }

    /// Runs until `shutdown` resolves. Ticks missed by a long cycle are skipped.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let first = if self.run_on_start {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut interval = tokio::time::interval_at(first, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "⏱️  Scheduler started (every {}s)",
            self.interval.as_secs()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::warn!("Cycle skipped, retrying next tick: {}", e);
                    }
                }
            }
        }
    }
}
