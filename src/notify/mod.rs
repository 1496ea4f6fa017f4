//! Delivery of new-listing summaries.

pub mod telegram;

use async_trait::async_trait;

use crate::core::{Result, SyncError};
use crate::scanner::ListingSummary;

pub use telegram::TelegramNotifier;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &ListingSummary) -> Result<()>;
}

/// Writes summaries to the log instead of a chat.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &ListingSummary) -> Result<()> {
        tracing::info!(
            "🏠 New listing {}: {} | {} | {}",
            summary.listing_id,
            summary.address.as_deref().unwrap_or("unknown address"),
            summary.price.as_deref().unwrap_or("?"),
            summary.url
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: Vec<(String, SyncError)>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends every summary in order and collects each outcome.
pub async fn deliver_all(notifier: &dyn Notifier, summaries: &[ListingSummary]) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for summary in summaries {
        match notifier.notify(summary).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::error!("❌ Failed to deliver listing {}: {}", summary.listing_id, e);
                report.failed.push((summary.listing_id.clone(), e));
            }
        }
    }

    report
}
