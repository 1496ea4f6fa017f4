use std::sync::Arc;
use std::time::Duration;

use super::authenticator::Authenticator;
use crate::api::{ProbeStatus, SessionToken, SiteApi};
use crate::core::{Result, SyncMetrics};
use crate::storage::SyncState;

/// A token the site accepts, and whether it came from a login this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSession {
    pub token: SessionToken,
    pub renewed: bool,
}

/// Hands out a session token the site currently accepts.
///
/// A rejected probe leads to exactly one login; a probe that never reached
/// the server is retried and then fails the cycle without logging in.
/// Never writes to the store: a renewed token is persisted by the caller
/// once the cycle succeeds.
pub struct SessionValidator {
    site: Arc<dyn SiteApi>,
    authenticator: Authenticator,
    state: SyncState,
    metrics: Arc<SyncMetrics>,
    probe_retries: u32,
    retry_delay: Duration,
}

impl SessionValidator {
    pub fn new(
        site: Arc<dyn SiteApi>,
        authenticator: Authenticator,
        state: SyncState,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            site,
            authenticator,
            state,
            metrics,
            probe_retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }

    pub fn with_probe_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.probe_retries = retries;
        self.retry_delay = delay;
        self
    }

    pub async fn get_valid_session_id(&self) -> Result<ValidSession> {
        match self.state.session_token().await? {
            Some(token) => match self.probe_with_retry(&token).await? {
                ProbeStatus::Valid => {
                    tracing::debug!("Stored session is still valid");
                    return Ok(ValidSession {
                        token,
                        renewed: false,
                    });
                }
                ProbeStatus::Rejected(status) => {
                    tracing::warn!("Stored session rejected ({}), logging in again", status);
                }
            },
            None => tracing::info!("No stored session, logging in"),
        }

        let token = self.authenticator.login().await?;
        self.metrics.increment_logins();

        Ok(ValidSession {
            token,
            renewed: true,
        })
    }

    async fn probe_with_retry(&self, token: &SessionToken) -> Result<ProbeStatus> {
        let mut attempt = 0;
        loop {
            match self.site.probe(token).await {
                Ok(status) => return Ok(status),
                Err(e) if attempt < self.probe_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Session probe failed (attempt {}/{}): {}",
                        attempt,
                        self.probe_retries + 1,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
