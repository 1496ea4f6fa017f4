use std::sync::Arc;
use std::time::Duration;

use crate::api::{LoginDriver, SessionToken};
use crate::core::config::SiteConfig;
use crate::core::{Result, SyncError};

/// Exchanges the configured credentials for a fresh session token.
///
/// Does not persist the token; the caller decides where it goes.
pub struct Authenticator {
    driver: Arc<dyn LoginDriver>,
    username: String,
    password: String,
    session_cookie: String,
    timeout: Duration,
}

impl Authenticator {
    pub fn new(driver: Arc<dyn LoginDriver>, site: &SiteConfig) -> Self {
        Self {
            driver,
            username: site.username.clone(),
            password: site.password.clone(),
            session_cookie: site.session_cookie.clone(),
            timeout: site.login_timeout(),
        }
    }

    pub async fn login(&self) -> Result<SessionToken> {
        tracing::info!("🔑 Logging in as {}", self.username);

        let submission = self
            .driver
            .submit_credentials(&self.username, &self.password);

        let cookies = match tokio::time::timeout(self.timeout, submission).await {
            Ok(result) => result.map_err(|e| match e {
                SyncError::Authentication { .. } => e,
                other => SyncError::authentication(other.to_string()),
            })?,
            Err(_) => {
                return Err(SyncError::authentication(format!(
                    "Login navigation did not finish within {:?}",
                    self.timeout
                )))
            }
        };

        tracing::debug!("Cookies after login: {:?}", cookies.keys().collect::<Vec<_>>());

        match cookies.get(&self.session_cookie) {
            Some(value) if !value.is_empty() => {
                tracing::info!("✅ Login succeeded");
                Ok(SessionToken::new(value.clone()))
            }
            _ => Err(SyncError::authentication(format!(
                "No {} cookie present after login",
                self.session_cookie
            ))),
        }
    }
}
