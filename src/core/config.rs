use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::error::SyncError;
use crate::scanner::PageFailurePolicy;

const ENV_PREFIX: &str = "ROOM_FINDER";
const DEFAULT_CONFIG_FILE: &str = "room-finder";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub base_filter: String,
    pub hide_units: Option<String>,
    pub request_timeout_secs: u64,
    pub login_timeout_secs: u64,
    pub session_cookie: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.studentenwoningweb.nl".to_string(),
            username: String::new(),
            password: String::new(),
            base_filter: "model[Regulier aanbod]~soort[Zelfstandig]~predef[]".to_string(),
            hide_units: None,
            request_timeout_secs: 30,
            login_timeout_secs: 30,
            session_cookie: "ASP.NET_SessionId".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// Endpoint without a trailing slash, ready for path concatenation.
    pub fn endpoint(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: u64,
    pub page_failure_policy: PageFailurePolicy,
    /// 0 means every page request is in flight at once.
    pub max_concurrent_pages: usize,
    pub probe_retries: u32,
    pub probe_retry_delay_ms: u64,
    pub run_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1800,
            page_failure_policy: PageFailurePolicy::Strict,
            max_concurrent_pages: 0,
            probe_retries: 2,
            probe_retry_delay_ms: 500,
            run_on_start: true,
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_retry_delay(&self) -> Duration {
        Duration::from_millis(self.probe_retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub url: String,
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "room-finder".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub telegram_bot_token: Option<String>,
    pub chat_ids: Vec<i64>,
    pub api_base: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            chat_ids: Vec::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub health_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            health_port: 3000,
        }
    }
}

impl Config {
    /// Layers `.env`, the optional config file and `ROOM_FINDER__*` variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenv::dotenv().ok();

        let file = path.unwrap_or(DEFAULT_CONFIG_FILE);
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("notify.chat_ids")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), SyncError> {
        if self.site.username.is_empty() || self.site.password.is_empty() {
            return Err(SyncError::config("site.username and site.password are required"));
        }

        reqwest::Url::parse(&self.site.endpoint).map_err(|e| {
            SyncError::config(format!("site.endpoint '{}' is invalid: {}", self.site.endpoint, e))
        })?;

        if self.sync.interval_secs == 0 {
            return Err(SyncError::config("sync.interval_secs must be greater than zero"));
        }

        if self.notify.telegram_bot_token.is_some() && self.notify.chat_ids.is_empty() {
            tracing::warn!("Telegram token configured without chat ids, nothing will be delivered");
        }

        Ok(())
    }
}
