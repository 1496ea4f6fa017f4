use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::MonitoringConfig;

/// `RUST_LOG` takes precedence over `monitoring.log_level`.
pub fn init_logging(monitoring: &MonitoringConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&monitoring.log_level))
        .with_context(|| format!("Invalid log level '{}'", monitoring.log_level))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .context("Logging was already initialized")?;

    tracing::debug!("Logging initialized at level: {}", monitoring.log_level);
    Ok(())
}
