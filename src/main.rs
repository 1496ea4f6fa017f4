use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use room_finder::api::{FormLoginDriver, SiteClient};
use room_finder::core::health::Component;
use room_finder::core::{health, logging, Config, HealthChecker, SyncMetrics};
use room_finder::notify::{LogNotifier, Notifier, TelegramNotifier};
use room_finder::storage;
use room_finder::{Scheduler, SyncOrchestrator};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Room Finder - new rental listing notifier")]
struct Args {
    /// Run a single sync cycle, print new listings as JSON and exit
    #[clap(long)]
    once: bool,

    /// Path to a configuration file (defaults to ./room-finder.toml if present)
    #[clap(short, long)]
    config: Option<String>,

    /// Log new listings instead of sending notifications
    #[clap(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    logging::init_logging(&config.monitoring)?;

    tracing::info!("🚀 Room Finder starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Site: {} (filter {})", config.site.endpoint, config.site.base_filter);

    let metrics = Arc::new(SyncMetrics::new());
    let health_checker = HealthChecker::new();

    let store = storage::open_store(&config.storage)
        .await
        .context("Failed to open session store")?;
    health_checker.update_component(Component::Store, true).await;

    let site = Arc::new(SiteClient::new(&config.site)?);
    let login = Arc::new(FormLoginDriver::new(&config.site)?);

    let orchestrator = Arc::new(SyncOrchestrator::from_config(
        &config,
        site,
        login,
        store,
        metrics.clone(),
        health_checker.clone(),
    ));

    let notifier: Arc<dyn Notifier> = match (&config.notify.telegram_bot_token, args.dry_run) {
        (Some(token), false) => Arc::new(TelegramNotifier::new(token.clone(), &config.notify)),
        _ => {
            tracing::info!("Notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let scheduler = Scheduler::new(
        orchestrator,
        notifier,
        metrics.clone(),
        health_checker.clone(),
        config.sync.interval(),
        config.sync.run_on_start,
    );

    if args.once {
        let report = scheduler.tick().await?;
        println!("{}", serde_json::to_string_pretty(&report.new_listings)?);
        if !report.delivery.is_complete() {
            anyhow::bail!("{} notifications failed", report.delivery.failed.len());
        }
        return Ok(());
    }

    // Start health check endpoint
    let health_port = config.monitoring.health_port;
    tokio::spawn(async move { health::serve(health_checker, metrics, health_port).await });
    tracing::info!("✅ Health endpoint running on port {}", health_port);

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("👋 Room Finder stopped");
    Ok(())
}
