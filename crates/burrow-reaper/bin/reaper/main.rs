mod cli;

use crate::cli::CLI;
use anyhow::Context;
use burrow_cache::RedisUrlCache;
use burrow_reaper::{Reaper, ReaperSchedule, ReaperSettings};
use burrow_storage::MySqlRecordStore;
use clap::Parser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    burrow_telemetry::init(config.log_format.into())?;

    let schedule = ReaperSchedule::new(&config.cleanup_cron, &config.cron_zone)?;
    let settings = ReaperSettings::builder()
        .enabled(config.cleanup_enabled)
        .build();

    info!(
        cleanup_enabled = config.cleanup_enabled,
        cleanup_cron = %config.cleanup_cron,
        cron_zone = %config.cron_zone,
        "starting burrow reaper"
    );

    let store = MySqlRecordStore::connect(&config.mysql_dsn)
        .await
        .context("failed to connect to mysql")?;
    store
        .ensure_schema()
        .await
        .context("failed to prepare mysql schema")?;
    let cache = RedisUrlCache::connect(&config.redis_url)
        .await
        .context("failed to connect to redis")?;

    let reaper = Reaper::new(store, cache, settings);
    reaper.run(&schedule, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C, shutting down"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
