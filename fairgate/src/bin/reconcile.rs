//! Reconciliation entry point.
//!
//! One-shot: seeds missing capacity rows, repairs counter drift and
//! sweeps ended events to `expired`. Run it from cron or a scheduler.

use fairgate::services::Reconciler;
use fairgate::stores::{connect_pool, PgEventCatalog, RedisInventoryCounter};
use fairgate::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let pool = connect_pool(&config.postgres_url, config.max_db_connections).await?;
    let counter = RedisInventoryCounter::new(&config.redis_addr).await?;

    let reconciler = Reconciler::new(PgEventCatalog::new(pool), counter);
    let summary = reconciler.run().await?;

    println!(
        "reconciliation complete: {} seeded, {} fixed, {} expired",
        summary.seeded, summary.fixes, summary.expired
    );
    Ok(())
}
