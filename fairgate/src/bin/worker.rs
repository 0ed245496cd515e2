//! Finalize worker entry point.
//!
//! Consumes the `bookings` topic with a bounded pool, emails payment
//! requests, arms grace-window timeouts and promotes the waitlist when
//! unpaid bookings lapse.

use std::sync::Arc;

use fairgate::providers::{ConsoleNotifier, MailNotifier, SmtpNotifier};
use fairgate::services::FinalizeService;
use fairgate::stores::{
    connect_pool, PgBookingLedger, PgEventCatalog, PgUserDirectory, PgWaitlistStore,
    RedisInventoryCounter, RedisTimeoutStore,
};
use fairgate::worker::FinalizeWorker;
use fairgate::{Config, Providers};
use fairgate_stream::{BookingConsumer, BookingProducer, FINALIZER_GROUP, FINALIZE_TOPIC};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(max_workers = config.max_workers, "starting fairgate worker");

    let pool = connect_pool(&config.postgres_url, config.max_db_connections).await?;
    let counter = RedisInventoryCounter::new(&config.redis_addr).await?;
    let timeouts = RedisTimeoutStore::new(&config.redis_addr).await?;
    let producer = BookingProducer::new(&config.kafka_brokers)?;

    let notifier = if config.is_production() {
        MailNotifier::Smtp(SmtpNotifier::new(
            config.smtp_host.clone(),
            config.smtp_port,
            config.smtp_user.clone(),
            config.smtp_pass.clone(),
            config.smtp_from.clone(),
        ))
    } else {
        MailNotifier::Console(ConsoleNotifier::new())
    };

    let providers = Arc::new(Providers::new(
        PgBookingLedger::new(pool.clone()),
        PgEventCatalog::new(pool.clone()),
        PgWaitlistStore::new(pool.clone()),
        counter,
        timeouts,
        producer,
        notifier,
        PgUserDirectory::new(pool),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let service = Arc::new(FinalizeService::new(
        providers,
        config.payment_url.clone(),
        config.booking_grace,
        shutdown_rx.clone(),
    ));

    let consumer = Arc::new(BookingConsumer::new(
        &config.kafka_brokers,
        FINALIZER_GROUP,
        FINALIZE_TOPIC,
    )?);
    let dlq = Arc::new(BookingProducer::new(&config.kafka_brokers)?);

    let worker = FinalizeWorker::new(consumer, dlq, service, config.max_workers, shutdown_rx);
    worker.run().await;

    tracing::info!("worker stopped");
    Ok(())
}
