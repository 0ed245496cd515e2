//! HTTP server entry point.
//!
//! Wires the production providers (Postgres ledger, Redis counter and
//! timeout registry, Kafka producer, SMTP notifier) into the booking
//! coordinator and serves the REST surface.

use std::sync::Arc;

use fairgate::providers::{ConsoleNotifier, MailNotifier, SmtpNotifier};
use fairgate::services::{BookingCoordinator, PaymentService};
use fairgate::state::AppState;
use fairgate::stores::{
    connect_pool, run_migrations, PgBookingLedger, PgEventCatalog, PgSeatRegistry,
    PgUserDirectory, PgWaitlistStore, RedisInventoryCounter, RedisTimeoutStore,
};
use fairgate::{Config, Providers};
use fairgate_stream::BookingProducer;
use fairgate_web::JwtDecoder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(port = config.http_port, env = %config.env, "starting fairgate server");

    let metrics_handle = fairgate::metrics::install_recorder();

    let pool = connect_pool(&config.postgres_url, config.max_db_connections).await?;
    run_migrations(&pool).await?;

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
        PgUserDirectory::new(pool.clone()),
    ));

    let coordinator = Arc::new(BookingCoordinator::new(
        Arc::clone(&providers),
        config.payment_url.clone(),
        config.booking_grace,
    ));
    let payment = Arc::new(PaymentService::new(Arc::clone(&providers)));

    let state = AppState {
        coordinator,
        payment,
        waitlist: PgWaitlistStore::new(pool.clone()),
        seats: PgSeatRegistry::new(pool),
        metrics: metrics_handle,
    };

    let app = fairgate::router::build_router(state, JwtDecoder::new(&config.jwt_secret));

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
