//! Postgres stores for the durable tier.
//!
//! All writes for one booking touch exactly one partition (the tables
//! are hash-partitioned by event id, see `migrations/`), and every
//! multi-row transition runs inside one transaction.

pub mod bookings;
pub mod events;
pub mod seats;
pub mod users;
pub mod waitlist;

pub use bookings::PgBookingLedger;
pub use events::PgEventCatalog;
pub use seats::PgSeatRegistry;
pub use users::PgUserDirectory;
pub use waitlist::PgWaitlistStore;

use fairgate_core::{CoreError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Create the shared connection pool.
///
/// # Errors
///
/// Returns [`CoreError::Transient`] when the database is unreachable.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(CoreError::database)
}

/// Run embedded migrations.
///
/// # Errors
///
/// Returns [`CoreError::Transient`] when a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| CoreError::Transient(format!("migration failed: {e}")))
}
