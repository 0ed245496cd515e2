//! Production store implementations: Redis for the fast tier
//! (inventory counter, timeout registry), Postgres for the durable
//! tier (ledger, seats, events, waitlist, users).

pub mod counter;
pub mod postgres;
pub mod timeout;

pub use counter::RedisInventoryCounter;
pub use postgres::{
    connect_pool, run_migrations, PgBookingLedger, PgEventCatalog, PgSeatRegistry,
    PgUserDirectory, PgWaitlistStore,
};
pub use timeout::RedisTimeoutStore;
