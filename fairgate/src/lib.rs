//! # Fairgate
//!
//! High-concurrency ticket booking backend.
//!
//! The booking coordination core splits every reservation into two
//! phases: a fast atomic admission against a Redis counter, then a
//! durable transactional write into a Postgres ledger. An asynchronous
//! worker pool consumes the Kafka finalize stream to request payment
//! and time out unpaid bookings; a waitlist absorbs demand past
//! capacity and is promoted onto freed seats; a periodic reconciler
//! repairs any divergence between the counter and the ledger.
//!
//! ```text
//! client ──> coordinator ──reserve──> [Redis counter]
//!                │ admitted
//!                ├──> [Postgres ledger: pending + seat holds]
//!                ├──> [Kafka "bookings"] ──> worker pool
//!                │                             ├─ payment request email
//!                │                             └─ timeout watchdog ──┐
//!                │ refused                                           │
//!                └──> [waitlist]  <──── promotion on cancel/timeout ─┘
//! ```
//!
//! Three binaries share this library: `server` (HTTP surface),
//! `worker` (finalize pool) and `reconcile` (repair pass + expiry
//! sweep).

#![forbid(unsafe_code)]

pub mod config;
pub mod environment;
pub mod handlers;
pub mod metrics;
pub mod mocks;
pub mod providers;
pub mod router;
pub mod services;
pub mod state;
pub mod stores;
pub mod worker;

pub use config::Config;
pub use environment::Providers;
