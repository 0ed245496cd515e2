//! Mock provider implementations for testing.
//!
//! Simple in-memory implementations of every provider trait, so the
//! coordinator, finalize pipeline and reconciler can be exercised at
//! memory speed without Postgres, Redis or Kafka.

#![allow(clippy::unwrap_used)]

pub mod catalog;
pub mod counter;
pub mod ledger;
pub mod outbound;

pub use catalog::{MockEventCatalog, MockWaitlist};
pub use counter::{MockCounter, MockTimeoutStore};
pub use ledger::MockLedger;
pub use outbound::{MockNotifier, MockPublisher, MockUserDirectory, Notification};
