//! Redis-backed timeout registry (C7).
//!
//! Coordination flags between the payment callback and the finalize
//! worker's scheduled wait. Not a source of truth: the ledger's
//! `pending` status is authoritative, this just lets the timeout task
//! stand down cheaply when payment already landed.

use crate::providers::{TimeoutState, TimeoutStore};
use fairgate_core::{BookingId, CoreError, EventId, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

const PROCESSING: &str = "processing";
const PROCESSED: &str = "processed";

/// Records are short-lived (one grace window plus slack); expire them
/// so an orphaned key cannot outlive its booking by more than a day.
const RECORD_TTL_SECS: u64 = 86_400;

/// Redis timeout registry.
#[derive(Clone)]
pub struct RedisTimeoutStore {
    conn: ConnectionManager,
}

impl RedisTimeoutStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Transient`] when the connection manager
    /// cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CoreError::Transient(format!("redis client: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CoreError::Transient(format!("redis connect: {e}")))?;
        Ok(Self { conn })
    }

    fn key(event: EventId, booking: BookingId) -> String {
        format!("timeout:{event}:{booking}")
    }
}

impl TimeoutStore for RedisTimeoutStore {
    async fn begin(&self, event: EventId, booking: BookingId) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::key(event, booking), PROCESSING, RECORD_TTL_SECS)
            .await
            .map_err(|e| CoreError::Transient(format!("timeout begin: {e}")))?;
        Ok(())
    }

    async fn get(&self, event: EventId, booking: BookingId) -> Result<TimeoutState> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(Self::key(event, booking))
            .await
            .map_err(|e| CoreError::Transient(format!("timeout read: {e}")))?;
        // Missing key reads as processing: a lost record must not
        // falsely short-circuit the timeout.
        Ok(match value.as_deref() {
            Some(PROCESSED) => TimeoutState::Processed,
            _ => TimeoutState::Processing,
        })
    }

    async fn mark_processed(&self, event: EventId, booking: BookingId) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::key(event, booking), PROCESSED, RECORD_TTL_SECS)
            .await
            .map_err(|e| CoreError::Transient(format!("timeout mark: {e}")))?;
        Ok(())
    }

    async fn delete(&self, event: EventId, booking: BookingId) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .del(Self::key(event, booking))
            .await
            .map_err(|e| CoreError::Transient(format!("timeout delete: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a running Redis instance:
    //   docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn lifecycle() {
        let store = RedisTimeoutStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();
        let event = EventId::new();
        let booking = BookingId::new();

        // Missing record reads as processing.
        assert_eq!(
            store.get(event, booking).await.unwrap(),
            TimeoutState::Processing
        );

        store.begin(event, booking).await.unwrap();
        assert_eq!(
            store.get(event, booking).await.unwrap(),
            TimeoutState::Processing
        );

        store.mark_processed(event, booking).await.unwrap();
        assert_eq!(
            store.get(event, booking).await.unwrap(),
            TimeoutState::Processed
        );

        store.delete(event, booking).await.unwrap();
        assert_eq!(
            store.get(event, booking).await.unwrap(),
            TimeoutState::Processing
        );
    }
}
