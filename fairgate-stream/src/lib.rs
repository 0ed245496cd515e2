//! Kafka plumbing for the finalize stream.
//!
//! The coordinator publishes [`FinalizeMessage`]s to the `bookings`
//! topic keyed by event id, which co-partitions all messages for one
//! event and preserves per-event ordering. The worker consumes with
//! manual commits: a message is committed only after it was handled or
//! dead-lettered, so transient failures are redelivered.
//!
//! Delivery is at-least-once; every handler downstream is idempotent
//! (a finalize on a non-pending booking is a no-op).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use fairgate_core::{CoreError, EventId, FinalizeMessage};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Message, OwnedMessage};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;
use thiserror::Error;

/// Topic carrying finalize and timeout messages, keyed by event id.
pub const FINALIZE_TOPIC: &str = "bookings";

/// Topic receiving unprocessable messages verbatim.
pub const DEAD_LETTER_TOPIC: &str = "bookings-dlq";

/// Consumer group of the finalize worker pool.
pub const FINALIZER_GROUP: &str = "fairgate-finalizer";

/// Errors from stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Client could not be created or configured.
    #[error("stream connection failed: {0}")]
    ConnectionFailed(String),

    /// Publish did not get acknowledged.
    #[error("publish to {topic} failed: {reason}")]
    PublishFailed {
        /// Destination topic.
        topic: String,
        /// Broker-reported reason.
        reason: String,
    },

    /// Fetch or commit failed.
    #[error("consume failed: {0}")]
    ConsumeFailed(String),
}

impl From<StreamError> for CoreError {
    fn from(err: StreamError) -> Self {
        Self::Transient(err.to_string())
    }
}

/// Producer for the finalize stream.
///
/// Wraps an rdkafka [`FutureProducer`] configured for durable writes
/// (`acks=all`). One producer serves both the `bookings` topic and the
/// dead-letter topic; the topic is chosen per publish.
pub struct BookingProducer {
    producer: FutureProducer,
    timeout: Duration,
}

impl BookingProducer {
    /// Create a producer with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ConnectionFailed`] when the client cannot
    /// be created from the broker list.
    pub fn new(brokers: &str) -> Result<Self, StreamError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a builder for custom producer settings.
    #[must_use]
    pub fn builder() -> BookingProducerBuilder {
        BookingProducerBuilder::default()
    }

    /// Publish a finalize message to [`FINALIZE_TOPIC`], keyed by its
    /// event id.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::PublishFailed`] when the broker does not
    /// acknowledge the write within the timeout.
    pub async fn publish(&self, message: &FinalizeMessage) -> Result<(), StreamError> {
        let payload = message
            .to_bytes()
            .map_err(|e| StreamError::PublishFailed {
                topic: FINALIZE_TOPIC.to_string(),
                reason: e.to_string(),
            })?;
        self.publish_raw(FINALIZE_TOPIC, &key_for(message.event_id), &payload)
            .await
    }

    /// Publish raw bytes to an arbitrary topic. Used by the worker to
    /// forward poisoned messages to the dead-letter topic verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::PublishFailed`] when the broker does not
    /// acknowledge the write within the timeout.
    pub async fn publish_raw(
        &self,
        topic: &str,
        key: &[u8],
        payload: &[u8],
    ) -> Result<(), StreamError> {
        let record = FutureRecord::to(topic).payload(payload).key(key);

        match self.producer.send(record, Timeout::After(self.timeout)).await {
            Ok((partition, offset)) => {
                tracing::debug!(topic, partition, offset, "message published");
                Ok(())
            }
            Err((kafka_error, _)) => {
                tracing::error!(topic, error = %kafka_error, "publish failed");
                Err(StreamError::PublishFailed {
                    topic: topic.to_string(),
                    reason: kafka_error.to_string(),
                })
            }
        }
    }
}

/// Partition key for an event: its id in string form.
#[must_use]
pub fn key_for(event_id: EventId) -> Vec<u8> {
    event_id.to_string().into_bytes()
}

/// Builder for [`BookingProducer`].
#[derive(Default)]
pub struct BookingProducerBuilder {
    brokers: Option<String>,
    acks: Option<String>,
    timeout: Option<Duration>,
}

impl BookingProducerBuilder {
    /// Set the comma-separated broker list.
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the acknowledgment mode (`"0"`, `"1"`, `"all"`).
    /// Default: `"all"`: a finalize message is only considered
    /// published once every replica has it.
    #[must_use]
    pub fn acks(mut self, acks: impl Into<String>) -> Self {
        self.acks = Some(acks.into());
        self
    }

    /// Set the send timeout. Default: 5 seconds.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the producer.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ConnectionFailed`] when brokers are
    /// missing or the client cannot be created.
    pub fn build(self) -> Result<BookingProducer, StreamError> {
        let brokers = self
            .brokers
            .ok_or_else(|| StreamError::ConnectionFailed("brokers not configured".to_string()))?;

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", self.acks.as_deref().unwrap_or("all"))
            .create()
            .map_err(|e| StreamError::ConnectionFailed(format!("create producer: {e}")))?;

        tracing::info!(brokers = %brokers, "booking producer created");

        Ok(BookingProducer {
            producer,
            timeout: self.timeout.unwrap_or(Duration::from_secs(5)),
        })
    }
}

/// A message fetched from the finalize stream, detached from the
/// consumer's buffers so it can be handled in a spawned task.
pub struct FetchedMessage {
    inner: OwnedMessage,
}

impl FetchedMessage {
    /// Message payload; empty when the record had none.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        self.inner.payload().unwrap_or_default()
    }

    /// Partition key; empty when the record had none.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        self.inner.key().unwrap_or_default()
    }

    /// Source topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.inner.topic()
    }

    /// Source offset, for logging.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.inner.offset()
    }
}

/// Consumer for the finalize stream with manual commits.
///
/// Auto-commit is disabled: the worker commits a message only after it
/// was handled or dead-lettered, which is what makes transient
/// failures redeliverable.
pub struct BookingConsumer {
    consumer: StreamConsumer,
}

impl BookingConsumer {
    /// Subscribe to `topic` in consumer group `group`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ConnectionFailed`] when the consumer
    /// cannot be created or the subscription fails.
    pub fn new(brokers: &str, group: &str, topic: &str) -> Result<Self, StreamError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| StreamError::ConnectionFailed(format!("create consumer: {e}")))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| StreamError::ConnectionFailed(format!("subscribe {topic}: {e}")))?;

        tracing::info!(brokers, group, topic, "booking consumer subscribed");

        Ok(Self { consumer })
    }

    /// Fetch the next message.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ConsumeFailed`] on transport errors.
    pub async fn fetch(&self) -> Result<FetchedMessage, StreamError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| StreamError::ConsumeFailed(e.to_string()))?;
        Ok(FetchedMessage {
            inner: message.detach(),
        })
    }

    /// Commit a fetched message (offset + 1).
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ConsumeFailed`] when the commit fails;
    /// the message will then be redelivered, which is safe because
    /// handlers are idempotent.
    pub fn commit(&self, message: &FetchedMessage) -> Result<(), StreamError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            message.inner.topic(),
            message.inner.partition(),
            Offset::Offset(message.inner.offset() + 1),
        )
        .map_err(|e| StreamError::ConsumeFailed(e.to_string()))?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| StreamError::ConsumeFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairgate_core::{BookingId, UserId};

    #[test]
    fn producer_and_consumer_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BookingProducer>();
        assert_send_sync::<BookingConsumer>();
    }

    #[test]
    fn partition_key_is_event_id_string() {
        let event_id = EventId::new();
        assert_eq!(key_for(event_id), event_id.to_string().into_bytes());
    }

    #[test]
    fn stream_error_maps_to_transient() {
        let err: CoreError = StreamError::ConsumeFailed("broker away".into()).into();
        assert!(err.is_transient());
    }

    #[test]
    fn finalize_payload_is_documented_wire_format() {
        let msg = FinalizeMessage::finalize(
            BookingId::new(),
            EventId::new(),
            UserId::new(),
            vec!["A-1".into()],
            None,
        );
        let bytes = msg.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "finalize_booking");
    }
}
