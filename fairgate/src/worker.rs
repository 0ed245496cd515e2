//! Finalize worker pool: consumes the `bookings` topic with bounded
//! concurrency.
//!
//! Per message: decode, dispatch, then commit. A malformed payload is
//! forwarded to the dead-letter topic verbatim and committed; a
//! transient handler failure leaves the message uncommitted so the
//! consumer redelivers it; any other failure dead-letters. Shutdown
//! stops fetching and waits a bounded grace for in-flight work.

use crate::metrics::FinalizeMetrics;
use crate::providers::{
    BookingLedger, EventCatalog, FinalizePublisher, InventoryCounter, Notifier, TimeoutStore,
    UserDirectory, WaitlistStore,
};
use crate::services::FinalizeService;
use fairgate_core::FinalizeMessage;
use fairgate_stream::{BookingConsumer, BookingProducer, FetchedMessage, DEAD_LETTER_TOPIC};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};

/// How long shutdown waits for in-flight messages before giving up.
const DRAIN_GRACE: Duration = Duration::from_secs(30);

/// The finalize worker pool.
pub struct FinalizeWorker<L, E, W, C, T, P, N, U>
where
    L: BookingLedger + 'static,
    E: EventCatalog + 'static,
    W: WaitlistStore + 'static,
    C: InventoryCounter + 'static,
    T: TimeoutStore + 'static,
    P: FinalizePublisher + 'static,
    N: Notifier + 'static,
    U: UserDirectory + 'static,
{
    consumer: Arc<BookingConsumer>,
    dlq: Arc<BookingProducer>,
    service: Arc<FinalizeService<L, E, W, C, T, P, N, U>>,
    max_workers: usize,
    shutdown: watch::Receiver<bool>,
}

impl<L, E, W, C, T, P, N, U> FinalizeWorker<L, E, W, C, T, P, N, U>
where
    L: BookingLedger + 'static,
    E: EventCatalog + 'static,
    W: WaitlistStore + 'static,
    C: InventoryCounter + 'static,
    T: TimeoutStore + 'static,
    P: FinalizePublisher + 'static,
    N: Notifier + 'static,
    U: UserDirectory + 'static,
{
    /// Create a worker pool.
    #[must_use]
    pub fn new(
        consumer: Arc<BookingConsumer>,
        dlq: Arc<BookingProducer>,
        service: Arc<FinalizeService<L, E, W, C, T, P, N, U>>,
        max_workers: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            consumer,
            dlq,
            service,
            max_workers: max_workers.max(1),
            shutdown,
        }
    }

    /// Run until the shutdown signal flips, then drain.
    pub async fn run(&self) {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut shutdown = self.shutdown.clone();
        tracing::info!(max_workers = self.max_workers, "finalize worker running");

        loop {
            tokio::select! {
                _ = shutdown.wait_for(|draining| *draining) => break,
                fetched = self.consumer.fetch() => {
                    let message = match fetched {
                        Ok(message) => message,
                        Err(e) => {
                            tracing::error!(error = %e, "fetch failed");
                            continue;
                        }
                    };

                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                        break;
                    };
                    let consumer = Arc::clone(&self.consumer);
                    let dlq = Arc::clone(&self.dlq);
                    let service = Arc::clone(&self.service);
                    tokio::spawn(async move {
                        Self::handle_message(&consumer, &dlq, &service, &message).await;
                        drop(permit);
                    });
                }
            }
        }

        // Stop fetching, wait for in-flight work bounded by the grace.
        tracing::info!("finalize worker draining");
        let all = u32::try_from(self.max_workers).unwrap_or(u32::MAX);
        if tokio::time::timeout(DRAIN_GRACE, semaphore.acquire_many(all))
            .await
            .is_err()
        {
            tracing::warn!("drain grace elapsed with messages still in flight");
        }
        tracing::info!("finalize worker stopped");
    }

    async fn handle_message(
        consumer: &BookingConsumer,
        dlq: &BookingProducer,
        service: &Arc<FinalizeService<L, E, W, C, T, P, N, U>>,
        message: &FetchedMessage,
    ) {
        let started = Instant::now();

        let decoded = match FinalizeMessage::from_bytes(message.payload()) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::error!(
                    topic = message.topic(),
                    offset = message.offset(),
                    error = %e,
                    "malformed finalize message"
                );
                Self::dead_letter(consumer, dlq, message).await;
                return;
            }
        };

        match service.dispatch(decoded).await {
            Ok(()) => {
                if let Err(e) = consumer.commit(message) {
                    // Redelivery of a handled message is safe: every
                    // handler is idempotent.
                    tracing::warn!(error = %e, "commit failed, message will redeliver");
                }
                FinalizeMetrics::record_handled(started.elapsed());
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    offset = message.offset(),
                    error = %e,
                    "transient failure, leaving message for redelivery"
                );
            }
            Err(e) => {
                tracing::error!(offset = message.offset(), error = %e, "terminal failure");
                Self::dead_letter(consumer, dlq, message).await;
            }
        }
    }

    /// Forward a message to the dead-letter topic verbatim, then
    /// commit it. When the forward itself fails the commit is skipped,
    /// so the message redelivers rather than vanishing.
    async fn dead_letter(consumer: &BookingConsumer, dlq: &BookingProducer, message: &FetchedMessage) {
        match dlq
            .publish_raw(DEAD_LETTER_TOPIC, message.key(), message.payload())
            .await
        {
            Ok(()) => {
                FinalizeMetrics::record_dead_letter();
                if let Err(e) = consumer.commit(message) {
                    tracing::warn!(error = %e, "commit after dead-letter failed");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "dead-letter publish failed, message will redeliver");
            }
        }
    }
}
