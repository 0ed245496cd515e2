//! Reconciler (C8): repairs drift between the fast counter and the
//! durable ledger.
//!
//! Periodic and idempotent. The reconciler tolerates concurrent
//! admissions: a single-step adjustment per event is enough because
//! subsequent runs converge.

use crate::metrics::ReconcileMetrics;
use crate::providers::{EventCatalog, InventoryCounter};
use chrono::Utc;
use fairgate_core::Result;

/// What one reconciliation run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// `event_capacity` rows created for events that lacked one.
    pub seeded: u64,
    /// Events whose counter was adjusted.
    pub fixes: u64,
    /// Events swept to `expired`.
    pub expired: u64,
}

/// The reconciler.
pub struct Reconciler<E, C>
where
    E: EventCatalog,
    C: InventoryCounter,
{
    events: E,
    counter: C,
}

impl<E, C> Reconciler<E, C>
where
    E: EventCatalog,
    C: InventoryCounter,
{
    /// Create a reconciler.
    #[must_use]
    pub fn new(events: E, counter: C) -> Self {
        Self { events, counter }
    }

    /// Run one reconciliation pass.
    ///
    /// For every persisted (capacity, reserved) pair: compute
    /// `desired = capacity − reserved`, read the live counter and
    /// adjust it by the difference. An unknown counter reads as zero,
    /// so a fresh event gets seeded by the same adjustment. Finishes
    /// with the expiry sweep over ended events.
    ///
    /// # Errors
    ///
    /// `Transient` on database or counter failure; rerunning converges.
    pub async fn run(&self) -> Result<ReconcileSummary> {
        ReconcileMetrics::record_run();
        let mut summary = ReconcileSummary {
            seeded: self.events.seed_missing_capacity().await?,
            ..ReconcileSummary::default()
        };

        for record in self.events.capacity_records().await? {
            let desired = i64::from(record.desired_remaining());
            let observed = self.counter.remaining(record.event_id).await?;
            if observed == desired {
                continue;
            }

            let diff = desired - observed;
            if diff > 0 {
                self.counter.release(record.event_id, diff).await?;
            } else {
                // Consume the surplus one token at a time; a refusal
                // means concurrent admissions got there first, which a
                // later run will see.
                for _ in 0..-diff {
                    if !self.counter.reserve(record.event_id, 1).await? {
                        break;
                    }
                }
            }

            ReconcileMetrics::record_fix();
            summary.fixes += 1;
            tracing::info!(
                event_id = %record.event_id,
                desired,
                observed,
                "counter reconciled"
            );
        }

        summary.expired = self.events.expire_ended(Utc::now()).await?;
        if summary.expired > 0 {
            tracing::info!(count = summary.expired, "ended events marked expired");
        }

        tracing::info!(
            seeded = summary.seeded,
            fixes = summary.fixes,
            expired = summary.expired,
            "reconciliation complete"
        );
        Ok(summary)
    }
}
