//! End-to-end scenarios for the booking coordination core, run against
//! the in-memory providers.

use std::sync::Arc;
use std::time::Duration;

use fairgate::mocks::{
    MockCounter, MockEventCatalog, MockLedger, MockNotifier, MockPublisher, MockTimeoutStore,
    MockUserDirectory, MockWaitlist, Notification,
};
use fairgate::providers::{InventoryCounter, WaitlistStore};
use fairgate::services::{
    BookingCoordinator, BookingOutcome, FinalizeService, PaymentService, Reconciler,
};
use fairgate::Providers;
use fairgate_core::{
    BookingStatus, CapacityRecord, CoreError, Event, EventId, FinalizeMessage, MessageKind,
    PaymentStatus, SeatStatus, UserId,
};
use tokio::sync::watch;

type TestProviders = Providers<
    MockLedger,
    MockEventCatalog,
    MockWaitlist,
    MockCounter,
    MockTimeoutStore,
    MockPublisher,
    MockNotifier,
    MockUserDirectory,
>;

const GRACE: Duration = Duration::from_secs(900);
const PAYMENT_URL: &str = "http://localhost:8080";

struct Harness {
    ledger: MockLedger,
    events: MockEventCatalog,
    waitlist: MockWaitlist,
    counter: MockCounter,
    timeouts: MockTimeoutStore,
    publisher: MockPublisher,
    notifier: MockNotifier,
    users: MockUserDirectory,
    providers: Arc<TestProviders>,
}

impl Harness {
    fn new() -> Self {
        let ledger = MockLedger::new();
        let events = MockEventCatalog::new();
        let waitlist = MockWaitlist::new();
        let counter = MockCounter::new();
        let timeouts = MockTimeoutStore::new();
        let publisher = MockPublisher::new();
        let notifier = MockNotifier::new();
        let users = MockUserDirectory::new();

        let providers = Arc::new(Providers::new(
            ledger.clone(),
            events.clone(),
            waitlist.clone(),
            counter.clone(),
            timeouts.clone(),
            publisher.clone(),
            notifier.clone(),
            users.clone(),
        ));

        Self {
            ledger,
            events,
            waitlist,
            counter,
            timeouts,
            publisher,
            notifier,
            users,
            providers,
        }
    }

    /// Seed an event with its seats and a matching counter.
    async fn seed_event(&self, capacity: i32, price: f64, seats: &[&str]) -> Event {
        let event = self.events.seed_event(capacity, price);
        self.ledger.seed_seats(event.id, seats);
        self.counter
            .initialize(event.id, i64::from(capacity))
            .await
            .unwrap();
        event
    }

    fn user(&self, email: &str) -> UserId {
        let user = UserId::new();
        self.users.insert(user, email);
        user
    }

    fn coordinator(
        &self,
    ) -> BookingCoordinator<
        MockLedger,
        MockEventCatalog,
        MockWaitlist,
        MockCounter,
        MockTimeoutStore,
        MockPublisher,
        MockNotifier,
        MockUserDirectory,
    > {
        BookingCoordinator::new(Arc::clone(&self.providers), PAYMENT_URL.to_string(), GRACE)
    }

    fn payment(
        &self,
    ) -> PaymentService<
        MockLedger,
        MockEventCatalog,
        MockWaitlist,
        MockCounter,
        MockTimeoutStore,
        MockPublisher,
        MockNotifier,
        MockUserDirectory,
    > {
        PaymentService::new(Arc::clone(&self.providers))
    }

    fn finalizer(
        &self,
        grace: Duration,
    ) -> (
        Arc<
            FinalizeService<
                MockLedger,
                MockEventCatalog,
                MockWaitlist,
                MockCounter,
                MockTimeoutStore,
                MockPublisher,
                MockNotifier,
                MockUserDirectory,
            >,
        >,
        watch::Sender<bool>,
    ) {
        let (tx, rx) = watch::channel(false);
        let service = Arc::new(FinalizeService::new(
            Arc::clone(&self.providers),
            PAYMENT_URL.to_string(),
            grace,
            rx,
        ));
        (service, tx)
    }

    async fn remaining(&self, event: EventId) -> i64 {
        self.counter.remaining(event).await.unwrap()
    }
}

fn seats(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| (*s).to_string()).collect()
}

fn expect_pending(outcome: BookingOutcome) -> fairgate_core::Booking {
    match outcome {
        BookingOutcome::Pending(booking) => booking,
        other => panic!("expected pending booking, got {other:?}"),
    }
}

// ── Scenario 1: single admission ───────────────────────────────────

#[tokio::test]
async fn single_admission_to_booked() {
    let h = Harness::new();
    let event = h.seed_event(1, 50.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");

    let outcome = h
        .coordinator()
        .create_booking(event.id, u1, None, seats(&["s1"]))
        .await
        .unwrap();
    let booking = expect_pending(outcome);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(h.remaining(event.id).await, 0);

    // The finalize message went out, keyed for the event.
    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].kind, MessageKind::FinalizeBooking);
    assert_eq!(published[0].event_id, event.id);

    // Payment callback with the correct amount completes the booking.
    let paid = h
        .payment()
        .process_payment(booking.id, 50.0, "pay-1")
        .await
        .unwrap();
    assert_eq!(paid.status, BookingStatus::Booked);
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(
        h.ledger.seat_state(event.id, "s1").unwrap().0,
        SeatStatus::Booked
    );
    assert_eq!(h.remaining(event.id).await, 0);
}

// ── Scenario 2: oversell guard ─────────────────────────────────────

#[tokio::test]
async fn concurrent_bookings_never_oversell() {
    let h = Harness::new();
    let event = h.seed_event(1, 25.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");
    let u2 = h.user("u2@example.com");

    let coordinator = Arc::new(h.coordinator());
    let (a, b) = tokio::join!(
        coordinator.create_booking(event.id, u1, None, seats(&["s1"])),
        coordinator.create_booking(event.id, u2, None, seats(&["s1"])),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let pending = [&a, &b]
        .iter()
        .filter(|o| matches!(o, BookingOutcome::Pending(_)))
        .count();
    let waitlisted: Vec<i32> = [&a, &b]
        .iter()
        .filter_map(|o| match o {
            BookingOutcome::Waitlisted { position } => Some(*position),
            _ => None,
        })
        .collect();

    assert_eq!(pending, 1, "exactly one caller is admitted");
    assert_eq!(waitlisted, vec![1], "the other is first in line");
    assert_eq!(h.remaining(event.id).await, 0);
    assert_eq!(
        h.ledger
            .bookings_with_status(event.id, BookingStatus::Pending)
            .len(),
        1
    );
}

// ── Scenario 3: timeout promotion ──────────────────────────────────

#[tokio::test]
async fn timeout_cancels_unpaid_and_promotes_waitlist() {
    let h = Harness::new();
    let event = h.seed_event(1, 40.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");
    let u2 = h.user("u2@example.com");

    let coordinator = h.coordinator();
    let first = expect_pending(
        coordinator
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );
    assert!(matches!(
        coordinator
            .create_booking(event.id, u2, None, seats(&["s1"]))
            .await
            .unwrap(),
        BookingOutcome::Waitlisted { position: 1 }
    ));

    // Grace elapsed without payment: the timeout path fires.
    let (finalizer, _shutdown) = h.finalizer(GRACE);
    finalizer
        .dispatch(FinalizeMessage::timeout(
            first.id,
            event.id,
            u1,
            seats(&["s1"]),
        ))
        .await
        .unwrap();

    assert_eq!(
        h.ledger.booking(first.id).unwrap().status,
        BookingStatus::Cancelled
    );

    // U2 inherited the freed seat as a fresh pending booking.
    let promoted = h
        .ledger
        .bookings_with_status(event.id, BookingStatus::Pending);
    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].user_id, u2);
    assert_eq!(promoted[0].seats, seats(&["s1"]));

    // The promotion notice went to the promoted user, and a finalize
    // message for the new booking is on the stream.
    assert!(h.notifier.sent().iter().any(|n| matches!(
        n,
        Notification::Promotion { to, .. } if to == "u2@example.com"
    )));
    assert!(h
        .publisher
        .published()
        .iter()
        .any(|m| m.booking_id == promoted[0].id && m.kind == MessageKind::FinalizeBooking));

    // The queue entry was consumed.
    assert!(h.waitlist.entries().is_empty());
}

#[tokio::test]
async fn timeout_is_noop_once_paid() {
    let h = Harness::new();
    let event = h.seed_event(1, 40.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");

    let booking = expect_pending(
        h.coordinator()
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );
    h.payment()
        .process_payment(booking.id, 40.0, "pay-1")
        .await
        .unwrap();

    let (finalizer, _shutdown) = h.finalizer(GRACE);
    finalizer
        .dispatch(FinalizeMessage::timeout(
            booking.id,
            event.id,
            u1,
            seats(&["s1"]),
        ))
        .await
        .unwrap();

    assert_eq!(
        h.ledger.booking(booking.id).unwrap().status,
        BookingStatus::Booked
    );
}

// ── Armed watchdog (scheduled timeout task) ────────────────────────

#[tokio::test(start_paused = true)]
async fn armed_watchdog_cancels_unpaid_booking() {
    let h = Harness::new();
    let event = h.seed_event(1, 40.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");

    let booking = expect_pending(
        h.coordinator()
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );

    let grace = Duration::from_secs(60);
    let (finalizer, _shutdown) = h.finalizer(grace);
    finalizer
        .dispatch(FinalizeMessage::finalize(
            booking.id,
            event.id,
            u1,
            seats(&["s1"]),
            None,
        ))
        .await
        .unwrap();

    // Let the spawned watchdog task reach its sleep.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    // Payment request went out and the timeout record is armed.
    assert!(h
        .notifier
        .sent()
        .iter()
        .any(|n| matches!(n, Notification::PaymentRequest { to, .. } if to == "u1@example.com")));
    assert!(h.timeouts.contains(event.id, booking.id));

    // Let the (virtual) grace window elapse; the watchdog fires.
    tokio::time::sleep(grace + Duration::from_secs(1)).await;
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        h.ledger.booking(booking.id).unwrap().status,
        BookingStatus::Cancelled
    );
    assert!(!h.timeouts.contains(event.id, booking.id));
    assert_eq!(h.remaining(event.id).await, 1, "admission tokens restored");
}

#[tokio::test(start_paused = true)]
async fn armed_watchdog_stands_down_after_payment() {
    let h = Harness::new();
    let event = h.seed_event(1, 40.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");

    let booking = expect_pending(
        h.coordinator()
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );

    let grace = Duration::from_secs(60);
    let (finalizer, _shutdown) = h.finalizer(grace);
    finalizer
        .dispatch(FinalizeMessage::finalize(
            booking.id,
            event.id,
            u1,
            seats(&["s1"]),
            None,
        ))
        .await
        .unwrap();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    // Payment lands inside the grace window.
    h.payment()
        .process_payment(booking.id, 40.0, "pay-1")
        .await
        .unwrap();

    tokio::time::sleep(grace + Duration::from_secs(1)).await;
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        h.ledger.booking(booking.id).unwrap().status,
        BookingStatus::Booked
    );
    assert!(!h.timeouts.contains(event.id, booking.id), "record cleaned up");
}

// ── Scenario 4: idempotent replay ──────────────────────────────────

#[tokio::test]
async fn idempotent_replay_decrements_counter_once() {
    let h = Harness::new();
    let event = h.seed_event(5, 30.0, &["s1", "s2", "s3", "s4", "s5"]).await;
    let u1 = h.user("u1@example.com");

    let coordinator = h.coordinator();
    let first = expect_pending(
        coordinator
            .create_booking(event.id, u1, Some("abc".to_string()), seats(&["s1"]))
            .await
            .unwrap(),
    );
    assert_eq!(h.remaining(event.id).await, 4);

    let replay = coordinator
        .create_booking(event.id, u1, Some("abc".to_string()), seats(&["s1"]))
        .await
        .unwrap();
    match replay {
        BookingOutcome::Replayed(booking) => {
            assert_eq!(booking.id, first.id);
            assert_eq!(booking.status, BookingStatus::Pending);
        }
        other => panic!("expected replay, got {other:?}"),
    }

    assert_eq!(h.remaining(event.id).await, 4, "counter decremented once");
    assert_eq!(h.publisher.published().len(), 1, "one finalize message");
}

// ── Scenario 5: reconcile drift ────────────────────────────────────

#[tokio::test]
async fn reconciler_repairs_counter_drift() {
    let h = Harness::new();
    let event = h.events.seed_event(10, 20.0);
    h.events.set_capacity_record(CapacityRecord {
        event_id: event.id,
        capacity: 10,
        reserved_count: 3,
        held_count: 0,
    });
    h.counter.set(event.id, 5); // true remaining is 7

    let reconciler = Reconciler::new(h.events.clone(), h.counter.clone());
    let summary = reconciler.run().await.unwrap();

    assert_eq!(h.remaining(event.id).await, 7);
    assert_eq!(summary.fixes, 1);

    // Idempotent: a second run changes nothing.
    let summary = reconciler.run().await.unwrap();
    assert_eq!(summary.fixes, 0);
    assert_eq!(h.remaining(event.id).await, 7);
}

#[tokio::test]
async fn reconciler_consumes_surplus_tokens() {
    let h = Harness::new();
    let event = h.events.seed_event(10, 20.0);
    h.events.set_capacity_record(CapacityRecord {
        event_id: event.id,
        capacity: 10,
        reserved_count: 4,
        held_count: 0,
    });
    h.counter.set(event.id, 9); // true remaining is 6

    Reconciler::new(h.events.clone(), h.counter.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(h.remaining(event.id).await, 6);
}

// ── Scenario 6: cancel-after-book promotion ────────────────────────

#[tokio::test]
async fn cancel_of_booked_booking_promotes_waitlist() {
    let h = Harness::new();
    let event = h.seed_event(2, 35.0, &["s1", "s2"]).await;
    let u1 = h.user("u1@example.com");
    let u2 = h.user("u2@example.com");
    let u3 = h.user("u3@example.com");

    let coordinator = h.coordinator();
    let payment = h.payment();

    let b1 = expect_pending(
        coordinator
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );
    payment.process_payment(b1.id, 35.0, "pay-1").await.unwrap();
    let b2 = expect_pending(
        coordinator
            .create_booking(event.id, u2, None, seats(&["s2"]))
            .await
            .unwrap(),
    );
    payment.process_payment(b2.id, 35.0, "pay-2").await.unwrap();

    assert!(matches!(
        coordinator
            .create_booking(event.id, u3, None, seats(&["s1"]))
            .await
            .unwrap(),
        BookingOutcome::Waitlisted { position: 1 }
    ));
    assert_eq!(h.remaining(event.id).await, 0);

    let cancelled = coordinator.cancel(b1.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(h.remaining(event.id).await, 1, "tokens released");

    // U3 got a pending booking over U1's freed seats, and the seat is
    // held for it.
    let promoted = h
        .ledger
        .bookings_with_status(event.id, BookingStatus::Pending);
    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].user_id, u3);
    assert_eq!(promoted[0].seats, seats(&["s1"]));
    let (status, holder) = h.ledger.seat_state(event.id, "s1").unwrap();
    assert_eq!(status, SeatStatus::Held);
    assert_eq!(holder, Some(promoted[0].id));

    // U1 got the cancellation notice with the refund link; U3 got the
    // promotion notice.
    let sent = h.notifier.sent();
    assert!(sent.iter().any(|n| matches!(
        n,
        Notification::Cancellation { to, refund_link, .. }
            if to == "u1@example.com" && refund_link.contains(&b1.id.to_string())
    )));
    assert!(sent.iter().any(|n| matches!(
        n,
        Notification::Promotion { to, .. } if to == "u3@example.com"
    )));
}

// ── Cancellation round-trip law ────────────────────────────────────

#[tokio::test]
async fn create_finalize_cancel_restores_inventory() {
    let h = Harness::new();
    let event = h.seed_event(3, 10.0, &["a", "b", "c"]).await;
    let u1 = h.user("u1@example.com");

    let booking = expect_pending(
        h.coordinator()
            .create_booking(event.id, u1, None, seats(&["a", "b"]))
            .await
            .unwrap(),
    );
    h.payment()
        .process_payment(booking.id, 20.0, "pay-1")
        .await
        .unwrap();
    h.coordinator().cancel(booking.id).await.unwrap();

    assert_eq!(h.remaining(event.id).await, 3);
    for label in ["a", "b", "c"] {
        assert_eq!(
            h.ledger.seat_state(event.id, label).unwrap(),
            (SeatStatus::Available, None)
        );
    }
}

// ── Coordinator edge cases ─────────────────────────────────────────

#[tokio::test]
async fn booking_unknown_event_is_not_found() {
    let h = Harness::new();
    let u1 = h.user("u1@example.com");
    let err = h
        .coordinator()
        .create_booking(EventId::new(), u1, None, seats(&["s1"]))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::NotFound("event"));
}

#[tokio::test]
async fn booking_ended_event_expires_it() {
    let h = Harness::new();
    let mut event = h.events.seed_event(5, 10.0);
    event.end_time = chrono::Utc::now() - chrono::Duration::hours(1);
    h.events.insert(event.clone());
    let u1 = h.user("u1@example.com");

    let err = h
        .coordinator()
        .create_booking(event.id, u1, None, seats(&["s1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(
        h.events.status_of(event.id),
        Some(fairgate_core::EventStatus::Expired)
    );
}

#[tokio::test]
async fn booking_rejects_bad_seat_counts() {
    let h = Harness::new();
    let event = h.seed_event(10, 10.0, &["a", "b", "c", "d", "e"]).await;
    let u1 = h.user("u1@example.com");
    let coordinator = h.coordinator();

    assert!(matches!(
        coordinator
            .create_booking(event.id, u1, None, vec![])
            .await
            .unwrap_err(),
        CoreError::Validation(_)
    ));
    // max_tickets_per_booking defaults to 4 in the harness.
    assert!(matches!(
        coordinator
            .create_booking(event.id, u1, None, seats(&["a", "b", "c", "d", "e"]))
            .await
            .unwrap_err(),
        CoreError::Validation(_)
    ));
}

#[tokio::test]
async fn publish_failure_still_returns_pending() {
    let h = Harness::new();
    let event = h.seed_event(1, 10.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");
    h.publisher.fail_publishes(true);

    let outcome = h
        .coordinator()
        .create_booking(event.id, u1, None, seats(&["s1"]))
        .await
        .unwrap();
    // The ledger write is the point of durability; a lost message is
    // bounded by the timeout path.
    let booking = expect_pending(outcome);
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[tokio::test]
async fn ledger_failure_after_admission_releases_tokens() {
    let h = Harness::new();
    let event = h.seed_event(2, 10.0, &["s1", "s2"]).await;
    let u1 = h.user("u1@example.com");
    h.ledger.fail_next_create();

    let err = h
        .coordinator()
        .create_booking(event.id, u1, None, seats(&["s1"]))
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(h.remaining(event.id).await, 2, "admission undone");
}

#[tokio::test]
async fn seat_conflict_surfaces_and_restores_counter() {
    let h = Harness::new();
    let event = h.seed_event(2, 10.0, &["s1", "s2"]).await;
    let u1 = h.user("u1@example.com");
    let u2 = h.user("u2@example.com");
    let coordinator = h.coordinator();

    expect_pending(
        coordinator
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );
    // Same label again: admitted by the counter but refused by the
    // seat hold, so the tokens flow back.
    let err = coordinator
        .create_booking(event.id, u2, None, seats(&["s1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    assert_eq!(h.remaining(event.id).await, 1);
}

// ── Payment edge cases ─────────────────────────────────────────────

#[tokio::test]
async fn payment_below_expected_amount_is_rejected() {
    let h = Harness::new();
    let event = h.seed_event(1, 50.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");

    let booking = expect_pending(
        h.coordinator()
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );

    let err = h
        .payment()
        .process_payment(booking.id, 49.0, "pay-1")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(
        h.ledger.booking(booking.id).unwrap().status,
        BookingStatus::Pending
    );
}

#[tokio::test]
async fn double_payment_is_a_conflict() {
    let h = Harness::new();
    let event = h.seed_event(1, 50.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");

    let booking = expect_pending(
        h.coordinator()
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );
    let payment = h.payment();
    payment
        .process_payment(booking.id, 50.0, "pay-1")
        .await
        .unwrap();
    let err = payment
        .process_payment(booking.id, 50.0, "pay-2")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn refund_deducts_cancellation_fee_with_zero_floor() {
    let h = Harness::new();
    // Harness events carry a 5.0 cancellation fee.
    let event = h.seed_event(1, 50.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");

    let booking = expect_pending(
        h.coordinator()
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );
    let payment = h.payment();
    payment
        .process_payment(booking.id, 50.0, "pay-1")
        .await
        .unwrap();

    let refunded = payment.process_refund(booking.id).await.unwrap();
    assert!((refunded - 45.0).abs() < f64::EPSILON);
    assert_eq!(
        h.ledger.booking(booking.id).unwrap().payment_status,
        PaymentStatus::Refunded
    );
}

#[tokio::test]
async fn refund_of_unpaid_booking_is_a_conflict() {
    let h = Harness::new();
    let event = h.seed_event(1, 50.0, &["s1"]).await;
    let u1 = h.user("u1@example.com");

    let booking = expect_pending(
        h.coordinator()
            .create_booking(event.id, u1, None, seats(&["s1"]))
            .await
            .unwrap(),
    );
    let err = h.payment().process_refund(booking.id).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

// ── Waitlist fairness ──────────────────────────────────────────────

#[tokio::test]
async fn waitlist_positions_grow_and_skip_opt_outs() {
    let h = Harness::new();
    let event = h.seed_event(0, 10.0, &[]).await;
    let (u1, u2, u3) = (
        h.user("u1@example.com"),
        h.user("u2@example.com"),
        h.user("u3@example.com"),
    );

    assert_eq!(h.waitlist.add(event.id, u1).await.unwrap(), 1);
    assert_eq!(h.waitlist.add(event.id, u2).await.unwrap(), 2);
    assert_eq!(h.waitlist.add(event.id, u3).await.unwrap(), 3);

    h.waitlist.opt_out(event.id, u1).await.unwrap();

    // Promotion selects the smallest active position; holes from
    // opt-outs are skipped, not recompacted.
    let next = h.waitlist.next_active(event.id).await.unwrap().unwrap();
    assert_eq!(next.user_id, u2);
    assert_eq!(next.position, 2);
    assert_eq!(h.waitlist.count(event.id).await.unwrap(), 2);
}
