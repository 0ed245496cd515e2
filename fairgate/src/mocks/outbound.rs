//! Mock publisher, notifier and user directory.

use crate::providers::{FinalizePublisher, Notifier, UserDirectory};
use fairgate_core::{CoreError, FinalizeMessage, Result, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory finalize publisher capturing every message.
#[derive(Debug, Clone, Default)]
pub struct MockPublisher {
    messages: Arc<Mutex<Vec<FinalizeMessage>>>,
    fail: Arc<AtomicBool>,
}

impl MockPublisher {
    /// Create an empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All published messages (for assertions).
    #[must_use]
    pub fn published(&self) -> Vec<FinalizeMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Make every publish fail with a transient error.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl FinalizePublisher for MockPublisher {
    async fn publish(&self, message: &FinalizeMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Transient("stream unavailable".to_string()));
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A captured notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Payment request with link.
    PaymentRequest {
        /// Recipient address.
        to: String,
        /// Event name.
        event_name: String,
        /// Amount due.
        amount: f64,
        /// Payment link.
        payment_link: String,
    },
    /// Cancellation notice with refund link.
    Cancellation {
        /// Recipient address.
        to: String,
        /// Fee deducted from the refund.
        cancellation_fee: f64,
        /// Refund link.
        refund_link: String,
    },
    /// Waitlist promotion notice.
    Promotion {
        /// Recipient address.
        to: String,
        /// Event name.
        event_name: String,
    },
}

/// In-memory notifier capturing every notification.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured notifications (for assertions).
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for MockNotifier {
    async fn send_payment_request(
        &self,
        to: &str,
        event_name: &str,
        amount: f64,
        payment_link: &str,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(Notification::PaymentRequest {
            to: to.to_string(),
            event_name: event_name.to_string(),
            amount,
            payment_link: payment_link.to_string(),
        });
        Ok(())
    }

    async fn send_cancellation(
        &self,
        to: &str,
        cancellation_fee: f64,
        refund_link: &str,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(Notification::Cancellation {
            to: to.to_string(),
            cancellation_fee,
            refund_link: refund_link.to_string(),
        });
        Ok(())
    }

    async fn send_waitlist_promotion(&self, to: &str, event_name: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Notification::Promotion {
            to: to.to_string(),
            event_name: event_name.to_string(),
        });
        Ok(())
    }
}

/// In-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct MockUserDirectory {
    emails: Arc<Mutex<HashMap<UserId, String>>>,
}

impl MockUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user's email.
    pub fn insert(&self, user: UserId, email: &str) {
        self.emails.lock().unwrap().insert(user, email.to_string());
    }
}

impl UserDirectory for MockUserDirectory {
    async fn email_for(&self, user: UserId) -> Result<String> {
        self.emails
            .lock()
            .unwrap()
            .get(&user)
            .cloned()
            .ok_or(CoreError::NotFound("user"))
    }
}
