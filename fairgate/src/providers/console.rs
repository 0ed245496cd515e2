//! Console notifier for development.
//!
//! Logs every notification instead of sending it, so the full booking
//! flow can run locally without an SMTP relay.

use crate::providers::Notifier;
use fairgate_core::Result;

/// Development notifier that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    async fn send_payment_request(
        &self,
        to: &str,
        event_name: &str,
        amount: f64,
        payment_link: &str,
    ) -> Result<()> {
        tracing::info!(to, event_name, amount, payment_link, "MAIL payment request");
        Ok(())
    }

    async fn send_cancellation(
        &self,
        to: &str,
        cancellation_fee: f64,
        refund_link: &str,
    ) -> Result<()> {
        tracing::info!(to, cancellation_fee, refund_link, "MAIL cancellation");
        Ok(())
    }

    async fn send_waitlist_promotion(&self, to: &str, event_name: &str) -> Result<()> {
        tracing::info!(to, event_name, "MAIL waitlist promotion");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn console_notifier_always_succeeds() {
        let notifier = ConsoleNotifier::new();
        assert!(notifier
            .send_payment_request("fan@example.com", "Show", 50.0, "http://pay")
            .await
            .is_ok());
        assert!(notifier.send_cancellation("fan@example.com", 5.0, "http://refund").await.is_ok());
        assert!(notifier
            .send_waitlist_promotion("fan@example.com", "Show")
            .await
            .is_ok());
    }
}
