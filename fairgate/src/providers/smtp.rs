//! SMTP notifier using Lettre.

use crate::providers::Notifier;
use fairgate_core::{CoreError, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// SMTP notifier, suitable for production use.
///
/// A fresh transport is built per send to avoid connection pooling
/// issues with relays that drop idle connections.
#[derive(Clone)]
pub struct SmtpNotifier {
    smtp_host: String,
    smtp_port: u16,
    credentials: Credentials,
    from: String,
}

impl SmtpNotifier {
    /// Create a new SMTP notifier.
    #[must_use]
    pub fn new(
        smtp_host: String,
        smtp_port: u16,
        smtp_user: String,
        smtp_pass: String,
        from: String,
    ) -> Self {
        Self {
            smtp_host,
            smtp_port,
            credentials: Credentials::new(smtp_user, smtp_pass),
            from,
        }
    }

    fn build_transport(&self) -> Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.smtp_host)
            .map_err(|e| CoreError::Transient(format!("smtp relay: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| CoreError::Validation(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| CoreError::Validation(format!("invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| CoreError::Transient(format!("build email: {e}")))?;

        let mailer = self.build_transport()?;

        // Lettre's SmtpTransport is blocking; keep it off the runtime.
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map(|_| ())
                .map_err(|e| CoreError::Transient(format!("send email: {e}")))
        })
        .await
        .map_err(|e| CoreError::Transient(format!("email task: {e}")))?
    }
}

impl Notifier for SmtpNotifier {
    async fn send_payment_request(
        &self,
        to: &str,
        event_name: &str,
        amount: f64,
        payment_link: &str,
    ) -> Result<()> {
        let body = format!(
            "Your seats for {event_name} are held.\n\n\
             Complete your payment of {amount:.2} within the grace period or the \
             reservation will be released:\n\n{payment_link}\n"
        );
        self.send(to, &format!("Payment required for {event_name}"), body)
            .await
    }

    async fn send_cancellation(
        &self,
        to: &str,
        cancellation_fee: f64,
        refund_link: &str,
    ) -> Result<()> {
        let body = format!(
            "Your booking was cancelled.\n\n\
             A cancellation fee of {cancellation_fee:.2} applies. Claim your refund here:\n\n\
             {refund_link}\n"
        );
        self.send(to, "Booking cancelled", body).await
    }

    async fn send_waitlist_promotion(&self, to: &str, event_name: &str) -> Result<()> {
        let body = format!(
            "A spot opened up for {event_name} and it is yours.\n\n\
             A payment request follows in a separate email; complete it within the \
             grace period to keep the seats.\n"
        );
        self.send(to, &format!("You're off the waitlist for {event_name}"), body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpNotifier>();
    }

    #[tokio::test]
    async fn rejects_invalid_recipient() {
        let notifier = SmtpNotifier::new(
            "localhost".into(),
            2525,
            String::new(),
            String::new(),
            "noreply@fairgate.local".into(),
        );
        let err = notifier
            .send_waitlist_promotion("not an address", "Show")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
