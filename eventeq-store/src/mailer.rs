//! Booking emails over SMTP. Sending is detached from the caller: a slow or
//! failing mail server never holds up a request.

use async_trait::async_trait;
use eventeq_core::identity::{UserDirectory, UserProfile};
use eventeq_core::notify::NotificationSink;
use eventeq_core::BoxError;
use eventeq_shared::models::BookingEvent;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use crate::app_config::SmtpConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    users: Arc<dyn UserDirectory>,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, users: Arc<dyn UserDirectory>) -> Result<Self, MailerError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from_address: config.from_address.clone(),
            users,
        })
    }

    fn build_message(&self, to: &str, subject: String, body: String) -> Result<Message, MailerError> {
        Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailerError::Build(e.to_string()))
    }
}

/// Subject and body for the requester, or `None` for events that send no mail.
pub fn compose(event: &BookingEvent, requester: &UserProfile) -> Option<(String, String)> {
    match event {
        BookingEvent::Created {
            booking_id,
            grand_total,
            ..
        } => Some((
            "Your booking is waiting for payment".to_string(),
            format!(
                "Hi {},\n\nBooking {} has been created. Please complete the payment of RM {:.2} \
                 before the start date to confirm it.\n",
                requester.first_name, booking_id, grand_total
            ),
        )),
        BookingEvent::Paid { booking_id, .. } => Some((
            "Payment received".to_string(),
            format!(
                "Hi {},\n\nWe received your payment for booking {}. It is now confirmed.\n",
                requester.first_name, booking_id
            ),
        )),
        BookingEvent::StatusChanged { .. } => None,
    }
}

#[async_trait]
impl NotificationSink for SmtpNotifier {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn notify(&self, event: &BookingEvent) -> Result<(), BoxError> {
        if matches!(event, BookingEvent::StatusChanged { .. }) {
            return Ok(());
        }
        let Some(requester) = self.users.find_user(event.requester_id()).await? else {
            return Err(format!("no user for booking {}", event.booking_id()).into());
        };
        let Some((subject, body)) = compose(event, &requester) else {
            return Ok(());
        };

        let message = self.build_message(requester.email.expose(), subject, body)?;
        let transport = self.transport.clone();
        let booking_id = event.booking_id();
        let to = requester.email.hint();
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => tracing::info!(booking_id = %booking_id, to = %to, "Booking email sent"),
                Err(e) => tracing::warn!(booking_id = %booking_id, to = %to, "Booking email failed: {}", e),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eventeq_shared::Masked;
    use uuid::Uuid;

    fn requester() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            first_name: "Nurul".into(),
            last_name: "Huda".into(),
            email: Masked::new("nurul@example.com".into()),
            phone: None,
        }
    }

    #[test]
    fn created_email_mentions_amount() {
        let user = requester();
        let event = BookingEvent::Created {
            booking_id: Uuid::new_v4(),
            requester_id: user.id,
            owner_id: Uuid::new_v4(),
            grand_total: 132.5,
            bill_code: "abc".into(),
            at: Utc::now(),
        };
        let (subject, body) = compose(&event, &user).unwrap();
        assert!(subject.contains("payment"));
        assert!(body.contains("RM 132.50"));
        assert!(body.starts_with("Hi Nurul"));
        assert_eq!(event.requester_id(), user.id);
    }

    #[test]
    fn status_changes_send_nothing() {
        let event = BookingEvent::StatusChanged {
            booking_id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            from: "upcoming".into(),
            to: "active".into(),
            at: Utc::now(),
        };
        assert!(compose(&event, &requester()).is_none());
    }
}
