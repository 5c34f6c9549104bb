use std::sync::Arc;
use tokio::task::JoinHandle;
use tourline_core::notify::{MailError, Mailer};
use tourline_core::reservation::{PaymentStatus, Reservation};
use tourline_shared::pii::mask_email;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Cannot render confirmation: {0}")]
    Template(String),
    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub company_name: String,
    /// Operator copy of every confirmation, if set.
    pub admin_email: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            company_name: "Tourline".to_string(),
            admin_email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html_body: String,
}

/// Sends booking confirmations after a successful payment.
///
/// Work runs on a detached task. Failures show up only in logs and never
/// reach the payment flow that triggered them.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    config: NotificationConfig,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, config: NotificationConfig) -> Self {
        Self { mailer, config }
    }

    /// Fire and forget. The handle is only useful to tests that want to wait
    /// for delivery.
    pub fn dispatch(&self, reservation: Reservation) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.notify(&reservation).await {
                Ok(()) => info!("Confirmation sent for reservation {}", reservation.id),
                Err(NotificationError::Template(e)) => {
                    warn!("Confirmation for reservation {} not rendered: {}", reservation.id, e)
                }
                Err(e) => error!("Confirmation for reservation {} failed: {}", reservation.id, e),
            }
        })
    }

    pub async fn notify(&self, reservation: &Reservation) -> Result<(), NotificationError> {
        let email = self.render_confirmation(reservation)?;
        let to = reservation.customer.email.expose();

        self.mailer.send(to, &email.subject, &email.html_body).await?;
        info!("Booking confirmation mailed to {}", mask_email(to));

        if let Some(admin) = &self.config.admin_email {
            let subject = format!("[copy] {}", email.subject);
            if let Err(e) = self.mailer.send(admin, &subject, &email.html_body).await {
                warn!("Operator copy for reservation {} failed: {}", reservation.id, e);
            }
        }

        Ok(())
    }

    pub fn render_confirmation(&self, reservation: &Reservation) -> Result<RenderedEmail, NotificationError> {
        if reservation.payment_status != PaymentStatus::Paid {
            return Err(NotificationError::Template(format!(
                "reservation is {}, not PAID",
                reservation.payment_status
            )));
        }
        if reservation.customer.email.expose().trim().is_empty() {
            return Err(NotificationError::Template("no recipient address".to_string()));
        }

        let short_id = reservation.id.simple().to_string();
        let short_id = &short_id[..8];
        let subject = format!(
            "{} booking confirmation #{}",
            self.config.company_name,
            short_id.to_uppercase()
        );

        let service = reservation
            .reservation_type
            .map(|t| t.as_str())
            .unwrap_or("booking");

        let mut passenger_rows = String::new();
        for p in &reservation.additional_passengers {
            passenger_rows.push_str(&format!(
                "<li>{} {}</li>",
                escape_html(&p.first_name),
                escape_html(&p.last_name)
            ));
        }

        let mut add_on_rows = String::new();
        for a in &reservation.add_ons {
            add_on_rows.push_str(&format!(
                "<tr><td>{} &times; {}</td><td style=\"text-align: right;\">{}</td></tr>",
                escape_html(&a.name),
                a.quantity,
                a.line_total
            ));
        }

        let html_body = format!(
            r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{subject}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Thank you, {name}!</h2>
        <p>Your {service} is confirmed and paid.</p>
        <table style="width: 100%; border-collapse: collapse;">
            <tr><td>Reference</td><td style="text-align: right;">{reference}</td></tr>
            <tr><td>Pickup</td><td style="text-align: right;">{pickup}</td></tr>
            <tr><td>Drop-off</td><td style="text-align: right;">{dropoff}</td></tr>
            <tr><td>Date</td><td style="text-align: right;">{pickup_at}</td></tr>
            <tr><td>Passengers</td><td style="text-align: right;">{passengers}</td></tr>
            {add_on_rows}
            <tr><td><strong>Total paid</strong></td><td style="text-align: right;"><strong>{total}</strong></td></tr>
        </table>
        <ul>{passenger_rows}</ul>
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            Keep this email as proof of your reservation.
        </p>
    </div>
</body>
</html>
            "#,
            subject = escape_html(&subject),
            name = escape_html(&reservation.customer.full_name),
            service = service,
            reference = short_id.to_uppercase(),
            pickup = escape_html(&reservation.pickup_location),
            dropoff = escape_html(&reservation.dropoff_location),
            pickup_at = reservation.pickup_at.format("%Y-%m-%d %H:%M UTC"),
            passengers = reservation.passengers,
            add_on_rows = add_on_rows,
            total = reservation.total_price,
            passenger_rows = passenger_rows,
        );

        Ok(RenderedEmail { subject, html_body })
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;
    use tourline_core::reservation::{CustomerContact, ReservationType};
    use tourline_shared::{Masked, Money};
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), MailError> {
            self.sent.lock().await.push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    struct BrokenMailer;

    #[async_trait]
    impl Mailer for BrokenMailer {
        async fn send(&self, _to: &str, _subject: &str, _html_body: &str) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".to_string()))
        }
    }

    fn paid_reservation() -> Reservation {
        let mut r = Reservation::new(
            CustomerContact {
                full_name: "Jane <b>Doe</b>".to_string(),
                email: Masked("jane@example.com".to_string()),
                phone: None,
            },
            Some(Uuid::new_v4()),
            None,
            Some(ReservationType::Transfer),
            "Airport".to_string(),
            "Old Town".to_string(),
            Utc::now(),
            1,
            Money::new(10000, "EUR"),
        );
        r.payment_status = PaymentStatus::Paid;
        r
    }

    #[test]
    fn test_render_escapes_customer_input() {
        let dispatcher = NotificationDispatcher::new(Arc::new(BrokenMailer), NotificationConfig::default());
        let email = dispatcher.render_confirmation(&paid_reservation()).unwrap();
        assert!(email.html_body.contains("Jane &lt;b&gt;Doe&lt;/b&gt;"));
        assert!(email.html_body.contains("100.00 EUR"));
        assert!(email.subject.starts_with("Tourline booking confirmation #"));
    }

    #[test]
    fn test_render_refuses_unpaid_reservation() {
        let dispatcher = NotificationDispatcher::new(Arc::new(BrokenMailer), NotificationConfig::default());
        let mut r = paid_reservation();
        r.payment_status = PaymentStatus::Pending;
        assert!(matches!(
            dispatcher.render_confirmation(&r),
            Err(NotificationError::Template(_))
        ));
    }

    #[tokio::test]
    async fn test_sends_customer_and_operator_copy() {
        let mailer = Arc::new(RecordingMailer::default());
        let dispatcher = NotificationDispatcher::new(
            mailer.clone(),
            NotificationConfig {
                admin_email: Some("ops@tourline.example".to_string()),
                ..NotificationConfig::default()
            },
        );

        dispatcher.dispatch(paid_reservation()).await.unwrap();

        let sent = mailer.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "jane@example.com");
        assert_eq!(sent[1].0, "ops@tourline.example");
        assert!(sent[1].1.starts_with("[copy]"));
    }

    #[tokio::test]
    async fn test_dispatch_swallows_mailer_failure() {
        let dispatcher = NotificationDispatcher::new(Arc::new(BrokenMailer), NotificationConfig::default());
        let handle = dispatcher.dispatch(paid_reservation());
        // The task completes normally even though delivery failed
        assert!(handle.await.is_ok());
        assert!(dispatcher.notify(&paid_reservation()).await.is_err());
    }
}
