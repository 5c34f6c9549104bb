use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tourline_core::notify::{MailError, Mailer};

/// SMTP mailer over STARTTLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        server: &str,
        port: u16,
        username: String,
        password: String,
        from_email: &str,
        from_name: &str,
    ) -> Result<Self, MailError> {
        let from: Mailbox = format!("{} <{}>", from_name, from_email)
            .parse()
            .map_err(|e| MailError::Address(format!("Invalid from address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|e| MailError::Address(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| MailError::Build(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(format!("Failed to send email: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_sender() {
        let result = SmtpMailer::new(
            "smtp.example.com",
            587,
            "user".to_string(),
            "secret".to_string(),
            "not an address",
            "Tourline",
        );
        assert!(matches!(result, Err(MailError::Address(_))));
    }
}
