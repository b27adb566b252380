use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::{config::SmtpConfig, error::AppError};

/// SMTP notifier for new-message email. Built once at startup; absent SMTP
/// config disables email notifications entirely.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
            .port(cfg.port)
            .credentials(creds)
            .build();

        let from = format!("{} <{}>", cfg.from_name, cfg.from_email)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid SMTP from address: {e}")))?;

        Ok(Self { transport, from })
    }

    /// Notify a recipient that someone messaged them.
    pub async fn send_message_notification(
        &self,
        to_email: &str,
        to_name: &str,
        sender_name: &str,
        content: &str,
    ) -> Result<(), AppError> {
        let to: Mailbox = format!("{to_name} <{to_email}>")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid recipient address: {e}")))?;

        let body = format!(
            "Hi {to_name},\n\n{sender_name} sent you a message on Brightly:\n\n\
             {content}\n\nOpen the app to reply.\n"
        );

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("New message from {sender_name}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Config(format!("failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::Config(format!("smtp send failed: {e}")))?;

        Ok(())
    }
}
