use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpSettings;
use crate::utils::{AppError, AppResult};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;
}

/// SMTP relay with STARTTLS and credentials.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> AppResult<Self> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid SMTP_FROM address: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| AppError::ConfigError(format!("Invalid SMTP relay {}: {}", settings.host, e)))?
            .port(settings.port);

        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|_| AppError::InvalidRequest(format!("Invalid email address: {}", to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalError(format!("SMTP delivery failed: {}", e)))?;

        log::info!("📧 Email sent to {}: {}", to, subject);
        Ok(())
    }
}

/// Used when SMTP is not configured: the message only goes to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        log::warn!("📧 SMTP not configured, email to {} not delivered", to);
        log::info!("📧 [{}] {}", subject, body);
        Ok(())
    }
}

pub fn otp_email(name: &str, code: &str, ttl_minutes: i64) -> (String, String) {
    let subject = "Your Musical Odyssey verification code".to_string();
    let body = format!(
        "Hi {},\n\nYour verification code is {}.\nIt expires in {} minutes.\n\n\
         If you did not create a Musical Odyssey account, you can ignore this email.\n",
        name, code, ttl_minutes
    );
    (subject, body)
}
