// SMTP delivery of finished reports.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use periscope_common::ReportFormat;

use crate::error::{Result, RetrievalError};

#[async_trait]
pub trait ReportMailer: Send + Sync {
    /// Send a finished report to one recipient. Content is the rendered
    /// document in the given format.
    async fn send_report(
        &self,
        to: &str,
        job_title: &str,
        content: &str,
        format: ReportFormat,
    ) -> Result<()>;
}

/// Mailer used when SMTP is not configured. Every send fails, which the
/// dispatcher records as `email_sent = false` without failing the run.
pub struct DisabledMailer;

#[async_trait]
impl ReportMailer for DisabledMailer {
    async fn send_report(&self, _: &str, _: &str, _: &str, _: ReportFormat) -> Result<()> {
        Err(RetrievalError::MailFailed(
            "SMTP is not configured".to_string(),
        ))
    }
}

/// SMTP mailer over STARTTLS relay with username/password credentials.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, username: &str, password: &str, from: &str) -> Result<Self> {
        let from = from
            .parse()
            .map_err(|e| RetrievalError::MailFailed(format!("invalid from address: {e}")))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| RetrievalError::MailFailed(format!("SMTP relay setup failed: {e}")))?
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl ReportMailer for SmtpMailer {
    async fn send_report(
        &self,
        to: &str,
        job_title: &str,
        content: &str,
        format: ReportFormat,
    ) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| RetrievalError::MailFailed(format!("invalid recipient address: {e}")))?;

        let content_type = match format {
            ReportFormat::Html => ContentType::TEXT_HTML,
            _ => ContentType::TEXT_PLAIN,
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Research report: {job_title}"))
            .header(content_type)
            .body(content.to_string())
            .map_err(|e| RetrievalError::MailFailed(format!("failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| RetrievalError::MailFailed(format!("send failed: {e}")))?;

        info!(job_title, format = %format, "Report email sent");
        Ok(())
    }
}
