//! Outgoing mail: message model and delivery transports.
//!
//! Two transports are supported: an SMTP relay (implicit TLS, STARTTLS or
//! plain) and a transactional mail HTTP API. Both take the same
//! [`OutgoingMail`] and return a short human-readable status for logging.

mod sendgrid;
mod smtp;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

pub use sendgrid::{SendGridConfig, SendGridTransport};
pub use smtp::{build_message, SmtpConfig, SmtpTransport};

/// Mail settings loaded from the environment.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Default sender (`SENDER_EMAIL`).
    pub sender: Option<String>,
    /// Default admin recipients, `,`/`;` separated (`RECEIVER_EMAIL`).
    pub receivers: Option<String>,
    /// Subject override (`MAIL_SUBJECT`).
    pub subject: Option<String>,
    /// Plain-text body.
    pub body: String,
    pub transport: TransportConfig,
}

/// Which transport delivers mail.
#[derive(Debug, Clone)]
pub enum TransportConfig {
    Disabled,
    Smtp(SmtpConfig),
    SendGrid(SendGridConfig),
}

/// Mail errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// A required setting is missing.
    #[error("mail not configured: {0}")]
    NotConfigured(String),

    /// An address could not be parsed.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// The SMTP exchange failed.
    #[error("smtp error: {0}")]
    Smtp(String),

    /// The mail API answered with a non-success status.
    #[error("mail API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The mail API could not be reached.
    #[error("mail API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A file attached to a mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub content: Vec<u8>,
    pub filename: String,
    /// MIME type such as `application/pdf`.
    pub mime: String,
}

impl Attachment {
    pub fn new(content: Vec<u8>, filename: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            content,
            filename: filename.into(),
            mime: mime.into(),
        }
    }

    /// Returns the MIME type, falling back to `application/octet-stream` when
    /// the declared one has no subtype.
    pub fn mime_type(&self) -> String {
        match self.mime.split_once('/') {
            Some((main, sub)) if !main.trim().is_empty() && !sub.trim().is_empty() => {
                format!("{}/{}", main.trim(), sub.trim())
            }
            _ => "application/octet-stream".to_string(),
        }
    }
}

/// A mail ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl OutgoingMail {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        from: impl Into<String>,
        to: Vec<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to,
            reply_to: None,
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Delivers [`OutgoingMail`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends the mail and returns a short status such as `sent via host:587`.
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError>;
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn MailTransport>;

/// Builds the configured transport, or `None` when mail is disabled.
pub fn build_transport(config: &TransportConfig) -> Result<Option<SharedTransport>, MailError> {
    let transport: SharedTransport = match config {
        TransportConfig::Disabled => return Ok(None),
        TransportConfig::Smtp(smtp) => Arc::new(SmtpTransport::new(smtp)?),
        TransportConfig::SendGrid(sendgrid) => Arc::new(SendGridTransport::new(sendgrid)?),
    };
    Ok(Some(transport))
}

/// Timeout applied to mail API requests.
pub(crate) const API_TIMEOUT: Duration = Duration::from_secs(20);
