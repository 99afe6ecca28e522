//! Transactional mail API transport (SendGrid v3 `mail/send`).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use tracing::debug;

use super::{MailError, MailTransport, OutgoingMail, API_TIMEOUT};

/// Mail API settings.
#[derive(Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    pub url: String,
}

impl std::fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiAttachment<'a> {
    content: String,
    filename: &'a str,
    #[serde(rename = "type")]
    mime: String,
    disposition: &'static str,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<EmailAddress<'a>>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ApiAttachment<'a>>,
}

impl<'a> SendRequest<'a> {
    fn from_mail(mail: &'a OutgoingMail) -> Self {
        Self {
            personalizations: vec![Personalization {
                to: mail
                    .to
                    .iter()
                    .map(|email| EmailAddress { email: email.trim() })
                    .collect(),
            }],
            from: EmailAddress {
                email: mail.from.trim(),
            },
            reply_to: mail
                .reply_to
                .as_deref()
                .map(|email| EmailAddress { email: email.trim() }),
            subject: &mail.subject,
            content: vec![Content {
                kind: "text/plain",
                value: &mail.body,
            }],
            attachments: mail
                .attachments
                .iter()
                .map(|a| ApiAttachment {
                    content: STANDARD.encode(&a.content),
                    filename: &a.filename,
                    mime: a.mime_type(),
                    disposition: "attachment",
                })
                .collect(),
        }
    }
}

/// Sends mail through the HTTP API.
pub struct SendGridTransport {
    client: reqwest::Client,
    url: String,
}

impl SendGridTransport {
    pub fn new(config: &SendGridConfig) -> Result<Self, MailError> {
        if config.api_key.trim().is_empty() {
            return Err(MailError::NotConfigured(
                "SENDGRID_API_KEY is not set".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|_| MailError::NotConfigured("SENDGRID_API_KEY is malformed".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(API_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SendGridTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
        if mail.to.is_empty() {
            return Err(MailError::NotConfigured("no recipients".to_string()));
        }

        debug!(url = %self.url, recipients = mail.to.len(), "Sending mail via API");
        let response = self
            .client
            .post(&self.url)
            .json(&SendRequest::from_mail(mail))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok("sent via sendgrid".to_string())
    }
}
