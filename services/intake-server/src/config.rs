//! Service configuration (env-driven).

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::mail::{MailConfig, SendGridConfig, SmtpConfig, TransportConfig};
use crate::registry::RegistryConfig;

/// Default RDW open-data endpoint for registered vehicles.
pub const DEFAULT_RDW_URL: &str = "https://opendata.rdw.nl/resource/m9d7-ebf2.json";

/// Default transactional mail API endpoint.
pub const DEFAULT_SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Default mail body when `MAIL_BODY` is unset.
pub const DEFAULT_MAIL_BODY: &str = "In de bijlage vind je de opdrachtbon (PDF).";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    /// Maximum accepted request body (the photo uploads dominate).
    pub max_upload_bytes: usize,
    /// Shown in the page title and PDF footer.
    pub company_name: String,
    /// Optional logo drawn in the PDF header.
    pub logo_path: Option<PathBuf>,
    pub registry: RegistryConfig,
    pub mail: MailConfig,
}

/// Parses a boolean flag the way operators tend to write them.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_addr = var("INTAKE_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .context("INTAKE_LISTEN_ADDR must be a socket address (host:port).")?;

        let log_level = var("INTAKE_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let max_upload_mb: usize = var("INTAKE_MAX_UPLOAD_MB")
            .map(|v| v.trim().parse())
            .transpose()
            .context("INTAKE_MAX_UPLOAD_MB must be an integer (megabytes).")?
            .unwrap_or(40);
        let max_upload_bytes = max_upload_mb.max(1) * 1024 * 1024;

        let company_name =
            var("INTAKE_COMPANY_NAME").unwrap_or_else(|| "IC-North Automotive".to_string());
        let logo_path = var("INTAKE_LOGO_PATH").map(PathBuf::from);

        let rdw_timeout_ms: u64 = var("INTAKE_RDW_TIMEOUT_MS")
            .map(|v| v.trim().parse())
            .transpose()
            .context("INTAKE_RDW_TIMEOUT_MS must be an integer (milliseconds).")?
            .unwrap_or(8000);
        let registry = RegistryConfig {
            url: var("INTAKE_RDW_URL").unwrap_or_else(|| DEFAULT_RDW_URL.to_string()),
            timeout: Duration::from_millis(rdw_timeout_ms.max(100)),
        };

        let mail = mail_config(&var)?;

        Ok(Self {
            listen_addr,
            log_level,
            max_upload_bytes,
            company_name,
            logo_path,
            registry,
            mail,
        })
    }
}

fn mail_config(var: &dyn Fn(&str) -> Option<String>) -> Result<MailConfig> {
    let smtp_host = var("SMTP_HOST");
    let sendgrid_key = var("SENDGRID_API_KEY");

    let transport_name = match var("MAIL_TRANSPORT") {
        Some(name) => name.trim().to_lowercase(),
        None if smtp_host.is_some() => "smtp".to_string(),
        None if sendgrid_key.is_some() => "sendgrid".to_string(),
        None => "none".to_string(),
    };

    let transport = match transport_name.as_str() {
        "smtp" => {
            let host = smtp_host.context("SMTP_HOST is not set")?;
            let use_ssl = var("SMTP_USE_SSL").is_some_and(|v| parse_bool(&v));
            let starttls = var("SMTP_STARTTLS").map_or(true, |v| parse_bool(&v));
            let port = var("SMTP_PORT")
                .map(|v| v.trim().parse::<u16>())
                .transpose()
                .context("SMTP_PORT must be a port number.")?
                .unwrap_or(if use_ssl { 465 } else { 587 });
            let timeout_secs: f64 = var("SMTP_TIMEOUT")
                .map(|v| v.trim().parse())
                .transpose()
                .context("SMTP_TIMEOUT must be a number of seconds.")?
                .unwrap_or(20.0);
            anyhow::ensure!(
                timeout_secs.is_finite() && timeout_secs > 0.0,
                "SMTP_TIMEOUT must be a positive number of seconds."
            );
            let timeout = Duration::try_from_secs_f64(timeout_secs)
                .context("SMTP_TIMEOUT must be a positive number of seconds.")?;

            TransportConfig::Smtp(SmtpConfig {
                host,
                port,
                user: var("SMTP_USER"),
                password: var("SMTP_PASSWORD"),
                use_ssl,
                starttls,
                timeout,
            })
        }
        "sendgrid" => TransportConfig::SendGrid(SendGridConfig {
            api_key: sendgrid_key.context("SENDGRID_API_KEY is not set")?,
            url: var("SENDGRID_URL").unwrap_or_else(|| DEFAULT_SENDGRID_URL.to_string()),
        }),
        "none" | "disabled" | "off" => TransportConfig::Disabled,
        other => anyhow::bail!("MAIL_TRANSPORT must be smtp, sendgrid or none, got '{other}'"),
    };

    Ok(MailConfig {
        sender: var("SENDER_EMAIL").map(|v| v.trim().to_string()),
        receivers: var("RECEIVER_EMAIL").map(|v| v.trim().to_string()),
        subject: var("MAIL_SUBJECT"),
        body: var("MAIL_BODY").unwrap_or_else(|| DEFAULT_MAIL_BODY.to_string()),
        transport,
    })
}
