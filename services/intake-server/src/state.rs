//! Application state shared across request handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::mail::{build_transport, MailConfig, SharedTransport};
use crate::pdf::PdfBranding;
use crate::photos::prepare_logo;
use crate::registry::{RdwClient, VehicleRegistry};

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    registry: Arc<dyn VehicleRegistry>,
    mailer: Option<SharedTransport>,
    mail: MailConfig,
    branding: PdfBranding,
    max_upload_bytes: usize,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        registry: Arc<dyn VehicleRegistry>,
        mailer: Option<SharedTransport>,
        mail: MailConfig,
        branding: PdfBranding,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                registry,
                mailer,
                mail,
                branding,
                max_upload_bytes,
            }),
        }
    }

    /// Build the state from configuration: registry client, mail transport
    /// and PDF branding (including the logo, when configured and readable).
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry =
            RdwClient::new(&config.registry).context("failed to build registry client")?;
        let mailer =
            build_transport(&config.mail.transport).context("failed to build mail transport")?;
        if mailer.is_none() {
            info!("Mail transport disabled; work orders are only downloaded");
        }

        let logo = config.logo_path.as_ref().and_then(|path| {
            match std::fs::read(path) {
                Ok(bytes) => {
                    let logo = prepare_logo(&bytes);
                    if logo.is_none() {
                        warn!(path = %path.display(), "Logo could not be decoded; skipping");
                    }
                    logo
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read logo; skipping");
                    None
                }
            }
        });

        let branding = PdfBranding {
            company_name: config.company_name.clone(),
            logo,
        };

        Ok(Self::new(
            Arc::new(registry),
            mailer,
            config.mail.clone(),
            branding,
            config.max_upload_bytes,
        ))
    }

    /// Get the vehicle registry.
    pub fn registry(&self) -> &dyn VehicleRegistry {
        self.inner.registry.as_ref()
    }

    /// Get the mail transport, if mail is enabled.
    pub fn mailer(&self) -> Option<&SharedTransport> {
        self.inner.mailer.as_ref()
    }

    pub fn mail_config(&self) -> &MailConfig {
        &self.inner.mail
    }

    pub fn branding(&self) -> &PdfBranding {
        &self.inner.branding
    }

    pub fn company_name(&self) -> &str {
        &self.inner.branding.company_name
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner.max_upload_bytes
    }
}
