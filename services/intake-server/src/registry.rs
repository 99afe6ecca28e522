//! Vehicle registry lookup (RDW open data).
//!
//! The registry is queried by compact plate (`VGK91X`) and answers with a JSON
//! array of matching registrations. Only the first row is used.

use std::time::Duration;

use async_trait::async_trait;
use intake_ident::compact_plate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Registry client settings.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub url: String,
    pub timeout: Duration,
}

/// Vehicle details returned by a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleInfo {
    /// Make (`merk`).
    pub make: String,
    /// Trade name (`handelsbenaming`).
    pub model: String,
    /// Year of first admission, or empty when unknown.
    pub build_year: String,
}

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Nothing left after stripping the plate.
    #[error("no license plate given")]
    EmptyPlate,

    /// The registry has no record for the plate.
    #[error("license plate not found")]
    NotFound,

    /// Transport or decoding failure.
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl RegistryError {
    /// Message shown to the form user.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyPlate => "Geen kenteken opgegeven.".to_string(),
            Self::NotFound => "Kenteken niet gevonden bij RDW.".to_string(),
            Self::Http(e) => format!("RDW fout: {e}"),
        }
    }
}

/// Looks up vehicles by license plate.
#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    /// Looks up `plate` in any formatting; implementations compact it first.
    async fn lookup(&self, plate: &str) -> Result<VehicleInfo, RegistryError>;
}

#[derive(Debug, Default, Deserialize)]
struct RdwRow {
    #[serde(default)]
    merk: Option<String>,
    #[serde(default)]
    handelsbenaming: Option<String>,
    #[serde(default)]
    datum_eerste_toelating: Option<String>,
}

/// Year part of a `YYYYMMDD` admission date, or empty when too short.
fn build_year(date: &str) -> String {
    if date.chars().count() >= 4 {
        date.chars().take(4).collect()
    } else {
        String::new()
    }
}

impl From<RdwRow> for VehicleInfo {
    fn from(row: RdwRow) -> Self {
        Self {
            make: row.merk.unwrap_or_default(),
            model: row.handelsbenaming.unwrap_or_default(),
            build_year: build_year(row.datum_eerste_toelating.as_deref().unwrap_or_default()),
        }
    }
}

/// HTTP client for the RDW open-data API.
#[derive(Debug, Clone)]
pub struct RdwClient {
    client: reqwest::Client,
    url: String,
}

impl RdwClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl VehicleRegistry for RdwClient {
    async fn lookup(&self, plate: &str) -> Result<VehicleInfo, RegistryError> {
        let plate = compact_plate(plate);
        if plate.is_empty() {
            return Err(RegistryError::EmptyPlate);
        }

        debug!(plate = %plate, "Querying vehicle registry");
        let response = self
            .client
            .get(&self.url)
            .query(&[("kenteken", plate.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(plate = %plate, status = %response.status(), "Registry returned an error status");
            return Err(RegistryError::NotFound);
        }

        let rows: Vec<RdwRow> = response.json().await?;
        rows.into_iter()
            .next()
            .map(VehicleInfo::from)
            .ok_or(RegistryError::NotFound)
    }
}
