//! Identifier endpoints: plate formatting and VIN/IMEI validation.
//!
//! Request bodies are parsed leniently: a missing or malformed JSON body is
//! treated as an empty input rather than rejected, so the form scripts never
//! see an error page while the user is typing.

use axum::{body::Bytes, routing::post, Json, Router};
use intake_ident::{
    imei_from_scan, is_valid_vin, normalize_plate_by_length_template, normalize_plate_by_runs,
    reconcile_imei, sanitize_vin, vin_check_char, SevenCharGrouping, IMEI_BODY_LENGTH,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::state::AppState;

/// Create identifier routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/format_kenteken", post(format_plate))
        .route("/format_kenteken/live", post(format_plate_live))
        .route("/validate/vin", post(validate_vin))
        .route("/validate/imei", post(validate_imei))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct FormatRequest {
    #[serde(default)]
    pub raw: String,

    /// `"2-3-2"` (default) or `"2-2-3"`; only used by the live formatter.
    #[serde(default)]
    pub grouping: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct FormatResponse {
    pub formatted: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub raw: String,

    /// Set when the text came from the barcode scanner.
    #[serde(default)]
    pub scanned: bool,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct VinResponse {
    /// Sanitized VIN.
    pub value: String,
    pub valid: bool,
    /// Computed check character, when the value has a valid shape.
    pub check_char: Option<char>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct ImeiResponse {
    /// Reconciled IMEI when valid, otherwise the extracted digits.
    pub value: String,
    pub valid: bool,
    /// True when a check digit was appended to a 14-digit body.
    pub completed: bool,
}

fn lenient<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

// =============================================================================
// Handlers
// =============================================================================

async fn format_plate(body: Bytes) -> Json<FormatResponse> {
    let request: FormatRequest = lenient(&body);
    Json(FormatResponse {
        formatted: normalize_plate_by_runs(&request.raw),
    })
}

async fn format_plate_live(body: Bytes) -> Json<FormatResponse> {
    let request: FormatRequest = lenient(&body);
    let grouping = request
        .grouping
        .as_deref()
        .and_then(SevenCharGrouping::from_label)
        .unwrap_or_default();
    Json(FormatResponse {
        formatted: normalize_plate_by_length_template(&request.raw, grouping),
    })
}

async fn validate_vin(body: Bytes) -> Json<VinResponse> {
    let request: ValidateRequest = lenient(&body);
    let value = sanitize_vin(&request.raw);
    let valid = is_valid_vin(&value);
    debug!(scanned = request.scanned, valid, "Validated VIN");

    Json(VinResponse {
        check_char: vin_check_char(&value),
        value,
        valid,
    })
}

/// Typed input must be exactly 14 or 15 digits once separators are dropped;
/// scanned text may carry extra digits and is cut to the first 15.
fn check_imei(raw: &str, scanned: bool) -> ImeiResponse {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let reconciled = if scanned {
        imei_from_scan(raw).map(|imei| imei.as_str().to_string())
    } else {
        reconcile_imei(&digits)
    };

    match reconciled {
        Some(value) => ImeiResponse {
            value,
            valid: true,
            completed: digits.len() == IMEI_BODY_LENGTH,
        },
        None => ImeiResponse {
            value: digits,
            valid: false,
            completed: false,
        },
    }
}

async fn validate_imei(body: Bytes) -> Json<ImeiResponse> {
    let request: ValidateRequest = lenient(&body);
    let response = check_imei(&request.raw, request.scanned);
    debug!(
        scanned = request.scanned,
        valid = response.valid,
        completed = response.completed,
        "Validated IMEI"
    );
    Json(response)
}
