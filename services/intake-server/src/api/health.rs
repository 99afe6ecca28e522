//! Health probes.
//!
//! Neither probe calls the registry or the mail relay; both are optional at
//! runtime and a slow upstream must not take the form offline.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: String,
    pub service: String,
    pub version: String,
    /// RFC 3339.
    pub timestamp: String,
    /// Whether submitted work orders are mailed or only downloaded.
    pub mail_enabled: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/livez", get(livez))
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "intake-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        mail_enabled: state.mailer().is_some(),
    })
}

async fn livez() -> impl IntoResponse {
    StatusCode::OK
}
