//! Vehicle registry lookup endpoint.
//!
//! Always answers 200; the outcome is carried in the `success` flag so the
//! form can show the message as-is.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::request_context::RequestContext;
use crate::registry::RegistryError;
use crate::state::AppState;

/// Create registry routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/rdw", get(lookup))
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub kenteken: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LookupResponse {
    Found {
        success: bool,
        merk: String,
        #[serde(rename = "type")]
        model: String,
        bouwjaar: String,
    },
    Failed {
        success: bool,
        message: String,
    },
}

async fn lookup(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<LookupQuery>,
) -> Json<LookupResponse> {
    match state.registry().lookup(&query.kenteken).await {
        Ok(vehicle) => {
            info!(request_id = %ctx.request_id, make = %vehicle.make, "Registry lookup succeeded");
            Json(LookupResponse::Found {
                success: true,
                merk: vehicle.make,
                model: vehicle.model,
                bouwjaar: vehicle.build_year,
            })
        }
        Err(e) => {
            match &e {
                RegistryError::Http(_) => {
                    warn!(request_id = %ctx.request_id, error = %e, "Registry lookup failed")
                }
                _ => info!(request_id = %ctx.request_id, error = %e, "Registry lookup unsuccessful"),
            }
            Json(LookupResponse::Failed {
                success: false,
                message: e.user_message(),
            })
        }
    }
}
