//! HTTP API handlers and routing.

pub mod error;
mod form;
mod health;
mod identifiers;
mod registry;
pub mod request_context;
mod submit;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub use submit::{MAIL_STATUS_HEADER, WORK_ORDER_ID_HEADER};

/// Create the main API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .merge(health::routes())
        .merge(form::routes())
        .merge(identifiers::routes())
        .merge(registry::routes())
        .merge(submit::routes())
        .merge(mail_test::routes())
        // Middleware
        .layer(DefaultBodyLimit::max(state.max_upload_bytes()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::mail::{MailConfig, TransportConfig};
    use crate::pdf::PdfBranding;
    use crate::registry::{RegistryError, VehicleInfo, VehicleRegistry};

    struct StubRegistry;

    #[async_trait]
    impl VehicleRegistry for StubRegistry {
        async fn lookup(&self, plate: &str) -> Result<VehicleInfo, RegistryError> {
            match intake_ident::compact_plate(plate).as_str() {
                "" => Err(RegistryError::EmptyPlate),
                "VGK91X" => Ok(VehicleInfo {
                    make: "VOLKSWAGEN".into(),
                    model: "GOLF".into(),
                    build_year: "2019".into(),
                }),
                _ => Err(RegistryError::NotFound),
            }
        }
    }

    fn app() -> Router {
        let mail = MailConfig {
            sender: None,
            receivers: None,
            subject: None,
            body: "body".into(),
            transport: TransportConfig::Disabled,
        };
        let state = AppState::new(
            Arc::new(StubRegistry),
            None,
            mail,
            PdfBranding {
                company_name: "Garage Noord".into(),
                logo: None,
            },
            1024 * 1024,
        );
        create_router(state)
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_form_page() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("Garage Noord · Opdrachtbon"));
        assert!(page.contains(r#"name="foto_extra2""#));
    }

    #[tokio::test]
    async fn test_rdw_found() {
        let (status, json) = get_json("/rdw?kenteken=vgk-91-x").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["merk"], "VOLKSWAGEN");
        assert_eq!(json["type"], "GOLF");
        assert_eq!(json["bouwjaar"], "2019");
    }

    #[tokio::test]
    async fn test_rdw_failures_are_200() {
        let (status, json) = get_json("/rdw").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Geen kenteken opgegeven.");

        let (_, json) = get_json("/rdw?kenteken=XX-99-XX").await;
        assert_eq!(json["message"], "Kenteken niet gevonden bij RDW.");
    }

    #[tokio::test]
    async fn test_mail_test_requires_sender() {
        let (status, json) = get_json("/mail_test?to=a@example.com").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
    }

    #[tokio::test]
    async fn test_format_endpoint() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/format_kenteken")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"raw":"ab-12-cd"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["formatted"], "AB-12-CD");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
