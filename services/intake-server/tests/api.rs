use std::{sync::Arc, time::Duration};

use intake_server::{
    api,
    mail::{build_transport, MailConfig, SendGridConfig, TransportConfig},
    pdf::PdfBranding,
    registry::{RdwClient, RegistryConfig},
    state::AppState,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

struct ApiFixture {
    base_url: String,
    client: reqwest::Client,
}

fn mail_config(transport: TransportConfig) -> MailConfig {
    MailConfig {
        sender: Some("werkplaats@example.com".to_string()),
        receivers: Some("admin@example.com".to_string()),
        subject: None,
        body: "In de bijlage vind je de opdrachtbon (PDF).".to_string(),
        transport,
    }
}

async fn start_api(rdw_url: String, mail: MailConfig) -> ApiFixture {
    let registry = RdwClient::new(&RegistryConfig {
        url: rdw_url,
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let mailer = build_transport(&mail.transport).unwrap();
    let state = AppState::new(
        Arc::new(registry),
        mailer,
        mail,
        PdfBranding {
            company_name: "IC-North Automotive".to_string(),
            logo: None,
        },
        8 * 1024 * 1024,
    );
    let app = api::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ApiFixture {
        base_url,
        client: reqwest::Client::new(),
    }
}

async fn start_default() -> ApiFixture {
    start_api(
        "http://127.0.0.1:9/unused".to_string(),
        mail_config(TransportConfig::Disabled),
    )
    .await
}

impl ApiFixture {
    async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: Value) -> Value {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }
}

#[tokio::test]
async fn healthz_reports_service() {
    let api = start_default().await;
    let (status, body) = api.get_json("/healthz").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "intake-server");
}

#[tokio::test]
async fn rdw_lookup_queries_compact_plate() {
    let rdw = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resource/m9d7-ebf2.json"))
        .and(query_param("kenteken", "VGK91X"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "kenteken": "VGK91X",
            "merk": "VOLKSWAGEN",
            "handelsbenaming": "CRAFTER",
            "datum_eerste_toelating": "20190601"
        }])))
        .expect(1)
        .mount(&rdw)
        .await;

    let api = start_api(
        format!("{}/resource/m9d7-ebf2.json", rdw.uri()),
        mail_config(TransportConfig::Disabled),
    )
    .await;

    let (status, body) = api.get_json("/rdw?kenteken=vgk-91-x").await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({"success": true, "merk": "VOLKSWAGEN", "type": "CRAFTER", "bouwjaar": "2019"})
    );
}

#[tokio::test]
async fn rdw_lookup_reports_missing_vehicle() {
    let rdw = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("kenteken", "XX99XX"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&rdw)
        .await;
    Mock::given(method("GET"))
        .and(query_param("kenteken", "ZZ11ZZ"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&rdw)
        .await;

    let api = start_api(rdw.uri(), mail_config(TransportConfig::Disabled)).await;

    let (status, body) = api.get_json("/rdw?kenteken=XX-99-XX").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Kenteken niet gevonden bij RDW.");

    let (_, body) = api.get_json("/rdw?kenteken=ZZ-11-ZZ").await;
    assert_eq!(body["message"], "Kenteken niet gevonden bij RDW.");
}

#[tokio::test]
async fn rdw_lookup_reports_decode_error() {
    let rdw = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&rdw)
        .await;

    let api = start_api(rdw.uri(), mail_config(TransportConfig::Disabled)).await;
    let (status, body) = api.get_json("/rdw?kenteken=VGK91X").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("RDW fout: "));
}

#[tokio::test]
async fn rdw_lookup_rejects_empty_plate_without_calling_registry() {
    let rdw = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&rdw)
        .await;

    let api = start_api(rdw.uri(), mail_config(TransportConfig::Disabled)).await;
    let (_, body) = api.get_json("/rdw?kenteken=%20-%20").await;
    assert_eq!(body["message"], "Geen kenteken opgegeven.");
}

#[tokio::test]
async fn plate_formatters() {
    let api = start_default().await;

    let body = api
        .post_json("/format_kenteken", json!({"raw": "abc1234d"}))
        .await;
    assert_eq!(body["formatted"], "ABC-1234-D");

    let body = api
        .post_json("/format_kenteken/live", json!({"raw": "ab12cd"}))
        .await;
    assert_eq!(body["formatted"], "AB-12-CD");

    let body = api
        .post_json(
            "/format_kenteken/live",
            json!({"raw": "ab12cd3e", "grouping": "2-2-3"}),
        )
        .await;
    assert_eq!(body["formatted"], "AB-12-CD3-E");
}

#[tokio::test]
async fn plate_formatter_tolerates_garbage_body() {
    let api = start_default().await;
    let response = api
        .client
        .post(format!("{}/format_kenteken", api.base_url))
        .body("{{{")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["formatted"], "");
}

#[tokio::test]
async fn identifier_validation() {
    let api = start_default().await;

    let body = api
        .post_json("/validate/vin", json!({"raw": "1m8gdm9axkp042788"}))
        .await;
    assert_eq!(
        body,
        json!({"value": "1M8GDM9AXKP042788", "valid": true, "check_char": "X"})
    );

    let body = api
        .post_json("/validate/imei", json!({"raw": "35209900176148"}))
        .await;
    assert_eq!(
        body,
        json!({"value": "352099001761481", "valid": true, "completed": true})
    );

    let body = api
        .post_json(
            "/validate/imei",
            json!({"raw": "IMEI 490154203237518 / 01", "scanned": true}),
        )
        .await;
    assert_eq!(body["value"], "490154203237518");
    assert_eq!(body["valid"], true);
}

#[tokio::test]
async fn mail_test_sends_through_api() {
    let sendgrid = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer SG.test"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&sendgrid)
        .await;

    let transport = TransportConfig::SendGrid(SendGridConfig {
        api_key: "SG.test".to_string(),
        url: format!("{}/v3/mail/send", sendgrid.uri()),
    });
    let api = start_api("http://127.0.0.1:9".to_string(), mail_config(transport)).await;

    let (status, body) = api.get_json("/mail_test?to=iemand@example.com").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"ok": true, "status": "sent via sendgrid"}));

    let requests = sendgrid.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["subject"], "Testmail – Opdrachtbon");
    assert_eq!(sent["from"]["email"], "werkplaats@example.com");
    assert_eq!(
        sent["personalizations"][0]["to"][0]["email"],
        "iemand@example.com"
    );
}

#[tokio::test]
async fn mail_test_reports_api_failure() {
    let sendgrid = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&sendgrid)
        .await;

    let transport = TransportConfig::SendGrid(SendGridConfig {
        api_key: "SG.wrong".to_string(),
        url: sendgrid.uri(),
    });
    let api = start_api("http://127.0.0.1:9".to_string(), mail_config(transport)).await;

    let (status, body) = api.get_json("/mail_test").await;
    assert_eq!(status, 500);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn mail_test_without_transport_fails() {
    let api = start_default().await;
    let (status, body) = api.get_json("/mail_test").await;
    assert_eq!(status, 500);
    assert_eq!(body["ok"], false);
}
