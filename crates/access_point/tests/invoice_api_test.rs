use access_point::{HttpInvoiceApi, InvoiceApi, ServiceAuth, TRANSPORT_ERROR_KEY};
use payinv_core::{Invoice, InvoiceStatus};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base_url: String) -> std::sync::Arc<HttpInvoiceApi> {
    HttpInvoiceApi::new(base_url, ServiceAuth::Anonymous, Duration::from_secs(5)).unwrap()
}

fn invoice_json(id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "schemeType": "EU",
        "organisation": "RPA",
        "paymentType": "invoice",
        "accountType": "AP",
        "status": status,
        "paymentRequests": []
    })
}

const ID: &str = "3f2b8f4e-1c1d-4b7a-9a6e-2d5c0f7e8a90";

#[tokio::test]
async fn find_invoice_returns_decoded_invoice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/invoice/EU/{ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(ID, "draft")))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(server.uri()).find_invoice(ID, "EU").await;

    assert!(response.is_success());
    let invoice = response.into_data().unwrap();
    assert_eq!(invoice.id.to_string(), ID);
    assert_eq!(invoice.status, InvoiceStatus::Draft);
}

#[tokio::test]
async fn find_approval_uses_approval_route() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/invoice/approval/EU/{ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(ID, "approval")))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(server.uri()).find_approval(ID, "EU").await;

    assert_eq!(response.data().unwrap().status, InvoiceStatus::Approval);
}

#[tokio::test]
async fn update_invoice_puts_full_document() {
    let server = MockServer::start().await;
    let mut invoice = Invoice::new("EU", "RPA", "invoice", "AP");
    invoice.status = InvoiceStatus::Approved;

    Mock::given(method("PUT"))
        .and(path(format!("/invoice/{}", invoice.id)))
        .and(body_partial_json(serde_json::json!({
            "status": "approved",
            "schemeType": "EU",
            "paymentRequests": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&invoice))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(server.uri()).update_invoice(&invoice).await;

    assert!(response.is_success());
    assert_eq!(response.into_data().unwrap(), invoice);
}

#[tokio::test]
async fn update_invoice_with_empty_body_echoes_submitted_invoice() {
    let server = MockServer::start().await;
    let invoice = Invoice::new("EU", "RPA", "invoice", "AP");
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let response = client(server.uri()).update_invoice(&invoice).await;

    assert_eq!(response.data(), Some(&invoice));
}

#[tokio::test]
async fn rejected_update_keeps_raw_body_under_call_key() {
    let server = MockServer::start().await;
    let invoice = Invoice::new("EU", "RPA", "invoice", "AP");
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid scheme"))
        .mount(&server)
        .await;

    let response = client(server.uri()).update_invoice(&invoice).await;

    assert!(!response.is_success());
    assert!(response.data().is_none());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors.get("UpdateInvoice").unwrap(),
        &["Invalid scheme".to_string()]
    );
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Nothing listens on the discard port.
    let response = client("http://127.0.0.1:9".to_string())
        .find_invoice(ID, "EU")
        .await;

    assert!(!response.is_success());
    assert!(response.errors.contains_key(TRANSPORT_ERROR_KEY));
    assert!(!response.errors.contains_key("FindInvoice"));
}

#[tokio::test]
async fn undecodable_body_is_reported_under_call_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let response = client(server.uri()).find_invoice(ID, "EU").await;

    assert!(response.errors.contains_key("FindInvoice"));
}

#[tokio::test]
async fn create_invoice_posts_to_collection() {
    let server = MockServer::start().await;
    let invoice = Invoice::new("EU", "RPA", "invoice", "AP");
    Mock::given(method("POST"))
        .and(path("/invoice"))
        .respond_with(ResponseTemplate::new(201).set_body_json(&invoice))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(server.uri()).create_invoice(&invoice).await;

    assert!(response.is_success());
}

#[tokio::test]
async fn delete_payment_request_hits_header_route() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/invoice/header/PR-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(server.uri()).delete_payment_request("PR-1").await;

    assert!(response.is_success());
}

#[tokio::test]
async fn list_approvals_decodes_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/invoice/approvals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            invoice_json(ID, "approval"),
            invoice_json("9d7a3c52-6a2f-4f51-8a0b-5f6c1e2d3b4a", "approval")
        ])))
        .mount(&server)
        .await;

    let response = client(server.uri()).list_approvals().await;

    assert_eq!(response.into_data().unwrap().len(), 2);
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(ID, "draft")))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpInvoiceApi::new(
        server.uri(),
        ServiceAuth::ApiKey {
            key: "secret-key".into(),
        },
        Duration::from_secs(5),
    )
    .unwrap();

    assert!(api.find_invoice(ID, "EU").await.is_success());
}

#[tokio::test]
async fn oauth_token_is_fetched_once_and_reused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/invoice/EU/{ID}")))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(ID, "draft")))
        .expect(2)
        .mount(&server)
        .await;

    let api = HttpInvoiceApi::new(
        server.uri(),
        ServiceAuth::OAuth2 {
            client_id: "web".into(),
            client_secret: "s3cret".into(),
            token_url: format!("{}/oauth/token", server.uri()),
        },
        Duration::from_secs(5),
    )
    .unwrap();

    assert!(api.find_invoice(ID, "EU").await.is_success());
    assert!(api.find_invoice(ID, "EU").await.is_success());
}

fn oauth_client(server: &MockServer) -> std::sync::Arc<HttpInvoiceApi> {
    HttpInvoiceApi::new(
        server.uri(),
        ServiceAuth::OAuth2 {
            client_id: "web".into(),
            client_secret: "s3cret".into(),
            token_url: format!("{}/oauth/token", server.uri()),
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

async fn mount_token(server: &MockServer, token: &str, expires_in: u64, times: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": token,
            "expires_in": expires_in
        })))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn unauthorized_response_drops_cached_token() {
    let server = MockServer::start().await;
    mount_token(&server, "stale", 3600, 1).await;
    mount_token(&server, "fresh", 3600, 1).await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(ID, "draft")))
        .expect(1)
        .mount(&server)
        .await;

    let api = oauth_client(&server);

    let first = api.find_invoice(ID, "EU").await;
    assert_eq!(first.errors.get("FindInvoice").unwrap(), &["HTTP 401".to_string()]);
    assert!(api.find_invoice(ID, "EU").await.is_success());
}

#[tokio::test]
async fn expired_token_is_fetched_again() {
    let server = MockServer::start().await;
    // Lifetime shorter than the refresh margin: never reused.
    mount_token(&server, "short-lived", 5, 2).await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer short-lived"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(ID, "draft")))
        .expect(2)
        .mount(&server)
        .await;

    let api = oauth_client(&server);

    assert!(api.find_invoice(ID, "EU").await.is_success());
    assert!(api.find_invoice(ID, "EU").await.is_success());
}

#[tokio::test]
async fn path_parameters_are_percent_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/invoice/EU%2Fapproval/{ID}")))
        .respond_with(ResponseTemplate::new(404).set_body_string("Unknown scheme"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/invoice/header/PR%3F1%23x"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(server.uri());

    let response = api.find_invoice(ID, "EU/approval").await;
    assert_eq!(response.errors.get("FindInvoice").unwrap(), &["Unknown scheme".to_string()]);
    assert!(api.delete_payment_request("PR?1#x").await.is_success());
}

#[tokio::test]
async fn truncated_body_after_status_is_not_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        // Promise 100 bytes, send a few, then hang up.
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"id\"")
            .await;
        let _ = socket.shutdown().await;
    });

    let response = client(format!("http://{addr}")).find_invoice(ID, "EU").await;

    assert!(!response.is_success());
    assert!(response.errors.contains_key("FindInvoice"));
    assert!(!response.errors.contains_key(TRANSPORT_ERROR_KEY));
}
