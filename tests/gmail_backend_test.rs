//! Gmail backend token refresh (using WireMock) with a stub SMTP transport

mod common;

use common::RecordingTransport;
use mailcraft::domain::GmailConfig;
use mailcraft::email::{EmailBackend, GmailMailer, GoogleTokenClient, RetryPolicy};
use mailcraft::{ComposedMessage, Envelope, MailError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_config(base_url: &str) -> GmailConfig {
    GmailConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        refresh_token: "refresh-me".to_string(),
        email: "sender@gmail.com".to_string(),
        token_url: format!("{}/token", base_url),
    }
}

fn envelope() -> Envelope {
    Envelope::new("to@x.com", "sender@gmail.com")
}

fn message() -> ComposedMessage {
    ComposedMessage::new("Hello", "<p>Dear John</p>")
}

#[tokio::test]
async fn test_token_refresh_sends_refresh_grant() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-me"))
        .and(body_string_contains("client_id=client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.mock-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GoogleTokenClient::new(&create_test_config(&mock_server.uri()));

    assert_eq!(client.access_token().await.unwrap(), "ya29.mock-token");
    // served from cache
    assert_eq!(client.access_token().await.unwrap(), "ya29.mock-token");
}

#[tokio::test]
async fn test_short_lived_token_is_refreshed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "short-lived",
            "expires_in": 30
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = GoogleTokenClient::new(&create_test_config(&mock_server.uri()));

    // within the expiry buffer, so every call refreshes
    client.access_token().await.unwrap();
    client.access_token().await.unwrap();
}

#[tokio::test]
async fn test_gmail_send_uses_transport_after_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.mock-token",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = RecordingTransport::succeeding();
    let mailer = GmailMailer::from_config(&create_test_config(&mock_server.uri()))
        .unwrap()
        .with_transport(transport.clone());

    mailer.send_email(&envelope(), &message(), false).await.unwrap();
    mailer.send_email(&envelope(), &message(), false).await.unwrap();

    assert_eq!(mailer.backend_name(), "gmail");
    assert_eq!(transport.delivered().len(), 2);
}

#[tokio::test]
async fn test_rejected_refresh_token_fails_without_sending() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&mock_server)
        .await;

    let transport = RecordingTransport::succeeding();
    let mailer = GmailMailer::from_config(&create_test_config(&mock_server.uri()))
        .unwrap()
        .with_transport(transport.clone());

    let err = mailer
        .send_email(&envelope(), &message(), false)
        .await
        .unwrap_err();

    match err {
        MailError::DeliveryFailed(detail) => {
            assert!(detail.contains("invalid_grant"), "{}", detail);
            assert!(detail.contains("expired or revoked"), "{}", detail);
        }
        other => panic!("expected DeliveryFailed, got {:?}", other),
    }
    assert_eq!(transport.attempt_count(), 0);
}

#[tokio::test]
async fn test_gmail_retries_like_smtp() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.mock-token",
            "expires_in": 3599
        })))
        .mount(&mock_server)
        .await;

    let transport = RecordingTransport::always_failing();
    let mailer = GmailMailer::from_config(&create_test_config(&mock_server.uri()))
        .unwrap()
        .with_transport(transport.clone())
        .with_retry(RetryPolicy::new(5, Duration::from_millis(10)));

    let err = mailer
        .send_email(&envelope(), &message(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::DeliveryFailed(_)));
    assert_eq!(transport.attempt_count(), 5);
}
