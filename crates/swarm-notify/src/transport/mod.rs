//! Messaging Provider Transport
//!
//! One client for one provider. Every request carries the bearer token,
//! goes through the shared retry loop, and comes back either as a typed
//! payload or as a normalized [`TransportError`]:
//!
//! ```text
//! send_text / place_voice_call / fetch_*
//!   ├─ local validation fails → Validation / Configuration (no request)
//!   ├─ 2xx                    → payload
//!   ├─ 4xx                    → Client error, returned immediately
//!   └─ 5xx / network          → retried with backoff, last error returned
//! ```
//!
//! The client holds no per-request state; clones share the HTTP pool and
//! metrics, so one instance can serve concurrent escalations.

pub mod error;
pub mod metrics;
pub mod retry;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::{ChannelConfig, DEFAULT_REQUEST_TIMEOUT};
pub use error::{provider_message, TransportError, TransportResult};
pub use metrics::{TransportMetrics, TransportMetricsSnapshot};
pub use retry::{with_retry, RetryPolicy};
pub use types::{is_phone_address, Assistant, CallDetails, SendReceipt, MAX_TEXT_LENGTH};

use types::{validate_destination, validate_text_body};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Uniform "send" capability consumed by the escalation manager.
///
/// Trait exists so tests and alternative providers can stand in for the
/// HTTP client.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> TransportResult<SendReceipt>;

    async fn place_voice_call(
        &self,
        to: &str,
        opening_line: &str,
        recording_enabled: Option<bool>,
    ) -> TransportResult<SendReceipt>;

    async fn send_email(&self, to: &str, subject: &str, body: &str)
        -> TransportResult<SendReceipt>;
}

/// HTTP client for the messaging provider.
#[derive(Clone)]
pub struct MessagingClient {
    http: reqwest::Client,
    config: Arc<ChannelConfig>,
    retry: RetryPolicy,
    request_timeout: Duration,
    metrics: Arc<TransportMetrics>,
}

impl MessagingClient {
    /// Build a client. Fails when the auth token is empty or the HTTP
    /// client cannot be created.
    pub fn new(config: ChannelConfig) -> TransportResult<Self> {
        if config.auth_token.trim().is_empty() {
            return Err(TransportError::configuration(
                "provider auth token is required",
            ));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                TransportError::configuration(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            config: Arc::new(config),
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            metrics: Arc::new(TransportMetrics::default()),
        })
    }

    /// Replace the default 3-attempt, 1s-base backoff policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-request deadline; applies to each attempt separately.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn metrics(&self) -> TransportMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Send a text message from the configured originating number.
    pub async fn send_text(&self, to: &str, body: &str) -> TransportResult<SendReceipt> {
        validate_destination(to)?;
        validate_text_body(body)?;
        let from = self.config.from_number.as_deref().ok_or_else(|| {
            TransportError::configuration("an originating number is required to send text")
        })?;

        let payload = json!({ "to": to, "from": from, "body": body });
        let receipt: SendReceipt = self.request(Method::POST, "/sms", Some(payload)).await?;
        info!(message_id = %receipt.id, status = %receipt.status, "Text message accepted");
        Ok(receipt)
    }

    /// Place an outbound call handled by the configured assistant.
    pub async fn place_voice_call(
        &self,
        to: &str,
        opening_line: &str,
        recording_enabled: Option<bool>,
    ) -> TransportResult<SendReceipt> {
        let assistant_id = self.config.assistant_id.as_deref().ok_or_else(|| {
            TransportError::configuration("an assistant id is required to place voice calls")
        })?;
        validate_destination(to)?;

        let mut overrides = json!({ "firstMessage": opening_line });
        if let Some(enabled) = recording_enabled {
            overrides["artifactPlan"] = json!({ "recordingEnabled": enabled });
        }
        let payload = json!({
            "assistantId": assistant_id,
            "customer": { "number": to },
            "assistantOverrides": overrides,
        });

        let receipt: SendReceipt = self.request(Method::POST, "/call", Some(payload)).await?;
        info!(call_id = %receipt.id, status = %receipt.status, "Voice call placed");
        Ok(receipt)
    }

    /// Email is not offered by this provider.
    pub async fn send_email(
        &self,
        to: &str,
        _subject: &str,
        _body: &str,
    ) -> TransportResult<SendReceipt> {
        debug!(to, "Email requested from a provider without an email API");
        Err(TransportError::NotImplemented {
            capability: "email",
            reason: "the messaging provider has no email API; a separate email integration is required",
        })
    }

    pub async fn fetch_call_details(&self, call_id: &str) -> TransportResult<CallDetails> {
        let call_id = validate_resource_id("call", call_id)?;
        self.request(Method::GET, &format!("/call/{call_id}"), None)
            .await
    }

    /// Look up an assistant, defaulting to the configured one.
    pub async fn fetch_assistant(&self, assistant_id: Option<&str>) -> TransportResult<Assistant> {
        let assistant_id = assistant_id
            .or(self.config.assistant_id.as_deref())
            .ok_or_else(|| {
                TransportError::configuration("no assistant id given and none configured")
            })?;
        let assistant_id = validate_resource_id("assistant", assistant_id)?;
        self.request(Method::GET, &format!("/assistant/{assistant_id}"), None)
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> TransportResult<T> {
        let label = format!("{method} {path}");
        with_retry(&self.retry, &label, |attempt| {
            let method = method.clone();
            let body = body.clone();
            async move { self.send_once(method, path, body.as_ref(), attempt).await }
        })
        .await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        attempt: u32,
    ) -> TransportResult<T> {
        self.metrics.record_attempt(attempt);
        debug!(method = %method, path, attempt = attempt + 1, "Dispatching provider request");

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.config.auth_token)
            .timeout(self.request_timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let result = Self::execute(request, method.as_str(), path).await;
        match &result {
            Ok(_) => self.metrics.record_success(),
            Err(err) => self.metrics.record_error(err),
        }
        result
    }

    async fn execute<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
        method: &str,
        path: &str,
    ) -> TransportResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::network(method, path, e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::network(method, path, e.to_string()))?;

        if !status.is_success() {
            let mut message = provider_message(&text);
            if message.is_empty() {
                message = status.canonical_reason().unwrap_or("no response body").to_string();
            }
            return Err(TransportError::from_status(
                method,
                path,
                status.as_u16(),
                message,
            ));
        }

        serde_json::from_str(&text).map_err(|e| TransportError::Decode {
            method: method.to_string(),
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

fn validate_resource_id<'a>(kind: &str, id: &'a str) -> TransportResult<&'a str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(TransportError::validation(format!(
            "'{id}' is not a valid {kind} id"
        )));
    }
    Ok(id)
}

#[async_trait]
impl Notifier for MessagingClient {
    async fn send_text(&self, to: &str, body: &str) -> TransportResult<SendReceipt> {
        MessagingClient::send_text(self, to, body).await
    }

    async fn place_voice_call(
        &self,
        to: &str,
        opening_line: &str,
        recording_enabled: Option<bool>,
    ) -> TransportResult<SendReceipt> {
        MessagingClient::place_voice_call(self, to, opening_line, recording_enabled).await
    }

    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> TransportResult<SendReceipt> {
        MessagingClient::send_email(self, to, subject, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> MessagingClient {
        let config = ChannelConfig::new("test-token")
            .with_base_url(server.url())
            .with_from_number("+15550000000")
            .with_assistant("asst_default");
        MessagingClient::new(config)
            .unwrap()
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)))
    }

    #[test]
    fn empty_token_is_a_configuration_error() {
        let err = MessagingClient::new(ChannelConfig::new("  ")).err().unwrap();
        assert!(matches!(err, TransportError::Configuration(_)));
    }

    #[tokio::test]
    async fn send_text_posts_authenticated_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sms")
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::Json(json!({
                "to": "+15551234567",
                "from": "+15550000000",
                "body": "hello",
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg_1","status":"queued","createdAt":"2026-03-01T12:00:00Z"}"#)
            .create_async()
            .await;

        let receipt = client(&server)
            .send_text("+15551234567", "hello")
            .await
            .unwrap();

        assert_eq!(receipt.id, "msg_1");
        assert_eq!(receipt.status, "queued");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn invalid_destination_never_hits_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/sms").expect(0).create_async().await;

        let client = client(&server);
        let err = client.send_text("5551234567", "hi").await.unwrap_err();
        assert!(matches!(err, TransportError::Validation(_)));

        let err = client
            .send_text("+15551234567", &"x".repeat(MAX_TEXT_LENGTH + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Validation(_)));

        mock.assert_async().await;
        assert_eq!(client.metrics().requests, 0);
    }

    #[tokio::test]
    async fn invalid_call_destination_never_hits_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/call").expect(0).create_async().await;

        let client = client(&server);
        for to in ["5551234567", "+0123", ""] {
            let err = client
                .place_voice_call(to, "hello", None)
                .await
                .unwrap_err();
            assert!(matches!(err, TransportError::Validation(_)), "{to}: {err}");
        }

        mock.assert_async().await;
        assert_eq!(client.metrics().requests, 0);
    }

    #[tokio::test]
    async fn text_without_originating_number_is_a_configuration_error() {
        let server = mockito::Server::new_async().await;
        let client = MessagingClient::new(ChannelConfig::new("t").with_base_url(server.url()))
            .unwrap();
        let err = client.send_text("+15551234567", "hi").await.unwrap_err();
        assert!(matches!(err, TransportError::Configuration(_)));
    }

    #[tokio::test]
    async fn voice_call_requires_assistant() {
        let server = mockito::Server::new_async().await;
        let client = MessagingClient::new(ChannelConfig::new("t").with_base_url(server.url()))
            .unwrap();
        let err = client
            .place_voice_call("+15551234567", "hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Configuration(_)));
    }

    #[tokio::test]
    async fn voice_call_carries_overrides() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/call")
            .match_body(Matcher::Json(json!({
                "assistantId": "asst_default",
                "customer": { "number": "+15551234567" },
                "assistantOverrides": {
                    "firstMessage": "Critical issue",
                    "artifactPlan": { "recordingEnabled": true },
                },
            })))
            .with_status(201)
            .with_body(r#"{"id":"call_1","status":"queued"}"#)
            .create_async()
            .await;

        let receipt = client(&server)
            .place_voice_call("+15551234567", "Critical issue", Some(true))
            .await
            .unwrap();
        assert_eq!(receipt.id, "call_1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_error_message_is_normalized() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sms")
            .with_status(400)
            .with_body(r#"{"message":["to must be a valid phone number"]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server);
        let err = client.send_text("+15551234567", "hi").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "POST /sms failed (400): to must be a valid phone number"
        );
        mock.assert_async().await;
        assert_eq!(client.metrics().client_errors, 1);
    }

    #[tokio::test]
    async fn empty_error_body_uses_status_reason() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/call/c1")
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server).fetch_call_details("c1").await.unwrap_err();
        assert_eq!(err.to_string(), "GET /call/c1 failed (404): Not Found");
    }

    #[tokio::test]
    async fn fetch_assistant_defaults_to_configured_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/assistant/asst_default")
            .with_status(200)
            .with_body(r#"{"id":"asst_default","name":"On-call"}"#)
            .create_async()
            .await;

        let assistant = client(&server).fetch_assistant(None).await.unwrap();
        assert_eq!(assistant.name.as_deref(), Some("On-call"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_ids_are_rejected_locally() {
        let server = mockito::Server::new_async().await;
        let client = client(&server);
        let err = client.fetch_call_details("../secrets").await.unwrap_err();
        assert!(matches!(err, TransportError::Validation(_)));
        let err = client.fetch_assistant(Some(" ")).await.unwrap_err();
        assert!(matches!(err, TransportError::Validation(_)));
    }

    #[tokio::test]
    async fn undecodable_success_body_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/call/c2")
            .with_status(200)
            .with_body("<html>oops</html>")
            .expect(1)
            .create_async()
            .await;

        let err = client(&server).fetch_call_details("c2").await.unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn email_is_not_implemented() {
        let server = mockito::Server::new_async().await;
        let err = client(&server)
            .send_email("+15551234567", "subject", "body")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::NotImplemented {
                capability: "email",
                ..
            }
        ));
        assert!(!err.is_retryable());
    }
}
