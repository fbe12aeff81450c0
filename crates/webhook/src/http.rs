//! Outbound HTTP capability.
//!
//! Every call to Stripe and the identity service goes through
//! [`HttpTransport`]. Production wires in [`ReqwestTransport`]; tests hand the
//! clients a scripted transport so no network is touched.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors raised before an HTTP status is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be built or sent, or timed out.
    #[error("request failed: {0}")]
    Request(String),

    /// Response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// A fully described outbound request.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<SecretString>,
    /// JSON body, already serialized.
    pub body: Option<String>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("bearer", &self.bearer.as_ref().map(|_| "[REDACTED]"))
            .field("body", &self.body)
            .finish()
    }
}

impl HttpRequest {
    /// Start a request with no auth and no body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer: None,
            body: None,
        }
    }

    /// Attach a bearer token.
    #[must_use]
    pub fn bearer(mut self, token: &SecretString) -> Self {
        self.bearer = Some(token.clone());
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, TransportError> {
        let encoded =
            serde_json::to_string(body).map_err(|e| TransportError::Request(e.to_string()))?;
        self.body = Some(encoded);
        Ok(self)
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Build a response from its parts.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body parsed as JSON, or the raw text as a JSON string when it is not JSON.
    #[must_use]
    pub fn json_or_text(&self) -> serde_json::Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|_| serde_json::Value::String(self.body.clone()))
    }
}

/// Capability to perform one HTTP exchange.
///
/// Any HTTP status, success or not, is an `Ok` response. Only failures that
/// leave no status behind are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and wait for the full response body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("subscriber-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }

        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!(status, bytes = body.len(), "Upstream responded");

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(199, "").is_success());
        assert!(!HttpResponse::new(300, "").is_success());
        assert!(!HttpResponse::new(422, "").is_success());
    }

    #[test]
    fn test_json_or_text() {
        let json = HttpResponse::new(200, r#"{"id":"u1"}"#).json_or_text();
        assert_eq!(json["id"], "u1");

        let text = HttpResponse::new(502, "Bad Gateway").json_or_text();
        assert_eq!(text, serde_json::Value::String("Bad Gateway".to_string()));
    }

    #[test]
    fn test_request_builder() {
        let token = SecretString::from("t0ken");
        let request = HttpRequest::new(Method::POST, "https://id.test/admin/users")
            .bearer(&token)
            .json(&serde_json::json!({"email": "a@example.com"}))
            .unwrap();

        assert_eq!(request.body.as_deref(), Some(r#"{"email":"a@example.com"}"#));
        assert!(request.bearer.is_some());
        assert!(!format!("{request:?}").contains("t0ken"));
    }
}
