//! Integration tests for Subscriber Sync.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p subscriber-sync-integration-tests
//! ```
//!
//! No network or external services are needed: [`ScriptedTransport`]
//! replays canned responses for every outbound call and records what was
//! sent, and [`signed_delivery`] signs bodies the way Stripe does.
//!
//! # Test Categories
//!
//! - `webhook_verification` - Signature and event filtering
//! - `webhook_provisioning` - Price gate, invite and role update flows

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use secrecy::SecretString;
use serde_json::Value;
use subscriber_sync_webhook::config::{IdentityConfig, StripeConfig, WebhookConfig, parse_price_ids};
use subscriber_sync_webhook::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use subscriber_sync_webhook::routes;
use subscriber_sync_webhook::state::AppState;
use subscriber_sync_webhook::stripe::{SIGNATURE_HEADER, WebhookVerifier};

/// Webhook secret used by [`test_config`].
pub const WEBHOOK_SECRET: &str = "whsec_integration_k3yQ9";
/// Identity base URL used by [`test_config`].
pub const IDENTITY_BASE: &str = "https://site.test/.netlify/identity";
/// Stripe API base used by [`test_config`].
pub const STRIPE_BASE: &str = "https://stripe.test/v1";
/// Identity admin token used by [`test_config`].
pub const ADMIN_TOKEN: &str = "identity-admin-t0ken";
/// Stripe API key used when the price gate is enabled.
pub const STRIPE_KEY: &str = "sk_test_gate_8Hq2";

/// Transport that answers from a queue and records every request.
///
/// Running out of queued responses yields a transport error, which makes an
/// unexpected extra call show up as a 502 in the test.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Create a transport with no queued responses.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response with a JSON body.
    pub fn respond(&self, status: u16, body: &Value) {
        self.push(Ok(HttpResponse::new(status, body.to_string())));
    }

    /// Queue a response with a raw text body.
    pub fn respond_text(&self, status: u16, body: &str) {
        self.push(Ok(HttpResponse::new(status, body)));
    }

    /// Queue a failure with no HTTP status.
    pub fn fail(&self, message: &str) {
        self.push(Err(TransportError::Request(message.to_string())));
    }

    /// Requests sent so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    fn push(&self, response: Result<HttpResponse, TransportError>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let description = format!("{} {}", request.method, request.url);
        self.requests.lock().expect("requests lock").push(request);

        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Request(format!(
                    "no scripted response for {description}"
                )))
            })
    }
}

/// Configuration pointing at the test hosts.
///
/// `allowed_prices` is a comma-separated allow-list; `with_stripe_key`
/// decides whether the gate has an API key to fetch line items with.
#[must_use]
pub fn test_config(allowed_prices: &str, with_stripe_key: bool) -> WebhookConfig {
    WebhookConfig {
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 0,
        stripe: StripeConfig {
            webhook_secret: SecretString::from(WEBHOOK_SECRET),
            secret_key: with_stripe_key.then(|| SecretString::from(STRIPE_KEY)),
            allowed_price_ids: parse_price_ids(allowed_prices),
            api_base: STRIPE_BASE.to_string(),
            tolerance: Duration::from_secs(300),
        },
        identity: IdentityConfig {
            base_url: IDENTITY_BASE.to_string(),
            admin_token: SecretString::from(ADMIN_TOKEN),
        },
        http_timeout: Duration::from_secs(5),
        json_logs: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Router wired to `transport`, ready for `oneshot`.
#[must_use]
pub fn test_app(config: &WebhookConfig, transport: Arc<ScriptedTransport>) -> Router {
    let state = AppState::with_transport(config, transport);
    routes::routes().with_state(state)
}

/// Stripe-style `Stripe-Signature` header for `body` signed `age_secs` ago.
#[must_use]
pub fn signature_for(secret: &str, body: &str, age_secs: i64) -> String {
    let verifier = WebhookVerifier::new(SecretString::from(secret), Duration::from_secs(300));
    let timestamp = chrono::Utc::now().timestamp() - age_secs;
    verifier
        .sign(timestamp, body.as_bytes())
        .expect("HMAC accepts any key length")
}

/// A `POST /webhooks/stripe` request signed with [`WEBHOOK_SECRET`].
#[must_use]
pub fn signed_delivery(body: &str) -> Request<Body> {
    delivery("/webhooks/stripe", body, Some(&signature_for(WEBHOOK_SECRET, body, 0)))
}

/// A `POST` to `path` with an optional signature header.
#[must_use]
pub fn delivery(path: &str, body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");

    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }

    builder
        .body(Body::from(body.to_owned()))
        .expect("valid request")
}

/// Event JSON of `kind` wrapping `object`.
#[must_use]
pub fn event_json(kind: &str, object: &Value) -> String {
    serde_json::json!({
        "id": "evt_test_1",
        "object": "event",
        "type": kind,
        "livemode": false,
        "data": { "object": object }
    })
    .to_string()
}

/// `checkout.session.completed` event for a session paid by `email`.
#[must_use]
pub fn checkout_completed(email: &str) -> String {
    event_json(
        "checkout.session.completed",
        &serde_json::json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "customer_details": { "email": email },
            "customer_email": null,
            "metadata": {}
        }),
    )
}

/// Status and body text of a response.
pub async fn read_response(response: Response<Body>) -> (u16, String) {
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// Request body parsed as JSON.
#[must_use]
pub fn body_json(request: &HttpRequest) -> Value {
    let body = request.body.as_deref().expect("request has a body");
    serde_json::from_str(body).expect("request body is JSON")
}

/// Sorted `app_metadata.roles` from a request body.
#[must_use]
pub fn sent_roles(request: &HttpRequest) -> Vec<String> {
    let mut roles: Vec<String> = body_json(request)["app_metadata"]["roles"]
        .as_array()
        .expect("roles array")
        .iter()
        .map(|r| r.as_str().expect("string role").to_owned())
        .collect();
    roles.sort();
    roles
}
