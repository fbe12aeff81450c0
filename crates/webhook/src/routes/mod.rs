//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                             - Liveness check
//! POST /webhooks/stripe                    - Stripe webhook deliveries
//! POST /.netlify/functions/stripe-webhook  - Same handler, legacy function path
//! ```

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod webhook;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(webhook::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check upstream APIs.
async fn health() -> &'static str {
    "ok"
}
