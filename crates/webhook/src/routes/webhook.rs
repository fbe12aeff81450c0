//! Stripe webhook handler.
//!
//! Handles `checkout.session.completed` deliveries and acknowledges all
//! other event types.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::stripe::SIGNATURE_HEADER;
use crate::state::AppState;

/// Create Stripe webhook routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/stripe", post(handle_stripe_event))
        .route("/.netlify/functions/stripe-webhook", post(handle_stripe_event))
}

/// Handle a Stripe webhook delivery.
///
/// The body is taken as raw bytes: the signature covers the exact bytes
/// Stripe sent, so it must be verified before anything parses it.
///
/// Provisioning results, including rejected invites and updates, are
/// answered with 200 so Stripe does not redeliver. Only signature failures
/// (400) and unreachable upstreams (502) are errors.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
async fn handle_stripe_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let event = state.verifier().construct_event(&body, signature)?;

    let outcome = state.provisioner().handle_event(&event).await?;

    info!(
        event_id = ?event.id,
        kind = %event.kind,
        outcome = outcome.label(),
        "Stripe event handled"
    );

    Ok((StatusCode::OK, outcome.to_string()))
}
