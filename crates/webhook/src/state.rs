//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::WebhookConfig;
use crate::http::{HttpTransport, ReqwestTransport, TransportError};
use crate::identity::IdentityClient;
use crate::provisioning::{PriceGate, Provisioner};
use crate::stripe::{StripeClient, WebhookVerifier};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Everything inside is immutable, so
/// concurrent deliveries never share mutable state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    verifier: WebhookVerifier,
    provisioner: Provisioner,
}

impl AppState {
    /// Create state that talks to the real APIs over `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &WebhookConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.http_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create state whose outbound calls all go through `transport`.
    #[must_use]
    pub fn with_transport(config: &WebhookConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let verifier = WebhookVerifier::new(
            config.stripe.webhook_secret.clone(),
            config.stripe.tolerance,
        );

        let price_gate = config.stripe.price_gate_key().map(|key| {
            let stripe = StripeClient::new(
                Arc::clone(&transport),
                config.stripe.api_base.clone(),
                key.clone(),
            );
            PriceGate::new(stripe, config.stripe.allowed_price_ids.clone())
        });

        if price_gate.is_none() {
            tracing::info!("Price allow-list disabled; every completed checkout is provisioned");
        }

        let identity = IdentityClient::new(
            transport,
            config.identity.base_url.clone(),
            config.identity.admin_token.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                verifier,
                provisioner: Provisioner::new(identity, price_gate),
            }),
        }
    }

    /// Get a reference to the signature verifier.
    #[must_use]
    pub fn verifier(&self) -> &WebhookVerifier {
        &self.inner.verifier
    }

    /// Get a reference to the provisioning service.
    #[must_use]
    pub fn provisioner(&self) -> &Provisioner {
        &self.inner.provisioner
    }
}
