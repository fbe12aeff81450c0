//! Turns a verified Stripe event into identity roles.
//!
//! Per event, strictly in order:
//!
//! 1. Anything but `checkout.session.completed` is ignored
//! 2. The buyer's email is resolved from the session
//! 3. With a price allow-list configured, line items must contain an allowed price
//! 4. The identity account is looked up by email
//! 5. Missing account: invite with the membership roles.
//!    Existing account: union its roles with the membership roles and save.
//!
//! Nothing is cached between events. Two deliveries for the same email that
//! overlap can both see "no account" and both invite, or both read the old
//! roles and race on the update. The identity service is the only place
//! that could serialize them.

use std::fmt;

use serde_json::{Value, json};
use subscriber_sync_core::{Email, PriceId, RoleSet};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::http::HttpResponse;
use crate::identity::{IdentityClient, IdentityUser};
use crate::stripe::{CheckoutSession, Event, LINE_ITEM_PAGE_LIMIT, StripeClient};

/// Result of handling one event. `Display` renders the response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Event type is not handled.
    Ignored,
    /// Session carried no usable email.
    NoEmail,
    /// Price allow-list is active and no line item matched.
    NotSubscriberProduct,
    /// Invite was sent; `response` is the identity service's reply.
    Invited {
        email: Email,
        status: u16,
        success: bool,
        response: Value,
    },
    /// Roles were written back; `roles` echoes the stored roles, if returned.
    Updated {
        email: Email,
        status: u16,
        success: bool,
        roles: Option<Value>,
    },
}

impl Outcome {
    fn invited(email: Email, response: &HttpResponse) -> Self {
        Self::Invited {
            email,
            status: response.status,
            success: response.is_success(),
            response: response.json_or_text(),
        }
    }

    fn updated(email: Email, response: &HttpResponse) -> Self {
        let roles = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| body.get("app_metadata")?.get("roles").cloned());

        Self::Updated {
            email,
            status: response.status,
            success: response.is_success(),
            roles,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::NoEmail => "no_email",
            Self::NotSubscriberProduct => "not_subscriber_product",
            Self::Invited { success: true, .. } => "invited",
            Self::Invited { success: false, .. } => "invite_error",
            Self::Updated { success: true, .. } => "updated",
            Self::Updated { success: false, .. } => "update_error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignored => f.write_str("ignored"),
            Self::NoEmail => f.write_str("No email on session; skipping"),
            Self::NotSubscriberProduct => f.write_str("Not a subscriber product; ignoring"),
            Self::Invited {
                email,
                status,
                success,
                response,
            } => {
                if *success {
                    write!(f, "invited:{email} {response}")
                } else {
                    write!(f, "invite_error:{status}:{email} {response}")
                }
            }
            Self::Updated {
                email,
                status,
                success,
                roles,
            } => {
                let echo = roles
                    .as_ref()
                    .map_or_else(|| json!({}), |roles| json!({ "roles": roles }));
                if *success {
                    write!(f, "updated:{email} {echo}")
                } else {
                    write!(f, "update_error:{status}:{email} {echo}")
                }
            }
        }
    }
}

/// Restricts provisioning to purchases of allow-listed prices.
#[derive(Debug, Clone)]
pub struct PriceGate {
    stripe: StripeClient,
    allowed: Vec<PriceId>,
}

impl PriceGate {
    /// Create a gate over a non-empty allow-list.
    #[must_use]
    pub const fn new(stripe: StripeClient, allowed: Vec<PriceId>) -> Self {
        Self { stripe, allowed }
    }

    /// Returns `true` if one of the first [`LINE_ITEM_PAGE_LIMIT`] line items
    /// is allow-listed.
    ///
    /// # Errors
    ///
    /// Returns error if line items cannot be fetched.
    pub async fn admits(&self, session: &CheckoutSession) -> Result<bool> {
        let Some(session_id) = &session.id else {
            warn!("Checkout session has no id; cannot check line items");
            return Ok(false);
        };

        let items = self.stripe.list_line_items(session_id).await?;
        let admitted = items.data.iter().any(|item| item.matches_any(&self.allowed));

        if !admitted && items.has_more {
            warn!(
                session_id = %session_id,
                limit = LINE_ITEM_PAGE_LIMIT,
                "No allowed price in first page of line items; later pages not checked"
            );
        }

        Ok(admitted)
    }
}

/// Provisions identity roles for completed checkouts.
#[derive(Debug, Clone)]
pub struct Provisioner {
    identity: IdentityClient,
    price_gate: Option<PriceGate>,
    roles: RoleSet,
}

impl Provisioner {
    /// Create a provisioner granting the membership roles.
    #[must_use]
    pub fn new(identity: IdentityClient, price_gate: Option<PriceGate>) -> Self {
        Self {
            identity,
            price_gate,
            roles: RoleSet::membership(),
        }
    }

    /// Handle one verified event.
    ///
    /// # Errors
    ///
    /// Returns error if line items or the identity lookup fail, or if an
    /// invite/update gets no response at all. Non-success statuses from the
    /// invite and update calls are reported in the [`Outcome`] instead.
    #[instrument(skip(self, event), fields(event_id = ?event.id, kind = %event.kind))]
    pub async fn handle_event(&self, event: &Event) -> Result<Outcome> {
        if !event.is_checkout_completed() {
            return Ok(Outcome::Ignored);
        }

        let session = event.checkout_session();

        let Some(email) = session.resolve_email() else {
            warn!(session_id = ?session.id, "No email on checkout session");
            return Ok(Outcome::NoEmail);
        };

        if let Some(gate) = &self.price_gate
            && !gate.admits(&session).await?
        {
            info!(email = %email, "Checkout is not for a subscriber product");
            return Ok(Outcome::NotSubscriberProduct);
        }

        match self.identity.find_user_by_email(&email).await? {
            None => self.invite(email).await,
            Some(user) => self.grant(email, &user).await,
        }
    }

    async fn invite(&self, email: Email) -> Result<Outcome> {
        let response = self.identity.invite_user(&email, &self.roles).await?;
        let outcome = Outcome::invited(email, &response);

        if response.is_success() {
            info!(outcome = outcome.label(), "Invited new member");
        } else {
            warn!(status = response.status, body = %response.body, "Identity invite rejected");
        }

        Ok(outcome)
    }

    async fn grant(&self, email: Email, user: &IdentityUser) -> Result<Outcome> {
        let roles = user.roles().union(&self.roles);
        let response = self.identity.update_roles(&user.id, &roles).await?;
        let outcome = Outcome::updated(email, &response);

        if response.is_success() {
            info!(user_id = %user.id, outcome = outcome.label(), "Granted membership roles");
        } else {
            warn!(
                user_id = %user.id,
                status = response.status,
                body = %response.body,
                "Identity role update rejected"
            );
        }

        Ok(outcome)
    }
}
