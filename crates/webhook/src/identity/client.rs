//! Identity admin API client.

use std::sync::Arc;

use reqwest::Method;
use secrecy::SecretString;
use subscriber_sync_core::{Email, IdentityUserId, RoleSet};
use tracing::{debug, error, instrument};

use super::error::IdentityError;
use super::types::{AppMetadataRoles, IdentityUser, InviteRequest, UpdateRolesRequest, UserList};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

/// Identity admin API client.
#[derive(Clone)]
pub struct IdentityClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    admin_token: SecretString,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url)
            .field("admin_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl IdentityClient {
    /// Create a client for an identity base URL such as
    /// `https://site.example/.netlify/identity`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        admin_token: SecretString,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            admin_token,
        }
    }

    /// Find the account registered under `email`.
    ///
    /// Returns `Ok(None)` only when the service answered successfully with
    /// no matching user.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the service answers with a
    /// non-success status, or the body is not a user list.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        let url = format!(
            "{}/admin/users?email={}",
            self.base_url,
            urlencoding::encode(email.as_str())
        );

        let request = HttpRequest::new(Method::GET, url).bearer(&self.admin_token);
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            error!(status = response.status, "Identity API error looking up user");
            return Err(IdentityError::Lookup {
                status: response.status,
                message: response.body,
            });
        }

        let users: UserList = serde_json::from_str(&response.body)
            .map_err(|e| IdentityError::Response(e.to_string()))?;
        let user = users.into_first();

        debug!(found = user.is_some(), "Identity lookup complete");

        Ok(user)
    }

    /// Invite a new user with `roles`.
    ///
    /// Any HTTP status is returned to the caller as-is.
    ///
    /// # Errors
    ///
    /// Returns error only if no response was received.
    #[instrument(skip(self, roles), fields(email = %email))]
    pub async fn invite_user(
        &self,
        email: &Email,
        roles: &RoleSet,
    ) -> Result<HttpResponse, IdentityError> {
        let body = InviteRequest {
            email,
            invite: true,
            app_metadata: AppMetadataRoles { roles },
        };

        let request = HttpRequest::new(Method::POST, format!("{}/admin/users", self.base_url))
            .bearer(&self.admin_token)
            .json(&body)?;

        let response = self.transport.send(request).await?;
        debug!(status = response.status, "Identity invite sent");

        Ok(response)
    }

    /// Replace a user's `app_metadata.roles`.
    ///
    /// Any HTTP status is returned to the caller as-is.
    ///
    /// # Errors
    ///
    /// Returns error only if no response was received.
    #[instrument(skip(self, roles), fields(user_id = %user_id))]
    pub async fn update_roles(
        &self,
        user_id: &IdentityUserId,
        roles: &RoleSet,
    ) -> Result<HttpResponse, IdentityError> {
        let body = UpdateRolesRequest {
            app_metadata: AppMetadataRoles { roles },
        };

        let url = format!(
            "{}/admin/users/{}",
            self.base_url,
            urlencoding::encode(user_id.as_str())
        );
        let request = HttpRequest::new(Method::PUT, url)
            .bearer(&self.admin_token)
            .json(&body)?;

        let response = self.transport.send(request).await?;
        debug!(status = response.status, "Identity roles updated");

        Ok(response)
    }
}
