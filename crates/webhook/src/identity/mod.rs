//! Netlify Identity (GoTrue) admin API integration.
//!
//! This module provides:
//! - [`IdentityClient`] for looking up, inviting, and updating users
//! - User and request types limited to email and `app_metadata.roles`
//!
//! All calls authenticate with the admin bearer token.

mod client;
mod error;
mod types;

pub use client::IdentityClient;
pub use error::IdentityError;
pub use types::{AppMetadataRoles, IdentityUser, InviteRequest, UpdateRolesRequest, UserList};
