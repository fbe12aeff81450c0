//! Core types for Subscriber Sync.
//!
//! This module provides type-safe wrappers for the values that flow from a
//! checkout event into the identity service.

pub mod email;
pub mod id;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use role::{MEMBERSHIP_ROLES, Role, RoleSet};
