//! Role tags stored in identity `app_metadata`.
//!
//! Downstream systems gate access on these tags. A paid checkout must leave
//! the account with at least [`MEMBERSHIP_ROLES`].

use core::fmt;

use serde::{Deserialize, Serialize};

/// Roles granted to every account provisioned from a completed checkout.
pub const MEMBERSHIP_ROLES: [&str; 2] = ["member", "subscriber"];

/// A single role tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}

impl From<String> for Role {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

/// An unordered set of roles that serializes as a JSON array.
///
/// Insertion keeps the first-seen order so the array written back to the
/// identity service stays stable: existing roles first, new ones appended.
/// Duplicates collapse on insert, which makes [`RoleSet::union`] idempotent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    /// The fixed membership roles, in their canonical order.
    #[must_use]
    pub fn membership() -> Self {
        MEMBERSHIP_ROLES.into_iter().collect()
    }

    /// Insert a role. Returns `false` if it was already present.
    pub fn insert(&mut self, role: impl Into<Role>) -> bool {
        let role = role.into();
        if self.0.contains(&role) {
            return false;
        }
        self.0.push(role);
        true
    }

    /// Add every role of `other` that is not already present.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        for role in &other.0 {
            self.insert(role.clone());
        }
        self
    }

    /// Returns `true` if the set holds `role`.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r.as_str() == role)
    }

    /// Returns `true` if every role of `other` is in this set.
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        other.0.iter().all(|r| self.0.contains(r))
    }

    /// Number of distinct roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the roles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }
}

impl PartialEq for RoleSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_superset(other)
    }
}

impl Eq for RoleSet {}

impl<R: Into<Role>> FromIterator<R> for RoleSet {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut set = Self::default();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::slice::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Role>> for RoleSet {
    fn from(roles: Vec<Role>) -> Self {
        roles.into_iter().collect()
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.0
    }
}
