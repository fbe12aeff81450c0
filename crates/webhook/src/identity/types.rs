//! Identity admin API types.

use serde::{Deserialize, Serialize};
use subscriber_sync_core::{Email, IdentityUserId, Role, RoleSet};

/// A user record as returned by the admin API.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: IdentityUserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Option<serde_json::Value>,
}

impl IdentityUser {
    /// Roles currently stored on the account.
    ///
    /// A missing or non-array `roles` value counts as no roles, and
    /// non-string entries are dropped.
    #[must_use]
    pub fn roles(&self) -> RoleSet {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("roles"))
            .and_then(serde_json::Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(Role::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Body of `GET /admin/users`.
///
/// GoTrue wraps the list in `{"users": [...]}`; older deployments and
/// proxies return a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserList {
    Bare(Vec<IdentityUser>),
    Wrapped { users: Vec<IdentityUser> },
}

impl UserList {
    /// The first listed user, if any.
    #[must_use]
    pub fn into_first(self) -> Option<IdentityUser> {
        match self {
            Self::Bare(users) | Self::Wrapped { users } => users.into_iter().next(),
        }
    }
}

/// `app_metadata` payload carrying roles.
#[derive(Debug, Clone, Serialize)]
pub struct AppMetadataRoles<'a> {
    pub roles: &'a RoleSet,
}

/// Body of `POST /admin/users`.
#[derive(Debug, Clone, Serialize)]
pub struct InviteRequest<'a> {
    pub email: &'a Email,
    pub invite: bool,
    pub app_metadata: AppMetadataRoles<'a>,
}

/// Body of `PUT /admin/users/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRolesRequest<'a> {
    pub app_metadata: AppMetadataRoles<'a>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(app_metadata: serde_json::Value) -> IdentityUser {
        serde_json::from_value(json!({"id": "u1", "app_metadata": app_metadata})).unwrap()
    }

    #[test]
    fn test_roles_from_metadata() {
        let roles = user(json!({"roles": ["alpha", "beta", "alpha"]})).roles();
        assert_eq!(roles, RoleSet::from_iter(["alpha", "beta"]));
    }

    #[test]
    fn test_roles_tolerates_bad_shapes() {
        assert!(user(json!({})).roles().is_empty());
        assert!(user(json!({"roles": "admin"})).roles().is_empty());
        assert!(user(json!(null)).roles().is_empty());
        assert_eq!(
            user(json!({"roles": ["alpha", 7, null]})).roles(),
            RoleSet::from_iter(["alpha"])
        );
    }

    #[test]
    fn test_user_list_shapes() {
        let wrapped: UserList =
            serde_json::from_value(json!({"users": [{"id": "u1"}, {"id": "u2"}]})).unwrap();
        assert_eq!(wrapped.into_first().unwrap().id.as_str(), "u1");

        let bare: UserList = serde_json::from_value(json!([{"id": "u3"}])).unwrap();
        assert_eq!(bare.into_first().unwrap().id.as_str(), "u3");

        let empty: UserList = serde_json::from_value(json!([])).unwrap();
        assert!(empty.into_first().is_none());
    }

    #[test]
    fn test_invite_request_shape() {
        let email = Email::parse("a@example.com").unwrap();
        let roles = RoleSet::membership();
        let body = InviteRequest {
            email: &email,
            invite: true,
            app_metadata: AppMetadataRoles { roles: &roles },
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"email":"a@example.com","invite":true,"app_metadata":{"roles":["member","subscriber"]}}"#
        );
    }
}
