//! Caller identity produced by a successful token validation.

use serde::{Deserialize, Serialize};

/// Validated caller identity.
///
/// Produced fresh for every validated token and never cached across tokens.
/// Serializes as
/// `{user_id, roles, department, scopes, preferred_username}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_id: String,
    roles: Vec<String>,
    department: Option<String>,
    scopes: Vec<String>,
    preferred_username: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn builder(user_id: impl Into<String>) -> IdentityBuilder {
        IdentityBuilder {
            identity: Self {
                user_id: user_id.into(),
                roles: Vec::new(),
                department: None,
                scopes: Vec::new(),
                preferred_username: None,
            },
        }
    }

    /// Canonical user id (stable subject preferred over the pairwise one).
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    #[must_use]
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Display name. For presentation only, never for authorization.
    #[must_use]
    pub fn preferred_username(&self) -> Option<&str> {
        self.preferred_username.as_deref()
    }

    /// Returns a copy of this identity carrying `roles` instead of its own.
    #[must_use]
    pub fn with_roles(&self, roles: Vec<String>) -> Self {
        Self {
            roles,
            ..self.clone()
        }
    }
}

pub struct IdentityBuilder {
    identity: Identity,
}

impl IdentityBuilder {
    #[must_use]
    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.identity.roles = roles;
        self
    }

    #[must_use]
    pub fn department(mut self, department: Option<String>) -> Self {
        self.identity.department = department;
        self
    }

    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.identity.scopes = scopes;
        self
    }

    #[must_use]
    pub fn preferred_username(mut self, name: Option<String>) -> Self {
        self.identity.preferred_username = name;
        self
    }

    #[must_use]
    pub fn build(self) -> Identity {
        self.identity
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_wire_shape() {
        let identity = Identity::builder("oid-1")
            .roles(vec!["reader".to_owned()])
            .scopes(vec!["User.Read".to_owned()])
            .build();

        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "user_id": "oid-1",
                "roles": ["reader"],
                "department": null,
                "scopes": ["User.Read"],
                "preferred_username": null,
            })
        );
    }

    #[test]
    fn with_roles_keeps_other_fields() {
        let identity = Identity::builder("oid-1")
            .department(Some("IT".to_owned()))
            .preferred_username(Some("ed@example.com".to_owned()))
            .build();

        let upgraded = identity.with_roles(vec!["employee".to_owned()]);
        assert_eq!(upgraded.roles(), ["employee"]);
        assert_eq!(upgraded.department(), Some("IT"));
        assert_eq!(upgraded.preferred_username(), Some("ed@example.com"));
        assert!(identity.roles().is_empty());
    }
}
