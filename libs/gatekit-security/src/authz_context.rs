//! Per-request authorization context.

use std::collections::BTreeSet;

use serde::Serialize;

/// Well-known capability names granted to roles by configuration.
pub mod capabilities {
    /// Lifts department scoping.
    pub const VIEW_CROSS_DEPARTMENT: &str = "view_cross_department";

    /// Lifts sensitivity scoping.
    pub const VIEW_SENSITIVE_DATA: &str = "view_sensitive_data";
}

/// Which row-level scopes the matched route (and handler overrides) asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScopingFlags {
    pub filter_by_department: bool,
    pub require_sensitive_permission: bool,
}

impl ScopingFlags {
    /// Logical OR of both flag sets (most restrictive wins).
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            filter_by_department: self.filter_by_department || other.filter_by_department,
            require_sensitive_permission: self.require_sensitive_permission
                || other.require_sensitive_permission,
        }
    }
}

/// Capabilities derived from the caller's permission set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_view_cross_department: bool,
    pub can_view_sensitive_data: bool,
}

impl Capabilities {
    fn from_permissions(permissions: &BTreeSet<String>) -> Self {
        Self {
            can_view_cross_department: permissions.contains(capabilities::VIEW_CROSS_DEPARTMENT),
            can_view_sensitive_data: permissions.contains(capabilities::VIEW_SENSITIVE_DATA),
        }
    }
}

/// Immutable authorization context built at most once per request.
///
/// Capabilities are always derived from `permissions`; they cannot be set
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthzContext {
    user_id: String,
    department: Option<String>,
    roles: BTreeSet<String>,
    permissions: BTreeSet<String>,
    scoping: ScopingFlags,
    capabilities: Capabilities,
}

impl AuthzContext {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        department: Option<String>,
        roles: BTreeSet<String>,
        permissions: BTreeSet<String>,
        scoping: ScopingFlags,
    ) -> Self {
        let capabilities = Capabilities::from_permissions(&permissions);
        Self {
            user_id: user_id.into(),
            department,
            roles,
            permissions,
            scoping,
            capabilities,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    #[must_use]
    pub fn scoping(&self) -> ScopingFlags {
        self.scoping
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Department filter is requested and not lifted by a capability.
    #[must_use]
    pub fn applies_department_filter(&self) -> bool {
        self.scoping.filter_by_department && !self.capabilities.can_view_cross_department
    }

    /// Sensitivity filter is requested and not lifted by a capability.
    #[must_use]
    pub fn applies_sensitivity_filter(&self) -> bool {
        self.scoping.require_sensitive_permission && !self.capabilities.can_view_sensitive_data
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn capabilities_follow_permission_set() {
        let ctx = AuthzContext::new(
            "u1",
            Some("HR".to_owned()),
            set(&["hr_manager"]),
            set(&[capabilities::VIEW_CROSS_DEPARTMENT]),
            ScopingFlags {
                filter_by_department: true,
                require_sensitive_permission: true,
            },
        );

        assert!(ctx.capabilities().can_view_cross_department);
        assert!(!ctx.capabilities().can_view_sensitive_data);
        assert!(!ctx.applies_department_filter());
        assert!(ctx.applies_sensitivity_filter());
    }

    #[test]
    fn flags_union_is_logical_or() {
        let route = ScopingFlags {
            filter_by_department: true,
            require_sensitive_permission: false,
        };
        let handler = ScopingFlags {
            filter_by_department: false,
            require_sensitive_permission: true,
        };
        let merged = route.union(handler);
        assert!(merged.filter_by_department);
        assert!(merged.require_sensitive_permission);
    }
}
