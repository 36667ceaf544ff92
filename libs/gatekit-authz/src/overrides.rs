//! Handler-level requirements registered out of band, keyed by a stable
//! operation id, and merged with the path-based policy.

use std::collections::{BTreeSet, HashMap};

use gatekit_security::ScopingFlags;

use crate::route_policy::EffectiveRoutePolicy;

/// Extra requirements attached to one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOverride {
    required_roles: BTreeSet<String>,
    scoping: ScopingFlags,
}

impl HandlerOverride {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn require_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn filter_by_department(mut self) -> Self {
        self.scoping.filter_by_department = true;
        self
    }

    #[must_use]
    pub fn require_sensitive_permission(mut self) -> Self {
        self.scoping.require_sensitive_permission = true;
        self
    }

    #[must_use]
    pub fn required_roles(&self) -> &BTreeSet<String> {
        &self.required_roles
    }

    #[must_use]
    pub fn scoping(&self) -> ScopingFlags {
        self.scoping
    }

    /// Any role or scoping requirement implies authentication.
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        !self.required_roles.is_empty()
            || self.scoping.filter_by_department
            || self.scoping.require_sensitive_permission
    }

    #[must_use]
    fn union(mut self, other: Self) -> Self {
        self.required_roles.extend(other.required_roles);
        self.scoping = self.scoping.union(other.scoping);
        self
    }
}

impl EffectiveRoutePolicy {
    /// Merge a handler override: roles are unioned, flags OR-ed.
    #[must_use]
    pub fn merged_with(mut self, handler: &HandlerOverride) -> Self {
        self.auth_required = self.auth_required || handler.requires_auth();
        self.required_roles
            .extend(handler.required_roles.iter().cloned());
        self.scoping = self.scoping.union(handler.scoping);
        self
    }
}

/// Side-table of overrides keyed by operation id.
#[derive(Debug, Default)]
pub struct OverrideRegistry {
    entries: HashMap<String, HandlerOverride>,
}

impl OverrideRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register requirements for `operation_id`. Registering the same id
    /// twice accumulates both.
    pub fn register(&mut self, operation_id: impl Into<String>, handler: HandlerOverride) {
        let entry = self.entries.entry(operation_id.into()).or_default();
        *entry = std::mem::take(entry).union(handler);
    }

    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<&HandlerOverride> {
        self.entries.get(operation_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the override registered for `operation_id`, if any.
    #[must_use]
    pub fn apply(&self, policy: EffectiveRoutePolicy, operation_id: Option<&str>) -> EffectiveRoutePolicy {
        match operation_id.and_then(|id| self.get(id)) {
            Some(handler) => policy.merged_with(handler),
            None => policy,
        }
    }
}
