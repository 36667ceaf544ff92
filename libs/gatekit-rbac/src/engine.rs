use std::collections::BTreeSet;
use std::path::Path;

use crate::config::{RbacConfig, load_rbac_config};
use crate::error::ConfigError;
use crate::resolver::{EffectivePermissions, compute_effective};

/// Permission-oriented access decisions over a loaded policy.
///
/// Built once at startup; every method is a read over immutable state and
/// is safe to call concurrently without locking.
#[derive(Debug)]
pub struct RbacEngine {
    config: RbacConfig,
    effective: EffectivePermissions,
}

impl RbacEngine {
    /// Resolve effective permissions for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the inheritance graph is inconsistent.
    pub fn new(config: RbacConfig) -> Result<Self, ConfigError> {
        let effective = compute_effective(&config)?;
        Ok(Self { config, effective })
    }

    /// Load a policy file and build an engine from it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O or validation failure.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::new(load_rbac_config(path)?)
    }

    #[must_use]
    pub fn config(&self) -> &RbacConfig {
        &self.config
    }

    /// Whether any public rule (top-level or from a public permission) matches.
    #[must_use]
    pub fn is_public(&self, method: &str, path: &str) -> bool {
        self.config
            .all_public_rules()
            .any(|rule| rule.matches(method, path))
    }

    /// Names of the permissions having at least one rule matching the request.
    #[must_use]
    pub fn required_permissions(&self, method: &str, path: &str) -> BTreeSet<&str> {
        self.config
            .permissions()
            .values()
            .filter(|perm| perm.rules.iter().any(|rule| rule.matches(method, path)))
            .map(|perm| perm.name.as_str())
            .collect()
    }

    /// Memoized effective permissions of `role`, or `None` for an unknown role.
    #[must_use]
    pub fn effective_permissions(&self, role: &str) -> Option<&BTreeSet<String>> {
        self.effective.get(role)
    }

    /// Decide whether a caller holding `roles` may perform `method path`.
    ///
    /// Public rules allow unconditionally. Otherwise a request no permission
    /// rule matches is denied, and unknown role names contribute nothing.
    #[must_use]
    pub fn is_allowed<I, S>(&self, roles: I, method: &str, path: &str) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.is_public(method, path) {
            tracing::debug!(method, path, "RBAC: public rule matched");
            return true;
        }

        let required = self.required_permissions(method, path);
        if required.is_empty() {
            tracing::debug!(method, path, "RBAC: no rule matches, denying");
            return false;
        }

        let mut granted: BTreeSet<&str> = BTreeSet::new();
        for role in roles {
            let role = role.as_ref();
            match self.effective.get(role) {
                Some(perms) => granted.extend(perms.iter().map(String::as_str)),
                None => tracing::debug!(role, "RBAC: unknown role ignored"),
            }
        }

        let allowed = !required.is_disjoint(&granted);
        tracing::debug!(
            method,
            path,
            ?required,
            allowed,
            "RBAC decision"
        );
        allowed
    }
}
