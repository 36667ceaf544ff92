//! Builds the per-request [`AuthzContext`].

use std::sync::Arc;

use gatekit_security::AuthzContext;

use crate::error::AuthzError;
use crate::overrides::OverrideRegistry;
use crate::route_policy::{EffectiveRoutePolicy, SecurityPolicy};
use crate::user::ResolvedUser;

/// Resolves the effective policy for a request and turns a resolved user
/// into an immutable [`AuthzContext`].
#[derive(Debug, Clone)]
pub struct AuthorizationContextBuilder {
    policy: Arc<SecurityPolicy>,
    overrides: Arc<OverrideRegistry>,
}

impl AuthorizationContextBuilder {
    #[must_use]
    pub fn new(policy: Arc<SecurityPolicy>, overrides: Arc<OverrideRegistry>) -> Self {
        Self { policy, overrides }
    }

    #[must_use]
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Route policy merged with the handler override for `operation_id`.
    #[must_use]
    pub fn effective_policy(
        &self,
        method: &str,
        path: &str,
        operation_id: Option<&str>,
    ) -> EffectiveRoutePolicy {
        let route = self.policy.match_route(path, method);
        self.overrides.apply(route, operation_id)
    }

    /// Build the context for `policy`.
    ///
    /// Returns `Ok(None)` when the request needs no authentication.
    ///
    /// # Errors
    ///
    /// - [`AuthzError::Unauthenticated`] if auth is required and there is no
    ///   active user.
    /// - [`AuthzError::Forbidden`] if required roles are set and the user
    ///   holds none of them.
    pub fn build(
        &self,
        policy: &EffectiveRoutePolicy,
        user: Option<&ResolvedUser>,
    ) -> Result<Option<AuthzContext>, AuthzError> {
        if !policy.auth_required {
            return Ok(None);
        }

        let user = user.ok_or(AuthzError::unauthenticated("no_identity"))?;
        if !user.active {
            return Err(AuthzError::unauthenticated("inactive_user"));
        }

        if !policy.required_roles.is_empty() && policy.required_roles.is_disjoint(&user.roles) {
            tracing::debug!(
                user_id = %user.user_id,
                required = ?policy.required_roles,
                "role gate denied"
            );
            return Err(AuthzError::Forbidden {
                required: policy.required_roles.iter().cloned().collect(),
            });
        }

        let permissions = self.policy.capabilities_for(&user.roles);
        Ok(Some(AuthzContext::new(
            user.user_id.clone(),
            user.department.clone(),
            user.roles.clone(),
            permissions,
            policy.scoping,
        )))
    }
}
