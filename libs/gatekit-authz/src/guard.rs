//! Request authorization pipeline.
//!
//! route match, override merge, bearer extraction, token validation, user
//! resolution, role gate, optional RBAC check, context, row scope.

use std::sync::Arc;

use gatekit_auth::TokenValidator;
use gatekit_rbac::RbacEngine;
use gatekit_security::{AccessScope, AuthzContext, Identity};
use http::{HeaderMap, Method};

use crate::context_builder::AuthorizationContextBuilder;
use crate::error::AuthzError;
use crate::route_policy::BearerSettings;
use crate::scoping::access_scope;
use crate::user::{ClaimsUserResolver, UserResolver};

/// Outcome of a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    /// `None` when the route needs no authentication.
    pub context: Option<AuthzContext>,
    pub identity: Option<Identity>,
    /// Row scope the data-access layer applies to reads.
    pub scope: AccessScope,
}

impl AccessDecision {
    fn anonymous() -> Self {
        Self {
            context: None,
            identity: None,
            scope: AccessScope::allow_all(),
        }
    }
}

/// Read the bearer credential from `headers`.
///
/// A missing or empty header is `Ok(None)`.
///
/// # Errors
///
/// Returns [`AuthzError::Unauthenticated`] if the header is not valid text,
/// lacks the configured prefix, or carries an empty token.
pub fn extract_bearer<'h>(
    headers: &'h HeaderMap,
    settings: &BearerSettings,
) -> Result<Option<&'h str>, AuthzError> {
    let Some(value) = headers.get(settings.authorization_header.as_str()) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| AuthzError::unauthenticated("malformed_header"))?;
    if raw.is_empty() {
        return Ok(None);
    }

    let token = raw
        .strip_prefix(settings.bearer_prefix.as_str())
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or(AuthzError::unauthenticated("wrong_scheme"))?
        .trim();
    if token.is_empty() {
        return Err(AuthzError::unauthenticated("empty_token"));
    }
    Ok(Some(token))
}

/// End-to-end request guard.
pub struct AccessGuard {
    builder: AuthorizationContextBuilder,
    validator: Arc<dyn TokenValidator>,
    users: Arc<dyn UserResolver>,
    rbac: Option<Arc<RbacEngine>>,
}

impl AccessGuard {
    /// Guard resolving users from token claims, without an RBAC engine.
    #[must_use]
    pub fn new(builder: AuthorizationContextBuilder, validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            builder,
            validator,
            users: Arc::new(ClaimsUserResolver),
            rbac: None,
        }
    }

    #[must_use]
    pub fn with_user_resolver(mut self, users: Arc<dyn UserResolver>) -> Self {
        self.users = users;
        self
    }

    /// Also require the RBAC engine to allow every authenticated request.
    #[must_use]
    pub fn with_rbac(mut self, engine: Arc<RbacEngine>) -> Self {
        self.rbac = Some(engine);
        self
    }

    #[must_use]
    pub fn builder(&self) -> &AuthorizationContextBuilder {
        &self.builder
    }

    /// Authorize one request.
    ///
    /// # Errors
    ///
    /// - [`AuthzError::Unauthenticated`] for a missing or rejected credential,
    ///   or an unknown or inactive user.
    /// - [`AuthzError::Forbidden`] if the role gate or the RBAC engine denies.
    /// - Whatever the configured [`UserResolver`] fails with.
    #[tracing::instrument(name = "authorize", skip_all, fields(method = %method, path = %path))]
    pub async fn authorize(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        operation_id: Option<&str>,
    ) -> Result<AccessDecision, AuthzError> {
        let policy = self
            .builder
            .effective_policy(method.as_str(), path, operation_id);
        if !policy.auth_required {
            tracing::trace!("no authentication required");
            return Ok(AccessDecision::anonymous());
        }

        let token = extract_bearer(headers, self.builder.policy().auth())?
            .ok_or(AuthzError::unauthenticated("missing_credentials"))?;

        let identity = self
            .validator
            .validate(token)
            .await
            .map_err(|err| AuthzError::unauthenticated(err.reason()))?;

        let user = self
            .users
            .resolve(&identity)
            .await?
            .ok_or(AuthzError::unauthenticated("unknown_user"))?;

        let context = self.builder.build(&policy, Some(&user))?;

        let rbac_denied = self
            .rbac
            .as_ref()
            .filter(|engine| !engine.is_allowed(&user.roles, method.as_str(), path));
        if let Some(engine) = rbac_denied {
            let required = engine
                .required_permissions(method.as_str(), path)
                .into_iter()
                .map(str::to_owned)
                .collect();
            return Err(AuthzError::Forbidden { required });
        }

        let scope = access_scope(context.as_ref());
        tracing::debug!(
            user_id = %user.user_id,
            scoped = !scope.is_unconstrained(),
            "request authorized"
        );
        Ok(AccessDecision {
            context,
            identity: Some(identity),
            scope,
        })
    }
}
