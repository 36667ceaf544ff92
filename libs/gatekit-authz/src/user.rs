//! Mapping a validated identity to the user record authorization runs on.

use std::collections::BTreeSet;

use async_trait::async_trait;
use gatekit_security::Identity;

use crate::error::AuthzError;

/// The user behind a request, as far as authorization is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUser {
    pub user_id: String,
    pub department: Option<String>,
    pub roles: BTreeSet<String>,
    pub active: bool,
}

impl ResolvedUser {
    #[must_use]
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id().to_owned(),
            department: identity.department().map(str::to_owned),
            roles: identity.roles().iter().cloned().collect(),
            active: true,
        }
    }
}

/// Looks up the user record for a validated identity.
///
/// `Ok(None)` means the user is unknown; callers treat it, like an inactive
/// user, as unauthenticated.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns [`AuthzError`] if the backing directory cannot be queried.
    async fn resolve(&self, identity: &Identity) -> Result<Option<ResolvedUser>, AuthzError>;
}

/// Uses the token claims as the user record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsUserResolver;

#[async_trait]
impl UserResolver for ClaimsUserResolver {
    async fn resolve(&self, identity: &Identity) -> Result<Option<ResolvedUser>, AuthzError> {
        Ok(Some(ResolvedUser::from_identity(identity)))
    }
}
