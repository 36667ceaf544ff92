use std::sync::Arc;

use async_trait::async_trait;
use gatekit_security::Identity;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;

use crate::errors::{TransportError, ValidationError};

/// Validates bearer tokens and produces the caller identity.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the token is rejected for any reason.
    async fn validate(&self, token: &str) -> Result<Identity, ValidationError>;
}

/// Resolves signature verification keys by key id.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// `Ok(None)` means the key id is unknown even after any refresh the
    /// provider is willing to perform.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the key set cannot be fetched.
    async fn get_key(&self, kid: &str) -> Result<Option<Arc<DecodingKey>>, TransportError>;
}

/// Where a published key set comes from.
#[async_trait]
pub trait JwksSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`TransportError`] on network or decoding failure.
    async fn fetch(&self) -> Result<JwkSet, TransportError>;
}

/// Out-of-band role lookup for identities whose token carries no roles.
///
/// Implementations never fail: any problem yields an empty list.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn lookup_roles(&self, subject_id: &str) -> Vec<String>;
}
