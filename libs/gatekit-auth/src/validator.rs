use std::sync::Arc;

use async_trait::async_trait;
use gatekit_security::Identity;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde_json::Value;

use crate::config::AuthConfig;
use crate::errors::{TransportError, ValidationError};
use crate::fallback::GraphRoleResolver;
use crate::http::build_client;
use crate::jwks::JwksCache;
use crate::standard_claims::{extract_identity, subject_id};
use crate::traits::{KeyProvider, RoleLookup, TokenValidator};

/// Validates signed bearer tokens against one tenant.
///
/// Checks, in order: header `kid`, signing key lookup (with a single forced
/// key-set refresh on an unknown `kid`), signature and algorithm, `exp` and
/// `nbf` within the clock-skew leeway, issuer and audience. Only then are
/// claims read.
pub struct JwtValidator {
    keys: Arc<dyn KeyProvider>,
    validation: Validation,
    role_fallback: Option<Arc<dyn RoleLookup>>,
}

impl JwtValidator {
    #[must_use]
    pub fn new(config: &AuthConfig, keys: Arc<dyn KeyProvider>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        if !config.algorithms.is_empty() {
            validation.algorithms.clone_from(&config.algorithms);
        }
        validation.set_issuer(&[config.issuer()]);
        validation.set_audience(&[config.expected_audience()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = config.clock_skew_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;

        Self {
            keys,
            validation,
            role_fallback: None,
        }
    }

    /// Resolve roles through `lookup` whenever a token carries none.
    #[must_use]
    pub fn with_role_fallback(mut self, lookup: Arc<dyn RoleLookup>) -> Self {
        self.role_fallback = Some(lookup);
        self
    }

    /// Wire the HTTP key cache, and the role fallback when enabled, from
    /// deployment settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the HTTP client cannot be built.
    pub fn from_config(config: &AuthConfig) -> Result<Self, TransportError> {
        let client = build_client(config.http_timeout())?;
        let keys = Arc::new(JwksCache::from_config(config, client.clone()));
        let validator = Self::new(config, keys);
        if config.fallback_enabled {
            let lookup = Arc::new(GraphRoleResolver::from_config(config, client));
            return Ok(validator.with_role_fallback(lookup));
        }
        Ok(validator)
    }

    async fn verify(&self, token: &str) -> Result<Value, ValidationError> {
        let header = decode_header(token).map_err(|_| ValidationError::MissingKeyId)?;
        let kid = header
            .kid
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingKeyId)?;

        let key = self
            .keys
            .get_key(kid)
            .await
            .map_err(ValidationError::KeySetUnavailable)?
            .ok_or(ValidationError::UnknownKey)?;

        let data = decode::<Value>(token, &key, &self.validation)?;
        Ok(data.claims)
    }
}

#[async_trait]
impl TokenValidator for JwtValidator {
    #[tracing::instrument(name = "validate_token", skip_all)]
    async fn validate(&self, token: &str) -> Result<Identity, ValidationError> {
        let claims = match self.verify(token).await {
            Ok(claims) => claims,
            Err(err) => {
                if let ValidationError::KeySetUnavailable(source) = &err {
                    tracing::warn!(error = %source, "signing key set unavailable");
                }
                tracing::info!(reason = err.reason(), "token rejected");
                return Err(err);
            }
        };

        let identity = extract_identity(&claims).inspect_err(|err| {
            tracing::info!(reason = err.reason(), "token rejected");
        })?;

        if !identity.roles().is_empty() {
            return Ok(identity);
        }
        let (Some(lookup), Some(subject)) = (&self.role_fallback, subject_id(&claims)) else {
            return Ok(identity);
        };

        let roles = lookup.lookup_roles(&subject).await;
        tracing::debug!(roles = roles.len(), "roles resolved through fallback");
        if roles.is_empty() {
            return Ok(identity);
        }
        Ok(identity.with_roles(roles))
    }
}
