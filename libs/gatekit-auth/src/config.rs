use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Environment variable prefix for [`AuthConfig::load`].
pub const ENV_PREFIX: &str = "GATEKIT_AUTH_";

#[derive(Debug, thiserror::Error)]
pub enum AuthConfigError {
    #[error("failed to load auth configuration: {0}")]
    Load(#[source] Box<figment::Error>),

    #[error("auth configuration requires `{0}`")]
    Missing(&'static str),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Identity-provider deployment settings.
///
/// Issuer, key-set and token endpoints are derived from `authority_host` and
/// `tenant_id`.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub tenant_id: String,
    pub client_id: String,
    /// Expected `aud`; falls back to `client_id` when unset or blank.
    pub audience: Option<String>,
    /// Only needed for the role fallback (client credentials).
    #[serde(deserialize_with = "deserialize_secret")]
    pub client_secret: Option<SecretString>,
    pub clock_skew_seconds: u64,
    pub jwks_cache_ttl_seconds: u64,
    pub fallback_enabled: bool,
    pub authority_host: String,
    pub graph_base_url: String,
    pub http_timeout_seconds: u64,
    pub algorithms: Vec<Algorithm>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            audience: None,
            client_secret: None,
            clock_skew_seconds: 120,
            jwks_cache_ttl_seconds: 3600,
            fallback_enabled: false,
            authority_host: "https://login.microsoftonline.com".to_owned(),
            graph_base_url: "https://graph.microsoft.com/v1.0".to_owned(),
            http_timeout_seconds: 10,
            algorithms: vec![Algorithm::RS256],
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

impl AuthConfig {
    /// Load from an optional YAML file overlaid with `GATEKIT_AUTH_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AuthConfigError`] if a source cannot be parsed or a
    /// required value is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, AuthConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        Self::from_figment(&figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract from an already assembled figment and validate.
    ///
    /// # Errors
    ///
    /// Returns [`AuthConfigError`] on extraction or validation failure.
    pub fn from_figment(figment: &Figment) -> Result<Self, AuthConfigError> {
        let config: Self = figment
            .extract()
            .map_err(|e| AuthConfigError::Load(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and URL shapes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), AuthConfigError> {
        if self.tenant_id.trim().is_empty() {
            return Err(AuthConfigError::Missing("tenant_id"));
        }
        if self.client_id.trim().is_empty() {
            return Err(AuthConfigError::Missing("client_id"));
        }
        if self.algorithms.is_empty() {
            return Err(AuthConfigError::Missing("algorithms"));
        }
        for (field, value) in [
            ("authority_host", &self.authority_host),
            ("graph_base_url", &self.graph_base_url),
        ] {
            url::Url::parse(value).map_err(|e| AuthConfigError::Invalid {
                field,
                reason: e.to_string(),
            })?;
        }
        if self.fallback_enabled && self.client_secret.is_none() {
            tracing::warn!("role fallback enabled without client_secret; lookups will yield no roles");
        }
        Ok(())
    }

    fn authority(&self) -> String {
        format!(
            "{}/{}",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id.trim()
        )
    }

    /// Expected `iss` claim.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("{}/v2.0", self.authority())
    }

    #[must_use]
    pub fn jwks_uri(&self) -> String {
        format!("{}/discovery/v2.0/keys", self.authority())
    }

    /// Client-credentials token endpoint used by the role fallback.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority())
    }

    #[must_use]
    pub fn expected_audience(&self) -> &str {
        match self.audience.as_deref().map(str::trim) {
            Some(aud) if !aud.is_empty() => aud,
            _ => self.client_id.trim(),
        }
    }

    #[must_use]
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_seconds)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}
