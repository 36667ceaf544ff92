//! App-only (client credentials) access token with a cached lifetime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::errors::TransportError;
use crate::http::send_json;

/// Scope requesting every application permission granted to the client
/// on the membership API.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Subtracted from the stated lifetime before a credential is reused.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);
/// Lower bound on how long a credential is cached.
const MIN_CACHE_LIFETIME: Duration = Duration::from_secs(60);
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// A service credential and the instant it stops being reused.
pub struct ServiceCredential {
    token: SecretString,
    reuse_until: Instant,
}

impl ServiceCredential {
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.token.expose_secret()
    }

    fn is_reusable(&self) -> bool {
        Instant::now() < self.reuse_until
    }
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("token", &self.token)
            .field("reuse_until", &self.reuse_until)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(serde::Serialize)]
struct ClientCredentialsForm<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
}

/// Shared cache of one service credential, refreshed on demand.
pub struct ServiceCredentialCache {
    client: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    client_secret: Option<SecretString>,
    scope: String,
    current: ArcSwapOption<ServiceCredential>,
}

impl ServiceCredentialCache {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Option<SecretString>,
    ) -> Self {
        Self {
            client,
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret,
            scope: GRAPH_DEFAULT_SCOPE.to_owned(),
            current: ArcSwapOption::empty(),
        }
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig, client: reqwest::Client) -> Self {
        let secret = config
            .client_secret
            .as_ref()
            .map(|s| SecretString::from(s.expose_secret().to_owned()));
        Self::new(client, config.token_endpoint(), config.client_id.trim(), secret)
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Return the cached credential or acquire a new one.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no secret is configured or the token
    /// endpoint fails.
    pub async fn get(&self) -> Result<Arc<ServiceCredential>, TransportError> {
        if let Some(current) = self.current.load_full().filter(|c| c.is_reusable()) {
            return Ok(current);
        }

        let credential = Arc::new(self.acquire().await?);
        self.current.store(Some(Arc::clone(&credential)));
        Ok(credential)
    }

    async fn acquire(&self) -> Result<ServiceCredential, TransportError> {
        let secret = self
            .client_secret
            .as_ref()
            .ok_or(TransportError::MissingClientSecret)?;

        let form = serde_urlencoded::to_string(ClientCredentialsForm {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: secret.expose_secret(),
            scope: &self.scope,
        })
        .map_err(|e| TransportError::InvalidResponse {
            url: self.token_endpoint.clone(),
            reason: e.to_string(),
        })?;

        let request = self
            .client
            .post(&self.token_endpoint)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(form);
        let response: TokenResponse = send_json(request, &self.token_endpoint).await?;

        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TransportError::InvalidResponse {
                url: self.token_endpoint.clone(),
                reason: "no access_token in response".to_owned(),
            })?;

        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
        let cached_for = lifetime.saturating_sub(EXPIRY_MARGIN).max(MIN_CACHE_LIFETIME);
        tracing::debug!(cached_secs = cached_for.as_secs(), "service credential acquired");

        Ok(ServiceCredential {
            token: SecretString::from(token),
            reuse_until: Instant::now() + cached_for,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn cache(server: &MockServer, secret: Option<&str>) -> ServiceCredentialCache {
        ServiceCredentialCache::new(
            reqwest::Client::new(),
            server.url("/tenant/oauth2/v2.0/token"),
            "api-client",
            secret.map(|s| SecretString::from(s.to_owned())),
        )
    }

    #[tokio::test]
    async fn credential_is_cached_within_its_lifetime() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/tenant/oauth2/v2.0/token")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .form_urlencoded_tuple("grant_type", "client_credentials")
                    .form_urlencoded_tuple("client_id", "api-client")
                    .form_urlencoded_tuple("client_secret", "s3cret")
                    .form_urlencoded_tuple("scope", GRAPH_DEFAULT_SCOPE);
                then.status(200)
                    .json_body(serde_json::json!({"access_token": "app-token", "expires_in": 3599}));
            })
            .await;

        let cache = cache(&server, Some("s3cret"));
        assert_eq!(cache.get().await.unwrap().expose_secret(), "app-token");
        assert_eq!(cache.get().await.unwrap().expose_secret(), "app-token");
        token_mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn missing_secret_fails_without_calling_out() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let err = cache(&server, None).get().await.unwrap_err();
        assert!(matches!(err, TransportError::MissingClientSecret));
        token_mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn response_without_token_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(serde_json::json!({"expires_in": 3600}));
            })
            .await;

        let err = cache(&server, Some("s")).get().await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse { .. }), "{err}");
    }

    #[tokio::test]
    async fn error_status_is_reported_without_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(401).body("invalid_client: secret s3cret rejected");
            })
            .await;

        let err = cache(&server, Some("s3cret")).get().await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 401, .. }));
        assert!(!err.to_string().contains("s3cret"));
    }

    #[test]
    fn debug_redacts_token() {
        let credential = ServiceCredential {
            token: SecretString::from("app-token".to_owned()),
            reuse_until: Instant::now(),
        };
        assert!(!format!("{credential:?}").contains("app-token"));
    }
}
