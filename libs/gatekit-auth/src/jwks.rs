//! Signing key cache with TTL and rotation-triggered refresh.
//!
//! The whole key set lives in one immutable snapshot behind an
//! [`ArcSwapOption`]. A refresh builds a new snapshot and swaps it in, so
//! readers never observe a partially updated set. Concurrent refreshes may
//! race; the last one wins and both results are complete.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::Deserialize;
use serde_json::Value;

use crate::config::AuthConfig;
use crate::errors::TransportError;
use crate::http::send_json;
use crate::traits::{JwksSource, KeyProvider};

/// Fetches the key set from a discovery keys endpoint.
pub struct HttpJwksSource {
    client: reqwest::Client,
    uri: String,
}

impl HttpJwksSource {
    #[must_use]
    pub fn new(client: reqwest::Client, uri: impl Into<String>) -> Self {
        Self {
            client,
            uri: uri.into(),
        }
    }
}

#[derive(Deserialize)]
struct RawKeySet {
    #[serde(default)]
    keys: Vec<Value>,
}

#[async_trait]
impl JwksSource for HttpJwksSource {
    async fn fetch(&self) -> Result<JwkSet, TransportError> {
        let raw: RawKeySet = send_json(self.client.get(&self.uri), &self.uri).await?;

        // Skip entries the JWK model cannot represent instead of dropping the set.
        let keys = raw
            .keys
            .into_iter()
            .filter_map(|key| match serde_json::from_value::<Jwk>(key) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unsupported JWK");
                    None
                }
            })
            .collect();
        Ok(JwkSet { keys })
    }
}

struct KeySnapshot {
    keys: HashMap<String, Arc<DecodingKey>>,
    fetched_at: Instant,
}

impl KeySnapshot {
    fn from_set(set: &JwkSet) -> Self {
        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.as_deref() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid.to_owned(), Arc::new(key));
                }
                Err(e) => tracing::debug!(kid, error = %e, "ignoring unusable JWK"),
            }
        }
        Self {
            keys,
            fetched_at: Instant::now(),
        }
    }
}

/// TTL-bounded cache of one published key set.
pub struct JwksCache {
    source: Arc<dyn JwksSource>,
    ttl: Duration,
    snapshot: ArcSwapOption<KeySnapshot>,
}

impl JwksCache {
    #[must_use]
    pub fn new(source: Arc<dyn JwksSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            snapshot: ArcSwapOption::empty(),
        }
    }

    /// Cache over the tenant's discovery keys endpoint.
    #[must_use]
    pub fn from_config(config: &AuthConfig, client: reqwest::Client) -> Self {
        Self::new(
            Arc::new(HttpJwksSource::new(client, config.jwks_uri())),
            config.jwks_cache_ttl(),
        )
    }

    /// Number of keys in the current snapshot.
    #[must_use]
    pub fn cached_key_count(&self) -> usize {
        self.snapshot.load_full().map_or(0, |s| s.keys.len())
    }

    fn fresh_snapshot(&self) -> Option<Arc<KeySnapshot>> {
        self.snapshot
            .load_full()
            .filter(|s| !s.keys.is_empty() && s.fetched_at.elapsed() < self.ttl)
    }

    /// Refetch the key set regardless of age and replace the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the key set cannot be fetched; the
    /// previous snapshot is left in place.
    pub async fn refresh(&self) -> Result<(), TransportError> {
        self.reload().await.map(|_| ())
    }

    async fn reload(&self) -> Result<Arc<KeySnapshot>, TransportError> {
        let set = self.source.fetch().await?;
        let snapshot = Arc::new(KeySnapshot::from_set(&set));
        tracing::debug!(keys = snapshot.keys.len(), "signing key set refreshed");
        self.snapshot.store(Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }
}

#[async_trait]
impl KeyProvider for JwksCache {
    async fn get_key(&self, kid: &str) -> Result<Option<Arc<DecodingKey>>, TransportError> {
        let (snapshot, just_fetched) = match self.fresh_snapshot() {
            Some(snapshot) => (snapshot, false),
            None => (self.reload().await?, true),
        };

        if let Some(key) = snapshot.keys.get(kid) {
            return Ok(Some(Arc::clone(key)));
        }
        if just_fetched {
            return Ok(None);
        }

        tracing::info!("kid not in cached key set; refreshing once for key rotation");
        let snapshot = self.reload().await?;
        Ok(snapshot.keys.get(kid).cloned())
    }
}
