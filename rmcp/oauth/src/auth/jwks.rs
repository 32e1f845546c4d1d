//! Signing key set fetched from the authorization server.
//!
//! [`KeyCache`] maps key identifiers to decoding keys. It is filled lazily
//! and refreshed whenever a token names a `kid` it has not seen, which is
//! how key rotation is picked up. There is no TTL: a stale key that still
//! matches is harmless, a missing one triggers a refetch.
//!
//! A refresh fetches and parses the whole document before touching the
//! map, then swaps it in under a single write lock. A fetch that fails or
//! is abandoned mid-flight commits nothing. Concurrent refreshes are
//! redundant work, the last one to finish wins.

use jsonwebtoken::{
    DecodingKey,
    jwk::{Jwk, JwkSet, PublicKeyUse},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Default request timeout for JWKS fetches.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while obtaining the signing key set.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("failed to fetch JWKS: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("failed to parse JWKS: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("key source unavailable: {0}")]
    Unavailable(String),
}

/// Somewhere a [`JwkSet`] can be fetched from.
///
/// [`HttpKeySource`] is the production implementation; tests substitute
/// in-memory or failing sources.
pub trait KeySource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<JwkSet, JwksError>> + Send;
}

/// Fetches the JWKS document over HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpKeySource {
    client: reqwest::Client,
    jwks_uri: String,
}

impl HttpKeySource {
    /// Create a source with its own client bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::Fetch`] if the HTTP client cannot be built.
    pub fn new(jwks_uri: impl Into<String>, timeout: Duration) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(JwksError::Fetch)?;
        Ok(Self::with_client(client, jwks_uri))
    }

    /// Create a source that reuses an existing client.
    pub fn with_client(client: reqwest::Client, jwks_uri: impl Into<String>) -> Self {
        Self {
            client,
            jwks_uri: jwks_uri.into(),
        }
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }
}

impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        tracing::debug!(jwks_uri = %self.jwks_uri, "fetching JWKS");
        let resp = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(JwksError::Fetch)?;
        let body = resp.bytes().await.map_err(JwksError::Fetch)?;
        parse_jwks(&body)
    }
}

#[derive(Deserialize)]
struct RawJwkSet {
    keys: Vec<serde_json::Value>,
}

/// Parse a JWKS document, dropping individual keys this crate cannot
/// represent instead of rejecting the whole set.
///
/// # Errors
///
/// Returns [`JwksError::Parse`] if the document is not a JSON object with
/// a `keys` array.
pub fn parse_jwks(body: &[u8]) -> Result<JwkSet, JwksError> {
    let raw: RawJwkSet = serde_json::from_slice(body).map_err(JwksError::Parse)?;
    let keys = raw
        .keys
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Jwk>(value) {
            Ok(jwk) => Some(jwk),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unsupported JWK");
                None
            }
        })
        .collect();
    Ok(JwkSet { keys })
}

/// Shared cache of signing keys, keyed by `kid`.
pub struct KeyCache<S> {
    source: S,
    keys: RwLock<HashMap<String, DecodingKey>>,
    refreshes: AtomicU64,
}

impl<S: KeySource> KeyCache<S> {
    /// An empty cache; the first lookup miss triggers the initial fetch.
    pub fn new(source: S) -> Self {
        Self {
            source,
            keys: RwLock::new(HashMap::new()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// A cache pre-populated from `jwks`.
    pub fn seeded(source: S, jwks: &JwkSet) -> Self {
        Self {
            source,
            keys: RwLock::new(decoding_keys(jwks)),
            refreshes: AtomicU64::new(0),
        }
    }

    /// The source refreshes are fetched from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Look up the key for `kid` without touching the network.
    pub async fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.keys.read().await.get(kid).cloned()
    }

    /// Refetch the key set and replace the cached one.
    ///
    /// Returns the number of usable keys now cached.
    ///
    /// # Errors
    ///
    /// Returns the source's [`JwksError`]; the cache is left untouched.
    pub async fn refresh(&self) -> Result<usize, JwksError> {
        let jwks = self.source.fetch().await?;
        let keys = decoding_keys(&jwks);
        let count = keys.len();

        *self.keys.write().await = keys;
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        tracing::info!(keys = count, "signing keys refreshed");
        Ok(count)
    }

    /// Number of refreshes committed so far.
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

fn decoding_keys(jwks: &JwkSet) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::with_capacity(jwks.keys.len());
    for jwk in &jwks.keys {
        let Some(kid) = jwk.common.key_id.as_deref() else {
            tracing::warn!("skipping JWK without kid");
            continue;
        };
        if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
            tracing::debug!(kid, "skipping encryption key");
            continue;
        }
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid.to_owned(), key);
            }
            Err(err) => tracing::warn!(kid, error = %err, "skipping unusable JWK"),
        }
    }
    keys
}
