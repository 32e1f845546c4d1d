//! Shared fixtures: RSA keys, token signing, in-memory key sources.

#![allow(dead_code)]

use jsonwebtoken::{Algorithm, EncodingKey, Header, jwk::JwkSet};
use rmcp_oauth::auth::{
    jwks::{JwksError, KeyCache, KeySource, parse_jwks},
    jwt::TokenVerifier,
    oauth::ResourceServerConfig,
};
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

pub const ISSUER: &str = "https://issuer.example/";
pub const RESOURCE: &str = "https://resource.example/mcp";

/// Test-only RSA key pairs; `a` is published as `key-a`, `b` as `key-b`.
pub struct TestKey {
    pub kid: &'static str,
    pub encoding: EncodingKey,
    pub jwk: Value,
}

pub fn key_a() -> TestKey {
    test_key(
        "key-a",
        include_str!("../fixtures/rsa_a.pem"),
        include_str!("../fixtures/rsa_a.jwk.json"),
    )
}

pub fn key_b() -> TestKey {
    test_key(
        "key-b",
        include_str!("../fixtures/rsa_b.pem"),
        include_str!("../fixtures/rsa_b.jwk.json"),
    )
}

fn test_key(kid: &'static str, pem: &str, jwk: &str) -> TestKey {
    TestKey {
        kid,
        encoding: EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
        jwk: serde_json::from_str(jwk).unwrap(),
    }
}

pub fn jwks(keys: &[&TestKey]) -> JwkSet {
    let keys: Vec<&Value> = keys.iter().map(|k| &k.jwk).collect();
    parse_jwks(json!({ "keys": keys }).to_string().as_bytes()).unwrap()
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims that pass every check against [`config`].
pub fn valid_claims() -> Value {
    json!({
        "iss": ISSUER,
        "aud": RESOURCE,
        "sub": "auth0|user-1",
        "azp": "client-123",
        "exp": now() + 3600,
        "iat": now(),
        "scope": "openid profile mcp:access",
    })
}

pub fn sign(claims: &Value, key: &TestKey) -> String {
    sign_with_kid(claims, key, Some(key.kid))
}

pub fn sign_with_kid(claims: &Value, key: &TestKey, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(String::from);
    jsonwebtoken::encode(&header, claims, &key.encoding).unwrap()
}

pub fn config() -> ResourceServerConfig {
    ResourceServerConfig::new(RESOURCE, ISSUER).unwrap()
}

/// In-memory key source whose key set can be swapped or taken offline.
#[derive(Clone, Default)]
pub struct MemorySource {
    jwks: Arc<Mutex<Option<JwkSet>>>,
    fetches: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn serving(keys: &[&TestKey]) -> Self {
        let source = Self::default();
        source.publish(keys);
        source
    }

    pub fn offline() -> Self {
        Self::default()
    }

    pub fn publish(&self, keys: &[&TestKey]) {
        *self.jwks.lock().unwrap() = Some(jwks(keys));
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl KeySource for MemorySource {
    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.jwks
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| JwksError::Unavailable("authorization server unreachable".into()))
    }
}

pub fn verifier(source: MemorySource) -> TokenVerifier<MemorySource> {
    TokenVerifier::builder(config())
        .build_with_cache(KeyCache::new(source))
        .unwrap()
}

pub fn seeded_verifier(source: MemorySource, seed: &[&TestKey]) -> TokenVerifier<MemorySource> {
    TokenVerifier::builder(config())
        .build_with_cache(KeyCache::seeded(source, &jwks(seed)))
        .unwrap()
}
