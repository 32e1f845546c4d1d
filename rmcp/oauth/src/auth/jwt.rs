//! JWT bearer token verification against the authorization server's JWKS.
//!
//! [`TokenVerifier`] implements [`Validator`](super::Validator) producing
//! [`AccessToken`]. A token is accepted only if all of these hold:
//!
//! 1. its header parses and names a `kid`,
//! 2. that `kid` resolves in the [`KeyCache`] (refreshing once on a miss),
//! 3. the signature verifies with the single pinned algorithm,
//! 4. it is not expired and not used before `nbf`,
//! 5. `iss` is the configured issuer,
//! 6. `aud` contains the configured resource.
//!
//! Scopes are extracted but not enforced here; see
//! [`RequiredScopes`](super::oauth::RequiredScopes).
//!
//! Requires the `jwt` feature.
//!
//! ```rust,ignore
//! use rmcp_oauth::auth::{AuthLayer, BearerAuth, jwt::TokenVerifier};
//! use rmcp_oauth::auth::oauth::ResourceServerConfig;
//!
//! let config = ResourceServerConfig::new(
//!     "https://mcp.example.com/mcp",
//!     "https://tenant.auth0.com/",
//! )?;
//! let verifier = TokenVerifier::builder(config.clone()).build()?;
//!
//! let app = axum::Router::new()
//!     .nest_service("/mcp", service)
//!     .layer(AuthLayer::new(BearerAuth::new(verifier)).with_resource_server(config));
//! ```

use crate::auth::{
    Validator,
    jwks::{DEFAULT_TIMEOUT, HttpKeySource, JwksError, KeyCache, KeySource},
    oauth::{GrantedScopes, ResourceServerConfig},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::Deserialize;
use serde_json::Value;
use std::{fmt, sync::Arc, time::Duration};

/// Client identifier reported when a token names neither `azp` nor `client_id`.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Why a token was rejected.
///
/// Only ever logged. Callers must answer every variant with the same
/// generic unauthorized response.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("could not resolve signing keys: {0}")]
    KeyResolutionFailed(#[source] JwksError),

    #[error("no signing key with kid {kid}")]
    UnknownSigningKey { kid: String },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token expired")]
    ExpiredToken,

    #[error("token not yet valid")]
    TokenNotYetValid,

    #[error("issuer mismatch")]
    IssuerMismatch,

    #[error("audience mismatch")]
    AudienceMismatch,
}

impl VerifyError {
    /// Stable name of the failure kind, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) => "malformed_token",
            Self::KeyResolutionFailed(_) => "key_resolution_failed",
            Self::UnknownSigningKey { .. } => "unknown_signing_key",
            Self::InvalidSignature => "invalid_signature",
            Self::ExpiredToken => "expired_token",
            Self::TokenNotYetValid => "token_not_yet_valid",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::AudienceMismatch => "audience_mismatch",
        }
    }

    /// True when the failure says nothing about the credential itself but
    /// about our connectivity to the authorization server.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::KeyResolutionFailed(_))
    }
}

/// Errors raised while building a [`TokenVerifier`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("algorithm {0:?} is symmetric and cannot be verified against a JWKS")]
    SymmetricAlgorithm(Algorithm),

    #[error(transparent)]
    KeySource(#[from] JwksError),
}

/// A verified access token.
///
/// Built fresh for each request and never cached.
#[derive(Clone)]
pub struct AccessToken {
    /// The raw bearer token.
    pub token: String,
    /// `azp`, else `client_id`, else [`UNKNOWN_CLIENT`].
    pub client_id: String,
    /// `sub`, when present.
    pub subject: Option<String>,
    /// Union of `scope` and `permissions`, in token order, de-duplicated.
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
    /// Resource identifier the audience was checked against.
    pub resource: String,
}

impl AccessToken {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the bearer credential
        f.debug_struct("AccessToken")
            .field("client_id", &self.client_id)
            .field("subject", &self.subject)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl GrantedScopes for AccessToken {
    fn granted_scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Raw JWT claims deserialized from the token payload.
///
/// Every field is optional so that presence is checked explicitly rather
/// than surfacing as a parse error.
#[derive(Debug, Deserialize)]
pub(crate) struct Claims {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    azp: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    exp: Option<serde_json::Number>,
    #[serde(default)]
    nbf: Option<serde_json::Number>,
    #[serde(default)]
    scope: Option<Value>,
    #[serde(default)]
    permissions: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    fn contains(&self, value: &str) -> bool {
        match self {
            Audience::Single(s) => s == value,
            Audience::Multiple(v) => v.iter().any(|s| s == value),
        }
    }
}

/// NumericDate as whole seconds; fractional values are truncated.
fn numeric_date(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))
}

/// Check temporal, issuer and audience claims, in that order.
///
/// A missing `exp` is treated as expired: there is no way to show such a
/// token is still valid.
pub(crate) fn check_claims(
    claims: &Claims,
    config: &ResourceServerConfig,
    leeway: i64,
    now: i64,
) -> Result<i64, VerifyError> {
    let exp = claims
        .exp
        .as_ref()
        .and_then(numeric_date)
        .ok_or(VerifyError::ExpiredToken)?;
    if now >= exp.saturating_add(leeway) {
        return Err(VerifyError::ExpiredToken);
    }
    if let Some(nbf) = claims.nbf.as_ref().and_then(numeric_date)
        && nbf > now.saturating_add(leeway)
    {
        return Err(VerifyError::TokenNotYetValid);
    }

    match claims.iss.as_deref() {
        Some(iss) if config.issuer_matches(iss) => {}
        _ => return Err(VerifyError::IssuerMismatch),
    }
    match &claims.aud {
        Some(aud) if aud.contains(config.resource()) => {}
        _ => return Err(VerifyError::AudienceMismatch),
    }
    Ok(exp)
}

/// Words of a scope-like claim: a space-delimited string or an array of
/// strings. Anything else contributes nothing.
fn claim_words(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => s.split_whitespace().collect(),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn granted_scopes(claims: &Claims) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for word in claim_words(claims.scope.as_ref())
        .into_iter()
        .chain(claim_words(claims.permissions.as_ref()))
    {
        if !scopes.iter().any(|s| s == word) {
            scopes.push(word.to_owned());
        }
    }
    scopes
}

/// Builder for [`TokenVerifier`].
pub struct TokenVerifierBuilder {
    config: ResourceServerConfig,
    algorithm: Algorithm,
    leeway: Duration,
    jwks_uri: Option<String>,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl TokenVerifierBuilder {
    /// Pin the signing algorithm. Defaults to RS256.
    ///
    /// The token header's `alg` is never trusted; a token signed with any
    /// other algorithm is rejected.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Clock skew tolerated on `exp` and `nbf`. Defaults to zero.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// JWKS location. Defaults to `<issuer>/.well-known/jwks.json`.
    pub fn jwks_uri(mut self, uri: impl Into<String>) -> Self {
        self.jwks_uri = Some(uri.into());
        self
    }

    /// Request timeout for JWKS fetches. Defaults to 5 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reuse an existing HTTP client for JWKS fetches.
    ///
    /// The client's own timeout applies instead of [`timeout`](Self::timeout).
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Build a verifier that fetches keys over HTTP.
    ///
    /// No request is made until the first token is verified.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for a symmetric algorithm or if the HTTP
    /// client cannot be created.
    pub fn build(self) -> Result<TokenVerifier<HttpKeySource>, BuildError> {
        let jwks_uri = self.jwks_uri.clone().unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                self.config.issuer().trim_end_matches('/')
            )
        });
        let source = match self.client.clone() {
            Some(client) => HttpKeySource::with_client(client, jwks_uri),
            None => HttpKeySource::new(jwks_uri, self.timeout)?,
        };
        self.build_with_cache(KeyCache::new(source))
    }

    /// Build a verifier around an existing key cache.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::SymmetricAlgorithm`] for HMAC algorithms.
    pub fn build_with_cache<S: KeySource>(
        self,
        keys: KeyCache<S>,
    ) -> Result<TokenVerifier<S>, BuildError> {
        if matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(BuildError::SymmetricAlgorithm(self.algorithm));
        }

        // Only the signature is checked by jsonwebtoken; claims are checked
        // by `check_claims` so each failure maps to its own kind.
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Ok(TokenVerifier {
            inner: Arc::new(TokenVerifierInner {
                config: self.config,
                keys,
                algorithm: self.algorithm,
                validation,
                leeway: i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX),
            }),
        })
    }
}

struct TokenVerifierInner<S> {
    config: ResourceServerConfig,
    keys: KeyCache<S>,
    algorithm: Algorithm,
    validation: Validation,
    leeway: i64,
}

/// JWT verifier backed by a [`KeyCache`].
pub struct TokenVerifier<S = HttpKeySource> {
    inner: Arc<TokenVerifierInner<S>>,
}

impl<S> Clone for TokenVerifier<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl TokenVerifier<HttpKeySource> {
    /// Start building a verifier for `config`.
    pub fn builder(config: ResourceServerConfig) -> TokenVerifierBuilder {
        TokenVerifierBuilder {
            config,
            algorithm: Algorithm::RS256,
            leeway: Duration::ZERO,
            jwks_uri: None,
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }
}

impl<S: KeySource> TokenVerifier<S> {
    pub fn config(&self) -> &ResourceServerConfig {
        &self.inner.config
    }

    pub fn keys(&self) -> &KeyCache<S> {
        &self.inner.keys
    }

    /// Verify `token` and return the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns the [`VerifyError`] describing the first check that failed.
    pub async fn verify(&self, token: &str) -> Result<AccessToken, VerifyError> {
        let result = self.verify_token(token).await;
        match &result {
            Ok(access) => {
                tracing::debug!(client_id = %access.client_id, "token verified");
            }
            Err(err) if err.is_operational() => {
                tracing::error!(kind = err.kind(), error = %err, "signing key resolution failed");
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "token verification failed");
            }
        }
        result
    }

    async fn verify_token(&self, token: &str) -> Result<AccessToken, VerifyError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| VerifyError::MalformedToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::MalformedToken("missing kid header".into()))?;
        // Reject a foreign algorithm before it can trigger a key refresh.
        if header.alg != self.inner.algorithm {
            return Err(VerifyError::InvalidSignature);
        }

        let key = self.resolve_key(&kid).await?;
        let claims = jsonwebtoken::decode::<Claims>(token, &key, &self.inner.validation)
            .map_err(decode_error)?
            .claims;

        let config = &self.inner.config;
        let exp = check_claims(&claims, config, self.inner.leeway, Utc::now().timestamp())?;
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| VerifyError::MalformedToken("exp out of range".into()))?;

        Ok(AccessToken {
            token: token.to_owned(),
            scopes: granted_scopes(&claims),
            client_id: claims
                .azp
                .or(claims.client_id)
                .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned()),
            subject: claims.sub,
            expires_at,
            resource: config.resource().to_owned(),
        })
    }

    /// Cached key for `kid`, refreshing the key set once on a miss.
    ///
    /// The `kid` comes from the unauthenticated token header, so every
    /// request naming an unseen `kid` costs one JWKS fetch. Refreshes are
    /// not rate limited: a rotated key is usable on its first appearance.
    async fn resolve_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        let keys = &self.inner.keys;
        if let Some(key) = keys.get(kid).await {
            return Ok(key);
        }

        tracing::info!(kid, "unseen signing key, refreshing JWKS");
        keys.refresh()
            .await
            .map_err(VerifyError::KeyResolutionFailed)?;
        keys.get(kid).await.ok_or_else(|| VerifyError::UnknownSigningKey {
            kid: kid.to_owned(),
        })
    }
}

fn decode_error(err: jsonwebtoken::errors::Error) -> VerifyError {
    match err.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidEcdsaKey => VerifyError::InvalidSignature,
        _ => VerifyError::MalformedToken(err.to_string()),
    }
}

impl<S: KeySource> Validator for TokenVerifier<S> {
    type Claims = AccessToken;
    type Error = VerifyError;

    async fn validate(&self, token: &str) -> Result<AccessToken, VerifyError> {
        self.verify(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::{Claims, VerifyError, check_claims, granted_scopes};
    use crate::auth::oauth::ResourceServerConfig;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn config() -> ResourceServerConfig {
        ResourceServerConfig::new("https://resource.example/mcp", "https://issuer.example/")
            .unwrap()
    }

    fn claims(value: serde_json::Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    fn valid() -> serde_json::Value {
        json!({
            "iss": "https://issuer.example/",
            "aud": "https://resource.example/mcp",
            "exp": NOW + 3600,
        })
    }

    #[test]
    fn accepts_valid_claims() {
        assert_eq!(check_claims(&claims(valid()), &config(), 0, NOW).unwrap(), NOW + 3600);
    }

    #[test]
    fn expired_at_exp() {
        let mut c = valid();
        c["exp"] = json!(NOW);
        assert!(matches!(
            check_claims(&claims(c), &config(), 0, NOW),
            Err(VerifyError::ExpiredToken)
        ));
    }

    #[test]
    fn leeway_extends_exp() {
        let mut c = valid();
        c["exp"] = json!(NOW - 10);
        assert!(check_claims(&claims(c), &config(), 30, NOW).is_ok());
    }

    #[test]
    fn missing_exp_is_expired() {
        let mut c = valid();
        c.as_object_mut().unwrap().remove("exp");
        assert!(matches!(
            check_claims(&claims(c), &config(), 0, NOW),
            Err(VerifyError::ExpiredToken)
        ));
    }

    #[test]
    fn future_nbf_is_not_yet_valid() {
        let mut c = valid();
        c["nbf"] = json!(NOW + 60);
        assert!(matches!(
            check_claims(&claims(c), &config(), 0, NOW),
            Err(VerifyError::TokenNotYetValid)
        ));

        let mut c = valid();
        c["nbf"] = json!(NOW);
        assert!(check_claims(&claims(c), &config(), 0, NOW).is_ok());
    }

    #[test]
    fn fractional_exp_is_accepted() {
        let mut c = valid();
        c["exp"] = json!(NOW as f64 + 100.5);
        assert_eq!(check_claims(&claims(c), &config(), 0, NOW).unwrap(), NOW + 100);
    }

    #[test]
    fn issuer_must_match() {
        let mut c = valid();
        c["iss"] = json!("https://other.example/");
        assert!(matches!(
            check_claims(&claims(c), &config(), 0, NOW),
            Err(VerifyError::IssuerMismatch)
        ));

        let mut c = valid();
        c.as_object_mut().unwrap().remove("iss");
        assert!(matches!(
            check_claims(&claims(c), &config(), 0, NOW),
            Err(VerifyError::IssuerMismatch)
        ));
    }

    #[test]
    fn issuer_trailing_slash_is_normalized() {
        let mut c = valid();
        c["iss"] = json!("https://issuer.example");
        assert!(check_claims(&claims(c), &config(), 0, NOW).is_ok());
    }

    #[test]
    fn userinfo_audience_is_rejected() {
        let mut c = valid();
        c["aud"] = json!("https://issuer.example/userinfo");
        assert!(matches!(
            check_claims(&claims(c), &config(), 0, NOW),
            Err(VerifyError::AudienceMismatch)
        ));

        let mut c = valid();
        c["aud"] = json!(["https://issuer.example/userinfo", "https://resource.example"]);
        assert!(matches!(
            check_claims(&claims(c), &config(), 0, NOW),
            Err(VerifyError::AudienceMismatch)
        ));
    }

    #[test]
    fn audience_array_containing_resource_is_accepted() {
        let mut c = valid();
        c["aud"] = json!(["https://issuer.example/userinfo", "https://resource.example/mcp"]);
        assert!(check_claims(&claims(c), &config(), 0, NOW).is_ok());
    }

    #[test]
    fn missing_audience_is_rejected() {
        let mut c = valid();
        c.as_object_mut().unwrap().remove("aud");
        assert!(matches!(
            check_claims(&claims(c), &config(), 0, NOW),
            Err(VerifyError::AudienceMismatch)
        ));
    }

    #[test]
    fn scopes_from_scope_claim() {
        let c = claims(json!({"scope": "openid profile mcp:access"}));
        assert_eq!(granted_scopes(&c), vec!["openid", "profile", "mcp:access"]);
    }

    #[test]
    fn scopes_from_permissions_claim() {
        let c = claims(json!({"permissions": ["mcp:access"]}));
        assert_eq!(granted_scopes(&c), vec!["mcp:access"]);
    }

    #[test]
    fn scopes_union_without_duplicates() {
        let c = claims(json!({
            "scope": "openid mcp:access",
            "permissions": ["mcp:access", "mcp:invoke"],
        }));
        assert_eq!(granted_scopes(&c), vec!["openid", "mcp:access", "mcp:invoke"]);
    }

    #[test]
    fn absent_or_odd_scope_claims_yield_nothing() {
        assert!(granted_scopes(&claims(json!({}))).is_empty());
        assert!(granted_scopes(&claims(json!({"scope": 7, "permissions": {"a": 1}}))).is_empty());
    }
}
