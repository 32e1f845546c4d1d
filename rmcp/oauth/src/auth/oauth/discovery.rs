//! Authorization server discovery (RFC 8414 / OpenID Connect Discovery).
//!
//! Read-only: resolves where the authorization server publishes its keys
//! instead of assuming the `/.well-known/jwks.json` convention.

use serde::Deserialize;

const DISCOVERY_PATHS: &[&str] = &[
    "/.well-known/oauth-authorization-server",
    "/.well-known/openid-configuration",
];

/// The subset of authorization server metadata this resource server reads.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub registration_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub scopes_supported: Option<Vec<String>>,
}

/// Errors raised while discovering authorization server metadata.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to fetch discovery document: {0}")]
    Fetch(#[source] reqwest::Error),

    #[error("failed to parse discovery document: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("no discovery document found for issuer {0}")]
    NotFound(String),

    #[error("discovery document issuer {found} does not match configured issuer {expected}")]
    IssuerMismatch { expected: String, found: String },

    #[error("discovery document for {0} does not advertise a jwks_uri")]
    MissingJwksUri(String),
}

impl AuthorizationServerMetadata {
    /// The `jwks_uri`, required for token verification.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::MissingJwksUri`] if the document has none.
    pub fn require_jwks_uri(&self) -> Result<&str, DiscoveryError> {
        self.jwks_uri
            .as_deref()
            .ok_or_else(|| DiscoveryError::MissingJwksUri(self.issuer.clone()))
    }
}

/// Fetch the authorization server metadata for `issuer`.
///
/// Probes the RFC 8414 path first, then the OpenID Connect one. The
/// returned document's `issuer` must match the configured issuer (trailing
/// slash aside), otherwise the document is rejected.
///
/// # Errors
///
/// Returns [`DiscoveryError::NotFound`] if neither path yields a usable
/// document and [`DiscoveryError::IssuerMismatch`] if the document names a
/// different issuer.
pub async fn discover(
    client: &reqwest::Client,
    issuer: &str,
) -> Result<AuthorizationServerMetadata, DiscoveryError> {
    let base = issuer.trim_end_matches('/');
    for path in DISCOVERY_PATHS {
        let url = format!("{base}{path}");
        match fetch(client, &url).await {
            Ok(metadata) => {
                if metadata.issuer.trim_end_matches('/') != base {
                    return Err(DiscoveryError::IssuerMismatch {
                        expected: issuer.to_owned(),
                        found: metadata.issuer,
                    });
                }
                tracing::info!(url = %url, "discovered authorization server metadata");
                return Ok(metadata);
            }
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "discovery candidate failed");
            }
        }
    }
    Err(DiscoveryError::NotFound(issuer.to_owned()))
}

async fn fetch(
    client: &reqwest::Client,
    url: &str,
) -> Result<AuthorizationServerMetadata, DiscoveryError> {
    let resp = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(DiscoveryError::Fetch)?;
    let body = resp.bytes().await.map_err(DiscoveryError::Fetch)?;
    serde_json::from_slice(&body).map_err(DiscoveryError::Parse)
}
