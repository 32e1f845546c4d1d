//! Identity of this resource server.
//!
//! A single [`ResourceServerConfig`] feeds both the token verifier (issuer
//! and audience checks) and the metadata responder (the document it
//! publishes), so the two can never disagree about which authorization
//! server is trusted.

use thiserror::Error;
use url::Url;

/// Well-known path of the Protected Resource Metadata document (RFC 9728 §3).
pub const WELL_KNOWN_PATH: &str = "/.well-known/oauth-protected-resource";

/// Errors raised while building a [`ResourceServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field} URL `{value}`: {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{field} URL `{value}` must use http or https")]
    UnsupportedScheme { field: &'static str, value: String },

    #[error("resource URL `{0}` must not contain a fragment")]
    ResourceFragment(String),
}

/// Configuration for an MCP server acting as an OAuth 2.1 resource server.
#[derive(Clone, Debug)]
pub struct ResourceServerConfig {
    resource: String,
    issuer: String,
    origin: String,
    resource_path: String,
    scopes_supported: Vec<String>,
    default_scope: Option<String>,
    resource_documentation: Option<String>,
}

impl ResourceServerConfig {
    /// Create a configuration for `resource` protected by `issuer`.
    ///
    /// `resource` is the canonical URL of this server and the audience
    /// tokens must carry. `issuer` is the authorization server's issuer
    /// URL; it is published and compared exactly as given (modulo a
    /// trailing slash).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either value is not an absolute
    /// `http`/`https` URL, or if `resource` carries a fragment.
    pub fn new(
        resource: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let resource = resource.into();
        let issuer = issuer.into();

        let resource_url = parse_http_url("resource", &resource)?;
        if resource_url.fragment().is_some() {
            return Err(ConfigError::ResourceFragment(resource));
        }
        parse_http_url("issuer", &issuer)?;

        let resource_path = resource_url.path().trim_end_matches('/').to_owned();
        Ok(Self {
            origin: resource_url.origin().ascii_serialization(),
            resource_path,
            resource,
            issuer,
            scopes_supported: Vec::new(),
            default_scope: None,
            resource_documentation: None,
        })
    }

    /// Scopes advertised in the metadata document.
    pub fn with_scopes_supported<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes_supported = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Scope string included in 401 challenges.
    pub fn with_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scope = Some(scope.into());
        self
    }

    /// Human-readable documentation URL published in the metadata.
    pub fn with_resource_documentation(mut self, url: impl Into<String>) -> Self {
        self.resource_documentation = Some(url.into());
        self
    }

    /// Canonical resource identifier (the expected `aud`).
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Authorization server issuer, exactly as configured.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn scopes_supported(&self) -> &[String] {
        &self.scopes_supported
    }

    pub fn default_scope(&self) -> Option<&str> {
        self.default_scope.as_deref()
    }

    pub fn resource_documentation(&self) -> Option<&str> {
        self.resource_documentation.as_deref()
    }

    /// Path component of the resource URL without a trailing slash.
    ///
    /// Empty when the resource is the bare origin.
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Path of the metadata document scoped to this resource, e.g.
    /// `/.well-known/oauth-protected-resource/mcp`.
    ///
    /// Equal to [`WELL_KNOWN_PATH`] when the resource has no path.
    pub fn scoped_metadata_path(&self) -> String {
        format!("{WELL_KNOWN_PATH}{}", self.resource_path)
    }

    /// Absolute URL of the path-scoped metadata document (RFC 9728 §3.1).
    pub fn metadata_url(&self) -> String {
        format!("{}{}", self.origin, self.scoped_metadata_path())
    }

    /// Whether `iss` names the configured issuer.
    ///
    /// Comparison is exact apart from a trailing slash, which authorization
    /// servers are inconsistent about.
    pub fn issuer_matches(&self, iss: &str) -> bool {
        normalize_issuer(iss) == normalize_issuer(&self.issuer)
    }
}

fn normalize_issuer(issuer: &str) -> &str {
    issuer.trim_end_matches('/')
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_owned(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme {
            field,
            value: value.to_owned(),
        }),
    }
}
