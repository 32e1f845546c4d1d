//! Command line and environment configuration.

use crate::Error;
use clap::Parser;
use jsonwebtoken::Algorithm;
use rmcp_oauth::auth::oauth::ResourceServerConfig;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Walrus MCP server protected by an OAuth 2.1 authorization server.
///
/// Every option can also be set through the environment variable shown,
/// or a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "wmcp", version, about)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Auth0 tenant domain (e.g. tenant.us.auth0.com). The issuer becomes
    /// `https://<domain>/`.
    #[arg(long, env = "AUTH0_DOMAIN")]
    pub domain: Option<String>,

    /// Issuer URL of the authorization server. Takes precedence over
    /// `--domain`.
    #[arg(long, env = "AUTH_ISSUER")]
    pub issuer: Option<String>,

    /// Canonical URL of this server, the audience tokens must be minted for.
    #[arg(long, env = "AUTH0_AUDIENCE", default_value = "http://localhost:8000")]
    pub audience: String,

    /// Token signing algorithm. Exactly one is accepted.
    #[arg(long, env = "AUTH0_ALGORITHM", default_value = "RS256", value_parser = parse_algorithm)]
    pub algorithm: Algorithm,

    /// Scopes advertised in the protected resource metadata.
    #[arg(long, env = "MCP_SCOPES_SUPPORTED", value_delimiter = ',')]
    pub scopes_supported: Vec<String>,

    /// Scopes every request must carry. Unset means any valid token for
    /// this audience is accepted.
    #[arg(long, env = "MCP_REQUIRED_SCOPES", value_delimiter = ',')]
    pub required_scopes: Vec<String>,

    /// JWKS location. Defaults to `<issuer>/.well-known/jwks.json`.
    #[arg(long, env = "JWKS_URI")]
    pub jwks_uri: Option<String>,

    /// Resolve the JWKS location from the authorization server's metadata
    /// at startup.
    #[arg(long, env = "AUTH_DISCOVER", conflicts_with = "jwks_uri")]
    pub discover: bool,

    /// Timeout in seconds for requests to the authorization server.
    #[arg(long = "jwks-timeout", env = "JWKS_TIMEOUT_SECS", default_value_t = 5)]
    pub jwks_timeout_secs: u64,

    /// Clock skew in seconds tolerated on `exp` and `nbf`.
    #[arg(long = "leeway", env = "AUTH_LEEWAY_SECS", default_value_t = 0)]
    pub leeway_secs: u64,

    /// File whose contents are sent to clients as server instructions.
    #[arg(long, env = "MCP_INSTRUCTIONS_FILE")]
    pub instructions: Option<PathBuf>,
}

fn parse_algorithm(value: &str) -> Result<Algorithm, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("unknown signing algorithm `{value}`"))
}

impl Config {
    /// The configured issuer, or the one derived from the Auth0 domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingIssuer`] if neither is set.
    pub fn issuer(&self) -> Result<String, Error> {
        if let Some(issuer) = self.issuer.as_deref().filter(|s| !s.trim().is_empty()) {
            return Ok(issuer.trim().to_owned());
        }
        match self.domain.as_deref().map(str::trim) {
            Some(domain) if !domain.is_empty() => {
                Ok(format!("https://{}/", domain.trim_end_matches('/')))
            }
            _ => Err(Error::MissingIssuer),
        }
    }

    /// Resource server identity shared by the verifier and the metadata
    /// document.
    ///
    /// When scopes are required, 401 challenges advertise them.
    pub fn resource_server(&self) -> Result<ResourceServerConfig, Error> {
        let mut config = ResourceServerConfig::new(self.audience.trim(), self.issuer()?)?
            .with_scopes_supported(scope_list(&self.scopes_supported));
        let required = self.required_scopes();
        if !required.is_empty() {
            config = config.with_default_scope(required.join(" "));
        }
        Ok(config)
    }

    pub fn required_scopes(&self) -> Vec<String> {
        scope_list(&self.required_scopes)
    }

    pub fn jwks_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_timeout_secs)
    }

    pub fn leeway(&self) -> Duration {
        Duration::from_secs(self.leeway_secs)
    }
}

/// Trim entries and drop empty ones, keeping the first occurrence of each.
fn scope_list(raw: &[String]) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for scope in raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !scopes.iter().any(|s| s == scope) {
            scopes.push(scope.to_owned());
        }
    }
    scopes
}
