use rmcp_oauth::auth::{
    jwt::BuildError,
    oauth::{ConfigError, discovery::DiscoveryError},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("either AUTH0_DOMAIN or AUTH_ISSUER must be set")]
    MissingIssuer,

    #[error("invalid resource server configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("token verifier error: {0}")]
    Verifier(#[from] BuildError),

    #[error("authorization server discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
