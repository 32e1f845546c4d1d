//! # wmcp
//!
//! An MCP server exposed as an OAuth 2.1 protected resource.
//!
//! The router publishes the Protected Resource Metadata document without
//! authentication and gates the MCP endpoint behind bearer token
//! verification (and, optionally, a required-scope policy).
//!
//! ```rust,ignore
//! let config = wmcp::Config::parse();
//! let app = wmcp::app(&config).await?;
//! axum::serve(tokio::net::TcpListener::bind(config.bind).await?, app).await?;
//! ```

use axum::{Router, middleware::from_fn_with_state};
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp_oauth::auth::{
    AuthLayer, BearerAuth, Validator,
    jwt::{AccessToken, TokenVerifier},
    oauth::{RequiredScopes, ResourceServerConfig, discovery, metadata_router, require_scopes},
};

pub mod config;
pub mod error;
pub mod server;

pub use config::Config;
pub use error::Error;
pub use server::Server;

/// Build the complete application from configuration.
///
/// # Errors
///
/// Returns [`Error`] if the configuration is invalid, the instructions file
/// cannot be read, or discovery was requested and failed.
pub async fn app(config: &Config) -> Result<Router, Error> {
    let resource_server = config.resource_server()?;
    let verifier = verifier(config, &resource_server).await?;
    let instructions = match &config.instructions {
        Some(path) => Some(tokio::fs::read_to_string(path).await?),
        None => None,
    };

    tracing::info!(
        resource = %resource_server.resource(),
        issuer = %resource_server.issuer(),
        metadata = %resource_server.metadata_url(),
        jwks_uri = %verifier.keys().source().jwks_uri(),
        "resource server configured"
    );
    Ok(router(
        resource_server,
        verifier,
        config.required_scopes(),
        Server::new(instructions),
    ))
}

async fn verifier(
    config: &Config,
    resource_server: &ResourceServerConfig,
) -> Result<TokenVerifier, Error> {
    let client = reqwest::Client::builder()
        .timeout(config.jwks_timeout())
        .build()?;
    let mut builder = TokenVerifier::builder(resource_server.clone())
        .algorithm(config.algorithm)
        .leeway(config.leeway())
        .http_client(client.clone());

    if let Some(uri) = &config.jwks_uri {
        builder = builder.jwks_uri(uri.clone());
    } else if config.discover {
        let metadata = discovery::discover(&client, resource_server.issuer()).await?;
        builder = builder.jwks_uri(metadata.require_jwks_uri()?);
    }
    Ok(builder.build()?)
}

/// Assemble the router: metadata routes are public, everything else is
/// served by the MCP service behind `validator`.
///
/// The MCP endpoint is mounted at the resource URL's path, or at the root
/// when the resource is a bare origin.
pub fn router<V>(
    resource_server: ResourceServerConfig,
    validator: V,
    required_scopes: Vec<String>,
    server: Server,
) -> Router
where
    V: Validator<Claims = AccessToken>,
{
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let mut protected = match resource_server.resource_path() {
        "" => Router::new().fallback_service(mcp),
        path => Router::new().nest_service(path, mcp),
    };
    let policy = RequiredScopes::new(resource_server.clone(), required_scopes);
    if !policy.is_empty() {
        protected = protected.layer(from_fn_with_state(policy, require_scopes::<AccessToken>));
    }

    protected
        .layer(AuthLayer::new(BearerAuth::new(validator)).with_resource_server(resource_server.clone()))
        .merge(metadata_router(resource_server))
}
