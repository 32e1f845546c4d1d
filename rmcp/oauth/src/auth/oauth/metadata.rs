//! OAuth 2.0 Protected Resource Metadata (RFC 9728).
//!
//! MCP servers MUST implement RFC 9728 to indicate the locations of their
//! authorization servers. Clients disagree on where to look for the
//! document: some append the resource path to the well-known prefix,
//! others only try the root. [`metadata_router`] serves the same document
//! at both.
//!
//! ```rust,ignore
//! use rmcp_oauth::auth::oauth::{ResourceServerConfig, metadata_router};
//!
//! let config = ResourceServerConfig::new(
//!     "https://mcp.example.com/mcp",
//!     "https://auth.example.com/",
//! )?
//! .with_scopes_supported(["mcp:access"]);
//!
//! let app = axum::Router::new()
//!     .nest_service("/mcp", mcp_service)
//!     .merge(metadata_router(config));
//! ```

use super::{ResourceServerConfig, WELL_KNOWN_PATH};
use axum::{Json, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Bearer token delivery methods this server accepts.
const BEARER_METHODS: &[&str] = &["header"];

/// OAuth 2.0 Protected Resource Metadata ([RFC 9728](https://datatracker.ietf.org/doc/html/rfc9728)).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// The resource identifier, canonical URI of this MCP server.
    pub resource: String,

    /// Authorization server(s) that can issue tokens for this resource.
    ///
    /// MUST contain at least one entry.
    pub authorization_servers: Vec<String>,

    /// Bearer token methods supported. Always `["header"]` here.
    pub bearer_methods_supported: Vec<String>,

    /// Scopes supported by this resource. Omitted when none are advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// URL of the resource documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
}

impl ProtectedResourceMetadata {
    /// Build the document from configuration.
    ///
    /// `authorization_servers` carries the issuer verbatim, the same value
    /// the token verifier checks `iss` against.
    pub fn from_config(config: &ResourceServerConfig) -> Self {
        let scopes = config.scopes_supported();
        Self {
            resource: config.resource().to_owned(),
            authorization_servers: vec![config.issuer().to_owned()],
            bearer_methods_supported: BEARER_METHODS.iter().map(|m| (*m).to_owned()).collect(),
            scopes_supported: (!scopes.is_empty()).then(|| scopes.to_vec()),
            resource_documentation: config.resource_documentation().map(str::to_owned),
        }
    }
}

/// Create an axum [`Router`](axum::Router) that serves the Protected Resource
/// Metadata at `/.well-known/oauth-protected-resource` and at the
/// resource-scoped variant (e.g. `/.well-known/oauth-protected-resource/mcp`).
///
/// The endpoint is unauthenticated. The document is rebuilt from `config`
/// on every request.
pub fn metadata_router(config: ResourceServerConfig) -> axum::Router {
    let config = Arc::new(config);
    let scoped_path = config.scoped_metadata_path();

    let handler = {
        let config = config.clone();
        move || {
            let config = config.clone();
            async move { Json(ProtectedResourceMetadata::from_config(&config)).into_response() }
        }
    };

    let router = axum::Router::new().route(WELL_KNOWN_PATH, axum::routing::get(handler.clone()));
    if scoped_path == WELL_KNOWN_PATH {
        router
    } else {
        router.route(&scoped_path, axum::routing::get(handler))
    }
}
