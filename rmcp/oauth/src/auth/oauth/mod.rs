//! OAuth 2.1 resource server support for MCP servers.
//!
//! Implements the server-side (resource server) requirements of the
//! [MCP Authorization specification](https://modelcontextprotocol.io/specification/draft/basic/authorization):
//!
//! - **Protected Resource Metadata** ([RFC 9728](https://datatracker.ietf.org/doc/html/rfc9728)):
//!   Serve `/.well-known/oauth-protected-resource` (and its resource-scoped
//!   variant) so MCP clients can discover authorization servers.
//!
//! - **Challenge responses**: 401 and 403 responses with proper
//!   `WWW-Authenticate` headers per [RFC 6750](https://datatracker.ietf.org/doc/html/rfc6750).
//!
//! - **Scope policy**: optional required-scope enforcement after
//!   authentication.
//!
//! - **Discovery** (`jwt` feature): read the authorization server's
//!   RFC 8414 / OIDC metadata to locate its JWKS.
//!
//! # Example
//!
//! ```rust,ignore
//! use rmcp_oauth::auth::{AuthLayer, BearerAuth};
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
//!     .layer(AuthLayer::new(BearerAuth::new(validator)).with_resource_server(config.clone()))
//!     .merge(metadata_router(config));
//! ```

mod config;
mod error;
mod metadata;
mod scope;

#[cfg(feature = "jwt")]
pub mod discovery;

pub use config::{ConfigError, ResourceServerConfig, WELL_KNOWN_PATH};
pub use error::{insufficient_scope_response, www_authenticate_401, www_authenticate_403};
pub use metadata::{ProtectedResourceMetadata, metadata_router};
pub use scope::{GrantedScopes, RequiredScopes, require_scopes};
