//! # rmcp-oauth
//!
//! OAuth 2.1 resource server support for MCP servers built with
//! [rmcp](https://docs.rs/rmcp) and [axum](https://docs.rs/axum).
//!
//! ## Bearer Token Middleware
//!
//! Verifies `Authorization: Bearer` tokens against the authorization
//! server's JWKS before a request reaches the MCP service, and publishes
//! the Protected Resource Metadata (RFC 9728) clients need to find that
//! authorization server.
//!
//! ```rust,ignore
//! use rmcp_oauth::auth::{AuthLayer, BearerAuth, jwt::TokenVerifier};
//! use rmcp_oauth::auth::oauth::{ResourceServerConfig, metadata_router};
//!
//! let config = ResourceServerConfig::new(
//!     "https://mcp.example.com/mcp",
//!     "https://tenant.auth0.com/",
//! )?;
//! let verifier = TokenVerifier::builder(config.clone()).build()?;
//!
//! let app = axum::Router::new()
//!     .nest_service("/mcp", service)
//!     .layer(AuthLayer::new(BearerAuth::new(verifier)).with_resource_server(config.clone()))
//!     .merge(metadata_router(config));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub use axum;

pub mod auth;
