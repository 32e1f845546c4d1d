//! Optional scope policy.
//!
//! Token verification only answers "who is this and was the token minted
//! for us". Requiring particular scopes is a separate policy decision
//! layered on top: it runs after [`AuthLayer`](crate::auth::AuthLayer) has
//! inserted the verified claims and answers `403 insufficient_scope` when
//! they fall short.
//!
//! ```rust,ignore
//! use rmcp_oauth::auth::oauth::{RequiredScopes, require_scopes};
//! use rmcp_oauth::auth::jwt::AccessToken;
//!
//! let policy = RequiredScopes::new(config.clone(), ["mcp:invoke"]);
//! let app = axum::Router::new()
//!     .nest_service("/mcp", service)
//!     .layer(axum::middleware::from_fn_with_state(policy, require_scopes::<AccessToken>))
//!     .layer(AuthLayer::new(BearerAuth::new(verifier)).with_resource_server(config));
//! ```

use super::{ResourceServerConfig, insufficient_scope_response};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Claims that carry a granted scope set.
pub trait GrantedScopes {
    fn granted_scopes(&self) -> &[String];
}

/// Scopes every request must have been granted.
#[derive(Clone, Debug)]
pub struct RequiredScopes {
    config: Arc<ResourceServerConfig>,
    scopes: Arc<[String]>,
}

impl RequiredScopes {
    pub fn new<I, S>(config: ResourceServerConfig, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config: Arc::new(config),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Required scopes absent from `granted`, in configuration order.
    pub fn missing<'a>(&'a self, granted: &[String]) -> Vec<&'a str> {
        self.scopes
            .iter()
            .filter(|required| !granted.iter().any(|g| g == *required))
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

/// Axum middleware enforcing a [`RequiredScopes`] policy on claims of type `C`.
///
/// Must run inside the authentication layer; a request without claims is
/// answered with a bare 401.
pub async fn require_scopes<C>(
    State(policy): State<RequiredScopes>,
    req: Request,
    next: Next,
) -> Response
where
    C: GrantedScopes + Clone + Send + Sync + 'static,
{
    let Some(claims) = req.extensions().get::<C>() else {
        tracing::warn!("scope policy reached without verified claims");
        return http::StatusCode::UNAUTHORIZED.into_response();
    };

    let missing = policy.missing(claims.granted_scopes());
    if missing.is_empty() {
        return next.run(req).await;
    }

    let missing = missing.join(" ");
    tracing::info!(missing = %missing, "token lacks required scopes");
    insufficient_scope_response(&policy.config, &missing)
}
