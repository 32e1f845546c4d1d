//! Request authentication for MCP endpoints.
//!
//! [`AuthLayer`] runs an [`Authenticator`] in front of the wrapped service.
//! Accepted requests continue with the authenticator's claims stored in the
//! request extensions, where handlers pick them up with
//! `Extension<AccessToken>` (or from `http::request::Parts` inside rmcp
//! tools). Refused requests never reach the service.
//!
//! A refusal is always the same `401` with the body `unauthorized`, no
//! matter which check failed; the reason goes to the log only. With a
//! [`ResourceServerConfig`](oauth::ResourceServerConfig) attached the
//! response also carries the RFC 9728 `WWW-Authenticate` challenge.
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

mod bearer;

pub mod oauth;

#[cfg(feature = "jwt")]
pub mod jwks;
#[cfg(feature = "jwt")]
pub mod jwt;

pub use bearer::{BearerAuth, BearerError};

use axum::body::Body;
use futures::future::BoxFuture;
use http::{Request, Response, StatusCode, request::Parts};
use oauth::{ResourceServerConfig, www_authenticate_401};
use std::task::{Context, Poll};

const UNAUTHORIZED_BODY: &str = "unauthorized";

/// Decides whether a request may proceed.
pub trait Authenticator: Clone + Send + Sync + 'static {
    /// Inserted into the request extensions on success.
    type Claims: Clone + Send + Sync + 'static;

    /// Logged on failure, never sent to the client.
    type Error: std::fmt::Display + Send;

    fn authenticate(
        &self,
        parts: &Parts,
    ) -> impl Future<Output = Result<Self::Claims, Self::Error>> + Send;

    /// RFC 6750 `error` code for the 401 challenge.
    ///
    /// `None` means no credential was presented at all, and the challenge
    /// then carries no error code.
    fn challenge_error(_error: &Self::Error) -> Option<&'static str> {
        Some("invalid_token")
    }
}

/// Checks a raw credential string, typically a bearer token.
///
/// Wrap an implementation in [`BearerAuth`] to get an [`Authenticator`]
/// that reads the credential from the `Authorization` header.
pub trait Validator: Clone + Send + Sync + 'static {
    type Claims: Clone + Send + Sync + 'static;
    type Error: std::fmt::Display + Send;

    fn validate(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<Self::Claims, Self::Error>> + Send;
}

/// Tower [`Layer`](tower::Layer) producing [`AuthService`].
#[derive(Clone)]
pub struct AuthLayer<A> {
    authenticator: A,
    challenge: Option<ResourceServerConfig>,
}

impl<A> AuthLayer<A> {
    pub fn new(authenticator: A) -> Self {
        Self {
            authenticator,
            challenge: None,
        }
    }

    /// Point 401 challenges at this resource server's metadata document.
    ///
    /// Without it a refusal is a bare 401 with no `WWW-Authenticate`.
    pub fn with_resource_server(mut self, config: ResourceServerConfig) -> Self {
        self.challenge = Some(config);
        self
    }
}

impl<A: Clone, S> tower::Layer<S> for AuthLayer<A> {
    type Service = AuthService<A, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            authenticator: self.authenticator.clone(),
            challenge: self.challenge.clone(),
            inner,
        }
    }
}

/// Runs the [`Authenticator`] and forwards only accepted requests.
#[derive(Clone)]
pub struct AuthService<A, S> {
    authenticator: A,
    challenge: Option<ResourceServerConfig>,
    inner: S,
}

impl<A, S, B> tower::Service<Request<B>> for AuthService<A, S>
where
    A: Authenticator,
    S: tower::Service<Request<B>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let authenticator = self.authenticator.clone();
        let challenge = self.challenge.clone();
        // the readied service goes into the future, a fresh clone stays
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let claims = match authenticator.authenticate(&parts).await {
                Ok(claims) => claims,
                Err(err) => {
                    tracing::debug!(
                        method = %parts.method,
                        path = %parts.uri.path(),
                        error = %err,
                        "request rejected"
                    );
                    return Ok(unauthorized(challenge.as_ref(), A::challenge_error(&err)));
                }
            };

            let mut req = Request::from_parts(parts, body);
            req.extensions_mut().insert(claims);
            inner.call(req).await
        })
    }
}

fn unauthorized(challenge: Option<&ResourceServerConfig>, error: Option<&str>) -> Response<Body> {
    let mut response = Response::new(Body::from(UNAUTHORIZED_BODY));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    if let Some(config) = challenge {
        response.headers_mut().insert(
            http::header::WWW_AUTHENTICATE,
            www_authenticate_401(config, error),
        );
    }
    response
}
