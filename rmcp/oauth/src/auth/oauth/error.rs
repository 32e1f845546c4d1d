//! OAuth 2.1 challenge responses for MCP resource servers.
//!
//! Provides helpers for building `WWW-Authenticate` headers as required by
//! [RFC 6750 §3](https://datatracker.ietf.org/doc/html/rfc6750#section-3) and
//! [RFC 9728 §5.1](https://datatracker.ietf.org/doc/html/rfc9728#name-www-authenticate-response).

use super::ResourceServerConfig;
use http::HeaderValue;

/// Build a `WWW-Authenticate` header value for a 401 Unauthorized response.
///
/// Format: `Bearer [error="<code>", ]resource_metadata="<url>"[, scope="<scopes>"]`
///
/// `error` is left out when the request carried no credential at all
/// (RFC 6750 §3.1). It is never more specific than `invalid_token`.
pub fn www_authenticate_401(config: &ResourceServerConfig, error: Option<&str>) -> HeaderValue {
    let mut value = String::from("Bearer ");
    if let Some(error) = error {
        value.push_str(&format!("error=\"{error}\", "));
    }
    value.push_str(&format!("resource_metadata=\"{}\"", config.metadata_url()));
    if let Some(scope) = config.default_scope() {
        value.push_str(&format!(", scope=\"{scope}\""));
    }
    header_value(value)
}

/// Build a `WWW-Authenticate` header value for a 403 Forbidden response
/// with `insufficient_scope` error.
///
/// Format: `Bearer error="insufficient_scope", scope="<required>", resource_metadata="<url>"`
pub fn www_authenticate_403(config: &ResourceServerConfig, required_scope: &str) -> HeaderValue {
    header_value(format!(
        "Bearer error=\"insufficient_scope\", scope=\"{required_scope}\", resource_metadata=\"{}\"",
        config.metadata_url(),
    ))
}

/// Build a 403 Forbidden response with the proper `WWW-Authenticate` header
/// for insufficient scope errors.
///
/// Use this when a request has a valid token that lacks the scopes an
/// operation needs.
pub fn insufficient_scope_response(
    config: &ResourceServerConfig,
    required_scope: &str,
) -> http::Response<axum::body::Body> {
    let mut response = http::Response::new(axum::body::Body::from("insufficient scope"));
    *response.status_mut() = http::StatusCode::FORBIDDEN;
    response.headers_mut().insert(
        http::header::WWW_AUTHENTICATE,
        www_authenticate_403(config, required_scope),
    );
    response
}

// Config values are validated URLs and scope tokens, so this only falls back
// if someone configured a scope with control characters.
fn header_value(value: String) -> HeaderValue {
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
}
