//! `Authorization: Bearer` credentials.
//!
//! Only the header is consulted. A token in the query string or a form
//! body is treated as no credential at all.

use crate::auth::{Authenticator, Validator};
use std::fmt;

/// [`Authenticator`] that hands the bearer credential to a [`Validator`].
///
/// A request without a usable `Authorization: Bearer` header fails with
/// [`BearerError::Missing`] before the validator is consulted.
#[derive(Clone)]
pub struct BearerAuth<V> {
    validator: V,
}

impl<V> BearerAuth<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }
}

/// Failure produced by [`BearerAuth`].
#[derive(Debug)]
pub enum BearerError<E> {
    /// No syntactically valid bearer credential was presented.
    Missing,
    /// A credential was presented and the validator rejected it.
    Rejected(E),
}

impl<E: fmt::Display> fmt::Display for BearerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing or malformed Authorization header"),
            Self::Rejected(e) => write!(f, "bearer token rejected: {e}"),
        }
    }
}

impl<V> Authenticator for BearerAuth<V>
where
    V: Validator,
{
    type Claims = V::Claims;
    type Error = BearerError<V::Error>;

    async fn authenticate(
        &self,
        parts: &http::request::Parts,
    ) -> Result<Self::Claims, Self::Error> {
        let header = parts.headers.get(http::header::AUTHORIZATION);
        let Some(token) = header
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
        else {
            return Err(BearerError::Missing);
        };
        self.validator.validate(token).await.map_err(BearerError::Rejected)
    }

    fn challenge_error(error: &Self::Error) -> Option<&'static str> {
        match error {
            BearerError::Missing => None,
            BearerError::Rejected(_) => Some("invalid_token"),
        }
    }
}

/// Pull the credential out of an `Authorization` header value.
///
/// The auth-scheme is case-insensitive (RFC 7235 §2.1); the credential must
/// be a single non-empty token.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}
