use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use rmcp_oauth::auth::{Validator, jwt::AccessToken, oauth::ResourceServerConfig};
use tower::ServiceExt;
use wmcp::{Server, router};

const ISSUER: &str = "https://issuer.example/";

/// Accepts `reader` (mcp:access) and `invoker` (mcp:access mcp:invoke).
#[derive(Clone)]
struct FixedTokens;

impl Validator for FixedTokens {
    type Claims = AccessToken;
    type Error = String;

    async fn validate(&self, token: &str) -> Result<AccessToken, String> {
        let scopes: &[&str] = match token {
            "reader" => &["mcp:access"],
            "invoker" => &["mcp:access", "mcp:invoke"],
            _ => return Err("unknown token".into()),
        };
        Ok(AccessToken {
            token: token.to_owned(),
            client_id: "client-123".into(),
            subject: None,
            scopes: scopes.iter().map(|s| (*s).to_owned()).collect(),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            resource: "https://resource.example/mcp".into(),
        })
    }
}

fn app(resource: &str, required: &[&str]) -> Router {
    let config = ResourceServerConfig::new(resource, ISSUER)
        .unwrap()
        .with_scopes_supported(["mcp:access", "mcp:invoke"]);
    router(
        config,
        FixedTokens,
        required.iter().map(|s| (*s).to_owned()).collect(),
        Server::default(),
    )
}

async fn send(app: Router, method: &str, uri: &str, token: Option<&str>) -> (StatusCode, String) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let challenge = resp
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .map(|v| v.to_str().unwrap().to_owned())
        .unwrap_or_default();
    (status, challenge)
}

#[tokio::test]
async fn metadata_is_public_at_both_paths() {
    for path in [
        "/.well-known/oauth-protected-resource",
        "/.well-known/oauth-protected-resource/mcp",
    ] {
        let resp = app("https://resource.example/mcp", &[])
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(doc["authorization_servers"][0], ISSUER);
        assert_eq!(doc["resource"], "https://resource.example/mcp");
    }
}

#[tokio::test]
async fn mcp_endpoint_requires_a_token() {
    let (status, challenge) = send(app("https://resource.example/mcp", &[]), "POST", "/mcp", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        challenge,
        "Bearer resource_metadata=\"https://resource.example/.well-known/oauth-protected-resource/mcp\""
    );

    let (status, challenge) = send(
        app("https://resource.example/mcp", &[]),
        "POST",
        "/mcp",
        Some("forged"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(challenge.starts_with("Bearer error=\"invalid_token\""));
}

#[tokio::test]
async fn valid_token_reaches_the_mcp_service() {
    let (status, _) = send(
        app("https://resource.example/mcp", &[]),
        "POST",
        "/mcp",
        Some("reader"),
    )
    .await;
    // The MCP transport rejects the empty body on its own terms.
    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert_ne!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn required_scopes_are_enforced_after_authentication() {
    let required = ["mcp:invoke"];

    let (status, _) =
        send(app("https://resource.example/mcp", &required), "POST", "/mcp", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, challenge) = send(
        app("https://resource.example/mcp", &required),
        "POST",
        "/mcp",
        Some("reader"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(challenge.contains("error=\"insufficient_scope\""));

    let (status, _) = send(
        app("https://resource.example/mcp", &required),
        "POST",
        "/mcp",
        Some("invoker"),
    )
    .await;
    assert_ne!(status, StatusCode::FORBIDDEN);
    assert_ne!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bare_origin_resource_gates_every_other_path() {
    let (status, challenge) = send(app("http://localhost:8000", &[]), "POST", "/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        challenge,
        "Bearer resource_metadata=\"http://localhost:8000/.well-known/oauth-protected-resource\""
    );

    let (status, _) = send(
        app("http://localhost:8000", &[]),
        "GET",
        "/.well-known/oauth-protected-resource",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
