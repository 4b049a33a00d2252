//! Conferencing API proxy
//!
//! Thin pass-through to the external conferencing REST backend. Each
//! endpoint forwards the request body plus the auth-token/user-id header
//! pair to the configured base URL and relays the upstream status and
//! JSON body back to the caller.

use crate::api::AppCtx;
use crate::error::AppError;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::{json, Value};
use tracing::debug;

/// Client headers relayed to the conferencing backend
const FORWARDED_HEADERS: &[&str] = &["x-auth-token", "x-user-id"];

async fn forward(
    ctx: &AppCtx,
    method: reqwest::Method,
    path: &str,
    headers: &HeaderMap,
    body: Option<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let base = ctx.config.conference.api_url.trim_end_matches('/');
    let url = format!("{}/{}", base, path);
    debug!(%url, "Forwarding to conferencing backend");

    let mut request = ctx.http.request(method, &url);
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            request = request.header(*name, value);
        }
    }
    if let Some(body) = &body {
        request = request.json(body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    // reqwest and axum disagree on http versions; relay by numeric code.
    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let value = response.json::<Value>().await.unwrap_or_else(|_| json!({}));
    Ok((status, Json(value)))
}

/// POST /conference/login
pub async fn login(
    State(ctx): State<AppCtx>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    forward(
        &ctx,
        reqwest::Method::POST,
        "login",
        &headers,
        body.map(|Json(v)| v),
    )
    .await
}

/// GET /conference/me
pub async fn me(
    State(ctx): State<AppCtx>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), AppError> {
    forward(&ctx, reqwest::Method::GET, "me", &headers, None).await
}

/// GET /conference/capabilities
pub async fn capabilities(
    State(ctx): State<AppCtx>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), AppError> {
    forward(&ctx, reqwest::Method::GET, "capabilities", &headers, None).await
}

/// POST /conference/call.create
pub async fn call_create(
    State(ctx): State<AppCtx>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    forward(
        &ctx,
        reqwest::Method::POST,
        "call.create",
        &headers,
        body.map(|Json(v)| v),
    )
    .await
}

/// GET /conference/call.info/:id
pub async fn call_info(
    State(ctx): State<AppCtx>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Value>), AppError> {
    forward(
        &ctx,
        reqwest::Method::GET,
        &format!("call.info/{}", id),
        &headers,
        None,
    )
    .await
}

/// POST /conference/call.join
pub async fn call_join(
    State(ctx): State<AppCtx>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    forward(
        &ctx,
        reqwest::Method::POST,
        "call.join",
        &headers,
        body.map(|Json(v)| v),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AutomationConfig, Config, ConferenceConfig, LicenseConfig, PersistenceConfig, ServerConfig,
    };
    use axum::http::HeaderValue;
    use tempfile::TempDir;

    fn test_ctx(api_url: &str) -> (AppCtx, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = Config {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
            },
            persistence: PersistenceConfig {
                data_dir: dir.path().to_path_buf(),
            },
            automation: AutomationConfig::default(),
            conference: ConferenceConfig {
                api_url: api_url.to_string(),
                invite_host: "meet.example.com".to_string(),
            },
            license: LicenseConfig {
                api_url: "http://127.0.0.1:1".to_string(),
                key: None,
            },
        };
        (AppCtx::new(config), dir)
    }

    #[tokio::test]
    async fn test_login_forwards_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/login")
            .match_header("x-auth-token", "tok-1")
            .match_header("x-user-id", "user-9")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"session":"abc"}"#)
            .create_async()
            .await;

        let (ctx, _dir) = test_ctx(&server.url());
        let mut headers = HeaderMap::new();
        headers.insert("x-auth-token", HeaderValue::from_static("tok-1"));
        headers.insert("x-user-id", HeaderValue::from_static("user-9"));

        let (status, Json(body)) = login(
            State(ctx),
            headers,
            Some(Json(json!({"user": "user-9"}))),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"], "abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_status_is_relayed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/me")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"bad token"}"#)
            .create_async()
            .await;

        let (ctx, _dir) = test_ctx(&server.url());
        let (status, Json(body)) = me(State(ctx), HeaderMap::new()).await.unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "bad token");
    }

    #[tokio::test]
    async fn test_call_info_path_is_built() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/call.info/42")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"42"}"#)
            .create_async()
            .await;

        let (ctx, _dir) = test_ctx(&server.url());
        let (status, _) = call_info(State(ctx), Path("42".to_string()), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let (ctx, _dir) = test_ctx("http://127.0.0.1:1");
        let result = me(State(ctx), HeaderMap::new()).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }
}
