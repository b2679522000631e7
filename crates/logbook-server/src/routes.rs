//! Route configuration for the logbook API.

use axum::Router;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerConfig;
use crate::guard::guard_request;
use crate::handlers::{append_log, delete_logs, health, list_logs};
use crate::state::AppState;

/// Create the logbook API router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(state.config());

    // Guard runs only on matched routes so unknown methods still get 405.
    let guarded = Router::new()
        .route("/log", post(append_log))
        .route("/logs", get(list_logs).delete(delete_logs))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard_request));

    Router::new()
        .route("/", get(health))
        .merge(guarded)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use logbook_store::{LogStore, LogStoreConfig, MemoryBackend};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::guard::TenancyMode;

    fn make_state(config: ServerConfig) -> (AppState, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = LogStore::open(config.store.clone(), backend.clone()).unwrap();
        (AppState::new(config, Arc::new(store)), backend)
    }

    fn make_router(config: ServerConfig) -> Router {
        create_router(make_state(config).0)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    fn post_log(body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/log")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = make_router(ServerConfig::default().with_api_key("s3cret"));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Logging server running");
    }

    #[tokio::test]
    async fn test_append_then_list() {
        let (state, _) = make_state(ServerConfig::default());
        let app = create_router(state);

        let (status, body) = send(app.clone(), post_log(json!({"type": "signup"}))).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        let id = json["id"].as_u64().unwrap();

        let request = Request::builder().uri("/logs").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);

        let entries: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["id"], id);
        assert_eq!(entries[0]["type"], "signup");
        assert!(entries[0]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_empty_body_appends_empty_entry() {
        let app = make_router(ServerConfig::default());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/log")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_object_body_is_rejected() {
        let (state, backend) = make_state(ServerConfig::default());
        let app = create_router(state);

        let (status, body) = send(app, post_log(json!([1, 2, 3]))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].is_string());
        // Only the initial empty collection was written.
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_unauthorized() {
        let (state, backend) = make_state(ServerConfig::default().with_api_key("s3cret"));
        let app = create_router(state);

        let mut request = post_log(json!({"type": "signup"}));
        request
            .headers_mut()
            .insert("x-api-key", "nope".parse().unwrap());
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Unauthorized");
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_per_code_requires_code() {
        let app = make_router(ServerConfig::default().with_tenancy(TenancyMode::PerCode));

        let request = Request::builder().uri("/logs").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "code required");
    }

    #[tokio::test]
    async fn test_delete_without_code_is_bad_request() {
        let app = make_router(ServerConfig::default());

        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/logs")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "code required");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let app = make_router(ServerConfig::default().with_max_body_bytes(16));

        let (status, _) = send(app, post_log(json!({"padding": "x".repeat(64)}))).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_allowed() {
        let app = make_router(ServerConfig::default().with_api_key("s3cret"));

        let request = Request::builder()
            .method(Method::PUT)
            .uri("/logs")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app, request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_cors_preflight_is_permissive_by_default() {
        let app = make_router(ServerConfig::default().with_api_key("s3cret"));

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/log")
            .header(header::ORIGIN, "http://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_cors_layer_skips_invalid_origins() {
        let config = ServerConfig::default()
            .with_cors_origin("http://localhost:3000")
            .with_cors_origin("bad\norigin");
        // Building must not panic on the invalid entry.
        let _layer = build_cors_layer(&config);
    }

    #[test]
    fn test_store_config_is_shared() {
        let config = ServerConfig::default().with_max_entries(3);
        let (state, _) = make_state(config);
        assert_eq!(state.store().capacity(), 3);
        assert_eq!(state.store().config(), &LogStoreConfig::default().with_max_entries(3));
    }
}
