//! API route modules.

pub mod chat;
pub mod health;
pub mod sessions;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::get,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

/// Create the main router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins());

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .merge(chat::router())
        .merge(sessions::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for browser clients: listed origins, GET/POST/OPTIONS, any header,
/// no credentials. A `*` entry allows every origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use clap::Parser;
    use http_body_util::BodyExt;
    use parley_core::chat::{ChatMessage, ChatModel};
    use parley_core::storage::{
        BackendError, BackendResult, FallbackBackend, LocalBackend, MemoryBackend, PutOutcome,
        StorageBackend,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    /// Replies with the number of messages it was sent.
    struct CountingModel;

    #[async_trait]
    impl ChatModel for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> parley_core::Result<String> {
            Ok(format!("saw {} messages", messages.len()))
        }
    }

    struct DownModel;

    #[async_trait]
    impl ChatModel for DownModel {
        fn name(&self) -> &str {
            "down"
        }

        async fn complete(&self, _: &[ChatMessage]) -> parley_core::Result<String> {
            Err(parley_core::Error::provider("rate limited"))
        }
    }

    /// Primary whose writes always time out.
    struct TimingOutBackend;

    #[async_trait]
    impl StorageBackend for TimingOutBackend {
        fn describe(&self) -> &'static str {
            "timing-out"
        }

        async fn get(&self, key: &str) -> BackendResult<Vec<u8>> {
            Err(BackendError::NotFound {
                key: key.to_string(),
            })
        }

        async fn put(&self, key: &str, _: &[u8], _: &str) -> BackendResult<PutOutcome> {
            Err(BackendError::Transport {
                key: key.to_string(),
                message: "timeout".into(),
                transient: true,
            })
        }

        async fn list(&self, _: &str) -> BackendResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn test_config() -> Config {
        Config::try_parse_from([
            "parley-server",
            "--use-s3",
            "false",
            "--cors-origins",
            "http://localhost:3000",
        ])
        .unwrap()
    }

    fn app_with(backend: Arc<dyn StorageBackend>, model: Arc<dyn ChatModel>) -> Router {
        let state = AppState::new(test_config(), backend, model, "be brief".to_string());
        create_router(state)
    }

    fn app() -> Router {
        app_with(Arc::new(MemoryBackend::new()), Arc::new(CountingModel))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_chat(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let app = app();

        let (status, body) = send(&app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["memory_enabled"], true);
        assert_eq!(body["storage"], "local");
        assert_eq!(body["ai_model"], "counting");

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["use_s3"], false);
        assert_eq!(body["storage_backend"], "memory");
        assert_eq!(body["degraded_sessions"], 0);
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let app = app();

        let (status, body) = send(&app, post_chat(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "saw 2 messages");
        assert!(body.get("degraded").is_none());
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            post_chat(json!({"message": "again", "session_id": session_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "saw 4 messages");

        let (status, body) = send(&app, get(&format!("/conversation/{session_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], session_id.as_str());
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hi");
        assert!(messages[0]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(messages[3]["role"], "assistant");

        let (status, body) = send(&app, get("/sessions")).await;
        assert_eq!(status, StatusCode::OK);
        let sessions = body["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["session_id"], session_id.as_str());
        assert_eq!(sessions[0]["message_count"], 4);
        assert_eq!(sessions[0]["last_message"], "saw 4 messages");
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_empty() {
        let (status, body) = send(&app(), get("/conversation/never-used")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_invalid_session_id_is_bad_request() {
        let app = app();

        let (status, body) = send(
            &app,
            post_chat(json!({"message": "hi", "session_id": "a b"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SESSION_ID");

        let (status, _) = send(&app, get("/conversation/.hidden")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_model_failure_is_bad_gateway() {
        let app = app_with(Arc::new(MemoryBackend::new()), Arc::new(DownModel));

        let (status, body) = send(&app, post_chat(json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "MODEL_ERROR");

        let (_, body) = send(&app, get("/sessions")).await;
        assert_eq!(body["sessions"], json!([]));
    }

    #[tokio::test]
    async fn test_degraded_write_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FallbackBackend::new(
            Arc::new(TimingOutBackend),
            LocalBackend::new(dir.path()),
        );
        let app = app_with(Arc::new(backend), Arc::new(CountingModel));

        let (status, body) = send(
            &app,
            post_chat(json!({"message": "hi", "session_id": "s1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["degraded"], true);
        assert!(dir.path().join("s1.json").exists());

        let (_, body) = send(&app, get("/conversation/s1")).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);

        let (_, body) = send(&app, get("/health")).await;
        assert_eq!(body["degraded_sessions"], 1);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = app();

        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/chat")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .clone()
            .oneshot(preflight("http://localhost:3000"))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:3000"))
        );
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .is_none()
        );

        let response = app
            .oneshot(preflight("https://evil.example"))
            .await
            .unwrap();
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }
}
