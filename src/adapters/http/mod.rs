//! HTTP adapters - router assembly and service endpoints.
//!
//! Routes:
//! - `GET /` - service info
//! - `GET /health` - health check
//! - `GET /ws/chat` - chat channel (WebSocket upgrade)

pub mod system;

use axum::extract::FromRef;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{ws_chat_handler, ChatState};
use crate::config::Environment;
use crate::ports::ProviderInfo;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatState,
    pub environment: Environment,
    pub provider: ProviderInfo,
}

impl FromRef<AppState> for ChatState {
    fn from_ref(state: &AppState) -> Self {
        state.chat.clone()
    }
}

/// Creates the application router with all routes and tracing.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(system::service_info))
        .route("/health", get(system::health))
        .route("/ws/chat", get(ws_chat_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::auth::JwtTokenAuthenticator;
    use crate::adapters::retrieval::InMemoryRetrievalService;
    use crate::adapters::websocket::{QueryServices, SessionRegistry};
    use crate::application::{AnswerGenerator, GenerationSettings};
    use crate::config::SessionConfig;
    use crate::ports::AIProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let provider = Arc::new(MockAIProvider::new());
        let info = provider.provider_info();
        let generator = Arc::new(AnswerGenerator::new(provider, GenerationSettings::default()));
        let services = QueryServices::new(
            Arc::new(InMemoryRetrievalService::new()),
            generator,
            &SessionConfig::default(),
        );
        let secret = SecretString::new("test-secret-that-is-long-enough-for-hs256".to_string());

        AppState {
            chat: ChatState {
                authenticator: Arc::new(JwtTokenAuthenticator::new(&secret, 0)),
                registry: Arc::new(SessionRegistry::new()),
                services: Arc::new(services),
                emitter_capacity: 16,
            },
            environment: Environment::Development,
            provider: info,
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Service endpoints
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn health_reports_services_and_sessions() {
        let (status, json) = get_json(app_router(test_state()), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["environment"], "development");
        assert_eq!(json["services"]["llm"], "ready");
        assert_eq!(json["services"]["retrieval"], "configured");
        assert_eq!(json["services"]["websocket"], "enabled");
        assert_eq!(json["active_sessions"], 0);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn root_describes_service() {
        let (status, json) = get_json(app_router(test_state()), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["service"], system::SERVICE_NAME);
        assert_eq!(json["model"], "mock-model-1");
        assert_eq!(json["features"]["streaming"], true);
        assert_eq!(json["endpoints"]["chat"], "/ws/chat");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Chat handshake
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn chat_without_token_is_unauthorized() {
        let (status, json) = get_json(app_router(test_state()), "/ws/chat").await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn chat_with_garbage_token_is_unauthorized() {
        let (status, json) = get_json(app_router(test_state()), "/ws/chat?token=not.a.jwt").await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Unauthorized");
    }
}
