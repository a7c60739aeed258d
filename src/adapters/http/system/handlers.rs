//! HTTP handlers for service metadata.

use axum::extract::{Json, State};

use crate::adapters::http::AppState;
use super::dto::{Endpoints, Features, HealthResponse, ServiceInfo, ServiceStatus};

pub const SERVICE_NAME: &str = "SmartHealth API";

/// `GET /` - service name, version and what it offers.
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment.as_str(),
        model: state.provider.model.clone(),
        features: Features {
            streaming: state.provider.supports_streaming,
            websocket: true,
        },
        endpoints: Endpoints {
            health: "/health",
            chat: "/ws/chat",
        },
    })
}

/// `GET /health` - liveness plus the number of open chat channels.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        environment: state.environment.as_str(),
        services: ServiceStatus {
            llm: "ready",
            retrieval: "configured",
            websocket: "enabled",
        },
        active_sessions: state.chat.registry.active_count().await,
    })
}
