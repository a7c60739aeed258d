//! HTTP DTOs for the service info and health endpoints.

use serde::Serialize;

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub model: String,
    pub features: Features,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Serialize)]
pub struct Features {
    pub streaming: bool,
    pub websocket: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub chat: &'static str,
}

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub environment: &'static str,
    pub services: ServiceStatus,
    pub active_sessions: usize,
}

/// Readiness of each collaborator as far as this process can tell.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub llm: &'static str,
    pub retrieval: &'static str,
    pub websocket: &'static str,
}
