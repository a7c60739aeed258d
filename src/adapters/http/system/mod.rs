//! Service metadata endpoints (`/`, `/health`).

mod dto;
mod handlers;

pub use dto::{Endpoints, Features, HealthResponse, ServiceInfo, ServiceStatus};
pub use handlers::{health, service_info, SERVICE_NAME};
