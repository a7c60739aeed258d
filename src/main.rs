//! SmartHealth server entry point.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smarthealth::adapters::ai::{OpenAIConfig, OpenAIProvider};
use smarthealth::adapters::auth::JwtTokenAuthenticator;
use smarthealth::adapters::retrieval::HttpRetrievalService;
use smarthealth::adapters::websocket::{ChatState, QueryServices, SessionRegistry};
use smarthealth::adapters::{app_router, AppState};
use smarthealth::application::{AnswerGenerator, GenerationSettings};
use smarthealth::config::{AppConfig, ServerConfig};
use smarthealth::ports::AIProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let provider = Arc::new(OpenAIProvider::new(OpenAIConfig::from_config(&config.ai))?);
    let provider_info = provider.provider_info();
    let generator = Arc::new(AnswerGenerator::new(
        provider,
        GenerationSettings::from_config(&config.ai),
    ));
    let retrieval = Arc::new(HttpRetrievalService::new(&config.retrieval)?);
    let services = QueryServices::new(retrieval, generator, &config.session);

    let registry = Arc::new(SessionRegistry::new());
    let state = AppState {
        chat: ChatState {
            authenticator: Arc::new(JwtTokenAuthenticator::from_config(&config.auth)),
            registry: registry.clone(),
            services: Arc::new(services),
            emitter_capacity: config.session.emitter_capacity,
        },
        environment: config.server.environment,
        provider: provider_info.clone(),
    };

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = config.server.environment.as_str(),
        model = %provider_info.model,
        streaming = provider_info.supports_streaming,
        "SmartHealth listening"
    );

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` overrides
/// the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal(registry: Arc<SessionRegistry>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, closing chat sessions");
    registry.close_all().await;
}
