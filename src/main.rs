//! Sentinel Gateway - prompt policy gateway
//!
//! This service evaluates prompts against locally defined rules and a set
//! of classifier modules before they are allowed to reach a model.

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;
use tokio::net::TcpListener;

mod api;
mod config;
mod domain;
mod engine;
mod error;
mod logging;
mod storage;

use crate::api::build_router;
use crate::config::Config;
use crate::engine::{
    build_status_provider, ClassifierClient, HttpTransport, PolicyOrchestrator, ReqwestTransport,
};
use crate::storage::GatewayRepository;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The policy orchestrator.
    pub orchestrator: Arc<PolicyOrchestrator>,
    /// Database repository.
    pub repository: GatewayRepository,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is expected in production
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    logging::init();

    tracing::info!("Starting Sentinel Gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        database = %config.database.url,
        mode = ?config.modules.mode,
        failure_mode = ?config.evaluation.failure_mode,
        "Configuration loaded"
    );

    let pool = SqlitePool::connect(&config.database.url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            anyhow::anyhow!("Database connection error: {}", e)
        })?;

    let repository = GatewayRepository::new(pool);
    repository.init_schema().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize database schema");
        anyhow::anyhow!("Schema initialization error: {}", e)
    })?;

    tracing::info!("Database connected and schema initialized");

    // Build the policy pipeline
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
    let status = build_status_provider(&config.modules, transport.clone()).map_err(|e| {
        tracing::error!(error = %e, "Invalid module configuration");
        anyhow::anyhow!("Module configuration error: {}", e)
    })?;

    tracing::info!(
        modules = status.known_modules().len(),
        "Module catalog loaded"
    );

    let classifier = ClassifierClient::new(
        transport,
        config.modules.classify_timeout(),
        config.evaluation.failure_mode,
    );

    let store = Arc::new(repository.clone());
    let orchestrator = Arc::new(PolicyOrchestrator::new(
        store.clone(),
        store,
        status,
        classifier,
    ));

    let state = AppState {
        orchestrator,
        repository,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
