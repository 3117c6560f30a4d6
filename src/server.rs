/// Server setup and initialization
///
/// Wires together all components: credentials, registry, execution engine, and HTTP routes.
/// Provides the main application factory function for creating the Axum app.

use crate::{
    api::{create_routes, AppState},
    config::Config,
    credentials::{CredentialStore, MemoryCredentialStore},
    runtime::{engine::ExecutionEngine, executor::NodeExecutor, session::TestSessions},
    workflow::{executions::MemoryExecutionLog, registry::WorkflowRegistry},
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Build the application state from configuration
///
/// Loads credentials and workflow definitions from disk and constructs the
/// engine with the built-in node handlers.
pub async fn create_state(config: &Config) -> Result<AppState> {
    tracing::info!("🔐 Initializing credential store");
    let credentials: Arc<dyn CredentialStore> = match &config.engine.credentials_file {
        Some(path) => Arc::new(
            MemoryCredentialStore::from_file(path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load credentials: {}", e))?,
        ),
        None => {
            tracing::warn!("⚠️ No credentials file configured; credential lookups will fail");
            Arc::new(MemoryCredentialStore::new())
        }
    };

    tracing::info!("📊 Initializing workflow registry");
    let registry = Arc::new(WorkflowRegistry::new());
    tracing::info!("📥 Loading workflows from {}", config.engine.workflows_dir);
    registry
        .load_dir(&config.engine.workflows_dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load workflows: {}", e))?;

    tracing::info!("⚙️ Initializing node executor");
    let executor = NodeExecutor::new(&config.engine, credentials)
        .map_err(|e| anyhow::anyhow!("Failed to initialize node executor: {}", e))?;

    tracing::info!("🚀 Initializing execution engine");
    let engine = Arc::new(ExecutionEngine::new(Arc::new(executor)));

    Ok(AppState {
        registry,
        engine,
        executions: Arc::new(MemoryExecutionLog::default()),
        sessions: Arc::new(TestSessions::new(Duration::from_secs(config.engine.test_session_ttl_secs))),
    })
}

/// Create the main Axum application with all routes
pub fn create_app(state: AppState) -> Router {
    tracing::info!("📡 Creating HTTP router with all endpoints");
    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        .merge(create_routes(state))
}

/// Start the HTTP server with the given configuration
///
/// Creates the application and starts the Axum server on the configured address and port.
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hookflow=info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting Hookflow server...");

    let state = create_state(&config).await?;
    let app = create_app(state);

    // Bind to the configured address
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
