/// Hookflow: webhook-triggered workflow execution engine
///
/// Main entry point for the Hookflow server. Initializes configuration and starts
/// the HTTP server with workflow execution capabilities.

use hookflow::{config::Config, server::start_server};

/// Application entry point
///
/// Initializes the server with environment-driven configuration and starts listening.
/// The server provides:
/// - Webhook execution at /webhook/{workflow_id}/*
/// - Editor test endpoints at /api/workflows/{id}/test-listen and /api/workflows/{id}/nodes/{node_id}/test
/// - Execution records at /api/executions/{id}
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
