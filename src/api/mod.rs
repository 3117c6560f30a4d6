/// HTTP API Layer
///
/// Thin axum surface over the engine:
/// - Webhook triggers that run a workflow and report per-node success
/// - Test-listen sessions and single-node test runs for the editor
/// - Execution record lookup
/// - Loading workflow snapshots into the registry

// Workflow snapshot loading (PUT/GET/DELETE)
pub mod workflows;

// Webhook-triggered runs
pub mod webhooks;

// Test-listen sessions and single-node tests
pub mod testing;

// Execution record lookup
pub mod executions;

use crate::{
    runtime::{engine::ExecutionEngine, session::TestSessions},
    workflow::{executions::ExecutionLog, registry::WorkflowRegistry},
};
use axum::{http::StatusCode, response::Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Hot-reload registry for in-memory workflow snapshots
    pub registry: Arc<WorkflowRegistry>,
    /// Execution engine for running workflows
    pub engine: Arc<ExecutionEngine>,
    /// Where finished execution records go
    pub executions: Arc<dyn ExecutionLog>,
    /// Test-listen sessions owned by this server
    pub sessions: Arc<TestSessions>,
}

/// JSON error body with a status code
pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// All API routes, bound to the given state
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .merge(workflows::create_workflow_routes())
        .merge(webhooks::create_webhook_routes())
        .merge(testing::create_testing_routes())
        .merge(executions::create_execution_routes())
        .with_state(state)
}
