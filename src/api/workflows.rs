/// Workflow snapshot endpoints
///
/// The definition store pushes snapshots here; each change swaps the registry
/// entry atomically, so runs already in flight keep the snapshot they started with.

use crate::{
    api::{api_error, ApiError, AppState},
    workflow::types::Workflow,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};

/// Response for snapshot upsert/delete operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
}

/// Create workflow snapshot routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows))
        .route(
            "/api/workflows/{id}",
            get(get_workflow).put(put_workflow).delete(delete_workflow),
        )
}

/// List registered workflow ids
///
/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "workflows": state.registry.list_ids() }))
}

/// Fetch one snapshot
///
/// GET /api/workflows/{id}
async fn get_workflow(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Workflow>, ApiError> {
    state
        .registry
        .get(&id)
        .map(|workflow| Json(workflow.as_ref().clone()))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Workflow '{}' not found", id)))
}

/// Insert or replace a snapshot
///
/// PUT /api/workflows/{id}
/// Body: { "id": "...", "name": "...", "nodes": [...], "edges": [...] }
async fn put_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut workflow): Json<Workflow>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    if workflow.id.is_empty() {
        workflow.id = id.clone();
    }
    if workflow.id != id {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Body id '{}' does not match path id '{}'", workflow.id, id),
        ));
    }
    workflow
        .validate()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    tracing::info!("🔥 Loaded workflow snapshot: {} ({} nodes)", id, workflow.nodes.len());
    state.registry.upsert(workflow);

    Ok(Json(WorkflowResponse {
        message: format!("Workflow '{}' loaded", id),
        id,
    }))
}

/// Remove a snapshot
///
/// DELETE /api/workflows/{id}
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    if !state.registry.remove(&id) {
        return Err(api_error(StatusCode::NOT_FOUND, format!("Workflow '{}' not found", id)));
    }
    tracing::info!("🗑️ Removed workflow snapshot: {}", id);
    Ok(Json(WorkflowResponse {
        message: format!("Workflow '{}' removed", id),
        id,
    }))
}
