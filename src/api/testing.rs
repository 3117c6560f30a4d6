/// Editor test endpoints
///
/// Test-listen: the editor opens a session, fires the webhook from elsewhere,
/// then polls until the captured run shows up or the session expires.
/// Node test: runs one node against upstream outputs supplied by the editor.

use crate::{
    api::{api_error, ApiError, AppState},
    runtime::{
        engine::{NodeTestRequest, NodeTestResult},
        session::SessionPoll,
    },
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde_json::{json, Value};

/// Create editor test routes
pub fn create_testing_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/workflows/{id}/test-listen",
            post(start_listening).get(poll_listening),
        )
        .route("/api/workflows/{id}/nodes/{node_id}/test", post(test_node))
}

/// Open a test-listen session
///
/// POST /api/workflows/{id}/test-listen
async fn start_listening(State(state): State<AppState>, Path(id): Path<String>) -> Json<Value> {
    let expires_at = state.sessions.start(&id).await;
    Json(json!({ "status": "listening", "expiresAt": expires_at }))
}

/// Poll a test-listen session
///
/// GET /api/workflows/{id}/test-listen
async fn poll_listening(State(state): State<AppState>, Path(id): Path<String>) -> Json<SessionPoll> {
    Json(state.sessions.poll(&id).await)
}

/// Run a single node
///
/// POST /api/workflows/{id}/nodes/{node_id}/test
/// Body (optional): { "outputs": {nodeId: output}, "conditionals": {nodeId: bool}, "trigger": {...} }
async fn test_node(
    State(state): State<AppState>,
    Path((id, node_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<NodeTestResult>, ApiError> {
    let request: NodeTestRequest = if body.iter().all(u8::is_ascii_whitespace) {
        NodeTestRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid test request: {}", e)))?
    };

    let workflow = state
        .registry
        .get(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Workflow '{}' not found", id)))?;

    state
        .engine
        .test_node(&workflow, &node_id, request)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e.to_string()))
}
