/// Execution record lookup

use crate::{
    api::{api_error, ApiError, AppState},
    runtime::record::ExecutionRecord,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};

pub fn create_execution_routes() -> Router<AppState> {
    Router::new().route("/api/executions/{id}", get(get_execution))
}

/// GET /api/executions/{id}
async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExecutionRecord>, ApiError> {
    state
        .executions
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Execution '{}' not found", id)))
}
