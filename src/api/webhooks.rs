/// Webhook execution endpoints
///
/// Any request to `/webhook/{workflow_id}` (with or without a trailing path)
/// runs the workflow's current snapshot with the request as trigger event.
/// The response reports overall status and per-node success so a partially
/// successful run is visible as such.

use crate::{
    api::AppState,
    runtime::record::{ExecutionRecord, RunStatus},
    workflow::types::TriggerEvent,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::Json,
    routing::any,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Per-node outcome in a webhook response
#[derive(Debug, Serialize)]
pub struct NodeSummary {
    pub success: bool,
}

/// Webhook response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub execution_id: String,
    pub status: RunStatus,
    pub execution_order: Vec<String>,
    pub nodes: BTreeMap<String, NodeSummary>,
    pub error_message: Option<String>,
}

impl From<&ExecutionRecord> for WebhookResponse {
    fn from(record: &ExecutionRecord) -> Self {
        Self {
            execution_id: record.id.clone(),
            status: record.status,
            execution_order: record.execution_order.clone(),
            nodes: record
                .node_results
                .iter()
                .map(|(id, result)| {
                    (
                        id.clone(),
                        NodeSummary {
                            success: !result.output.is_error(),
                        },
                    )
                })
                .collect(),
            error_message: record.error_message.clone(),
        }
    }
}

/// Create webhook routes
pub fn create_webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/webhook/{workflow_id}", any(execute_webhook))
        .route("/webhook/{workflow_id}/{*path}", any(execute_webhook))
}

/// Build the trigger event from the inbound request
pub fn trigger_event(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    query: BTreeMap<String, String>,
    body: &[u8],
) -> TriggerEvent {
    let mut header_values: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        header_values
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
    };

    TriggerEvent {
        method: method.as_str().to_string(),
        url: uri.to_string(),
        headers: header_values,
        query,
        body,
    }
}

/// Execute a workflow via webhook trigger
///
/// ANY /webhook/{workflow_id}[/{path}]
/// Body: JSON payload (non-JSON bodies arrive as a string)
async fn execute_webhook(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<BTreeMap<String, String>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let workflow_id = params.get("workflow_id").cloned().unwrap_or_default();
    tracing::info!("📥 Webhook request received: {} {}", method, uri);

    let trigger = trigger_event(&method, &uri, &headers, query, &body);

    tracing::debug!("🔍 Looking up workflow in registry: {}", workflow_id);
    let workflow = state.registry.get(&workflow_id);
    let found = workflow.is_some();

    let record = state.engine.run(&workflow_id, workflow, trigger).await;

    if state.sessions.deposit(&workflow_id, &record).await {
        tracing::debug!("🧪 Execution {} delivered to test session", record.id);
    }
    let response = WebhookResponse::from(&record);
    state.executions.store(record).await;

    let status = match response.status {
        RunStatus::Success => StatusCode::OK,
        _ if !found => StatusCode::NOT_FOUND,
        // 422 for execution failures vs 500 for system errors
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(response))
}
