#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{any, post},
    Router,
};
use hookflow::{
    config::EngineConfig,
    credentials::{Credential, CredentialStore, MemoryCredentialStore},
    runtime::{
        nodes::code_run::{CodeRunner, ProcessOutput},
        ExecutionEngine, NodeError, NodeExecutor,
    },
    Workflow,
};
use serde_json::{json, Value};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

/// Engine config pointing at nothing external
pub fn engine_config(llm_url: &str) -> EngineConfig {
    EngineConfig {
        workflows_dir: "does-not-exist".to_string(),
        credentials_file: None,
        http_timeout_secs: 5,
        code_timeout_secs: 5,
        code_runtimes: BTreeMap::new(),
        llm_url: llm_url.to_string(),
        test_session_ttl_secs: 60,
    }
}

pub fn credential(value: Value) -> Credential {
    serde_json::from_value(value).unwrap()
}

/// Credentials used across the HTTP tests
pub fn credentials() -> Arc<dyn CredentialStore> {
    Arc::new(
        MemoryCredentialStore::new()
            .with("bearer", credential(json!({ "type": "bearer", "data": { "token": "secret-token" } })))
            .with(
                "query-key",
                credential(json!({ "type": "api_key", "data": { "apiKey": "k-1", "in": "query", "paramName": "key" } })),
            )
            .with(
                "tenant",
                credential(json!({ "type": "custom", "data": { "headers": { "X-Tenant": "acme" } } })),
            )
            .with("llm", credential(json!({ "type": "api_key", "data": { "apiKey": "sk-test" } }))),
    )
}

/// Code runner answering every program with fixed stdout
pub struct FixedRunner(pub String);

#[async_trait]
impl CodeRunner for FixedRunner {
    async fn run(&self, _language: &str, _program: &str, _timeout: Duration) -> Result<ProcessOutput, NodeError> {
        Ok(ProcessOutput {
            stdout: self.0.clone(),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

pub fn executor(llm_url: &str) -> NodeExecutor {
    NodeExecutor::with_code_runner(
        &engine_config(llm_url),
        credentials(),
        Arc::new(FixedRunner(r#"{"computed": true}"#.to_string())),
    )
    .unwrap()
}

pub fn engine(llm_url: &str) -> ExecutionEngine {
    ExecutionEngine::new(Arc::new(executor(llm_url)))
}

pub fn workflow(value: Value) -> Arc<Workflow> {
    Arc::new(serde_json::from_value(value).unwrap())
}

async fn echo(
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
    Json(json!({
        "query": query,
        "authorization": header("authorization"),
        "tenant": header("x-tenant"),
        "contentType": header("content-type"),
        "body": body,
    }))
}

async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "code": code })))
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "late"
}

async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
    }
    if body["model"] == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "upstream down" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello" } }],
            "received": body,
        })),
    )
}

/// Start a loopback upstream server; returns its base URL
pub async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/slow", any(slow))
        .route("/v1/chat/completions", post(chat));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
