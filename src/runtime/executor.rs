/// Node execution dispatch
///
/// Holds one handler per node kind and runs a node through it. This is the
/// failure boundary of the engine: whatever a handler returns as an error is
/// turned into an `{error, message}` output here, so one failing node never
/// stops the run.

use crate::{
    config::EngineConfig,
    credentials::{CredentialError, CredentialStore},
    runtime::{
        nodes::{
            code_run::{CodeRunHandler, CodeRunner, ProcessCodeRunner},
            conditional::ConditionalHandler,
            http::HttpHandler,
            llm_call::LlmCallHandler,
            passthrough::PassthroughHandler,
            trigger::TriggerHandler,
        },
        output::NodeOutput,
        router::VisibleInputs,
    },
    workflow::types::{Node, NodeKind, TriggerEvent},
};
use anyhow::Result;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use thiserror::Error;

/// Node-local failures
///
/// Each variant maps to the `error` category recorded in the node's output.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A required configuration field is absent
    #[error("missing required config field '{0}'")]
    MissingConfig(String),

    /// Configuration is present but unusable
    #[error("{0}")]
    InvalidConfig(String),

    /// Transport-level HTTP failure
    #[error("{0}")]
    Http(String),

    /// Request or process exceeded its timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Credential lookup failed
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Malformed condition clause
    #[error("{0}")]
    Condition(String),

    /// External code runtime failed or exited non-zero
    #[error("{0}")]
    CodeRun(String),

    /// LLM provider rejected the call or answered with something unusable
    #[error("{0}")]
    Llm(String),
}

impl NodeError {
    /// Category recorded in the `error` field of the output
    pub fn category(&self) -> &'static str {
        match self {
            NodeError::MissingConfig(_) | NodeError::InvalidConfig(_) => "Invalid node configuration",
            NodeError::Http(_) => "HTTP request failed",
            NodeError::Timeout(_) => "Timed out",
            NodeError::Credential(_) => "Credential error",
            NodeError::Condition(_) => "Condition evaluation failed",
            NodeError::CodeRun(_) => "Code execution failed",
            NodeError::Llm(_) => "LLM call failed",
        }
    }
}

impl From<NodeError> for NodeOutput {
    fn from(err: NodeError) -> Self {
        NodeOutput::error(err.category(), err.to_string())
    }
}

/// Per-run facts handlers may need besides their inputs
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Workflow being run
    pub workflow_id: String,
    /// Execution id of the run (empty for single-node tests)
    pub execution_id: String,
    /// The inbound request that started the run
    pub trigger: TriggerEvent,
}

/// Implementation of one node kind
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Produce the node's output from its configuration and visible inputs
    async fn execute(&self, node: &Node, inputs: &VisibleInputs, ctx: &RunContext) -> Result<NodeOutput, NodeError>;
}

/// Registry of node handlers keyed by node kind
///
/// Kinds without a registered handler run as passthrough, so adding a node
/// type means registering a handler and nothing else.
pub struct NodeExecutor {
    handlers: HashMap<NodeKind, Arc<dyn NodeHandler>>,
    fallback: Arc<dyn NodeHandler>,
}

impl std::fmt::Debug for NodeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(NodeKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("NodeExecutor").field("handlers", &kinds).finish()
    }
}

impl NodeExecutor {
    /// Executor with no handlers: every node runs as passthrough
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(PassthroughHandler),
        }
    }

    /// Executor with the built-in handlers, running code in external processes
    pub fn new(config: &EngineConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let runner: Arc<dyn CodeRunner> = Arc::new(ProcessCodeRunner::new(config.code_runtimes.clone()));
        Self::with_code_runner(config, credentials, runner)
    }

    /// Executor with the built-in handlers and a caller-supplied code runner
    pub fn with_code_runner(
        config: &EngineConfig,
        credentials: Arc<dyn CredentialStore>,
        runner: Arc<dyn CodeRunner>,
    ) -> Result<Self> {
        let http_timeout = Duration::from_secs(config.http_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        let executor = Self::empty()
            .register(NodeKind::Trigger, TriggerHandler)
            .register(
                NodeKind::Http,
                HttpHandler::new(client.clone(), Arc::clone(&credentials), http_timeout),
            )
            .register(NodeKind::Conditional, ConditionalHandler)
            .register(
                NodeKind::CodeRun,
                CodeRunHandler::new(runner, Duration::from_secs(config.code_timeout_secs)),
            )
            .register(
                NodeKind::LlmCall,
                LlmCallHandler::new(client, credentials, config.llm_url.clone(), http_timeout),
            );

        tracing::debug!("⚙️ Node executor ready: {:?}", executor);
        Ok(executor)
    }

    /// Register (or replace) the handler for a node kind
    pub fn register(mut self, kind: NodeKind, handler: impl NodeHandler + 'static) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Execute a single node
    ///
    /// Never fails: handler errors come back as error outputs.
    pub async fn execute_node(&self, node: &Node, inputs: &VisibleInputs, ctx: &RunContext) -> NodeOutput {
        tracing::info!("🚀 Starting node execution: {} (type: {})", node.id, node.kind.as_str());
        tracing::debug!(
            "📥 Input data: {}",
            serde_json::to_string(&inputs.positional).unwrap_or_else(|_| "invalid_json".to_string())
        );

        let start_time = std::time::Instant::now();
        let handler = match self.handlers.get(&node.kind) {
            Some(handler) => handler,
            None => {
                if let NodeKind::Other(type_name) = &node.kind {
                    tracing::warn!("⚠️ Unknown node type '{}' on '{}', passing input through", type_name, node.id);
                }
                &self.fallback
            }
        };

        let result = handler.execute(node, inputs, ctx).await;
        let duration = start_time.elapsed();

        match result {
            Ok(output) => {
                tracing::info!("✅ Node execution completed: {} in {:?}", node.id, duration);
                tracing::debug!(
                    "📤 Output data: {}",
                    serde_json::to_string(&output).unwrap_or_else(|_| "invalid_json".to_string())
                );
                output
            }
            Err(e) => {
                tracing::error!("❌ Node execution failed: {} in {:?} - Error: {}", node.id, duration, e);
                e.into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::NodeData;
    use serde_json::json;

    struct Failing;

    #[async_trait]
    impl NodeHandler for Failing {
        async fn execute(&self, _: &Node, _: &VisibleInputs, _: &RunContext) -> Result<NodeOutput, NodeError> {
            Err(NodeError::MissingConfig("url".to_string()))
        }
    }

    fn node(kind: NodeKind) -> Node {
        Node {
            id: "n".to_string(),
            kind,
            data: NodeData::default(),
        }
    }

    #[tokio::test]
    async fn test_errors_become_outputs() {
        let executor = NodeExecutor::empty().register(NodeKind::Http, Failing);
        let output = executor
            .execute_node(&node(NodeKind::Http), &VisibleInputs::default(), &RunContext::default())
            .await;

        assert_eq!(
            output.to_value(),
            json!({ "error": "Invalid node configuration", "message": "missing required config field 'url'" })
        );
    }

    #[tokio::test]
    async fn test_unknown_kind_passes_through() {
        let executor = NodeExecutor::empty();
        let inputs = VisibleInputs::positional(vec![json!({ "a": 1 }), json!({ "b": 2 })]);
        let output = executor
            .execute_node(&node(NodeKind::Other("retired".to_string())), &inputs, &RunContext::default())
            .await;

        assert_eq!(output.to_value(), json!({ "a": 1 }));
    }
}
