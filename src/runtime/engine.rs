/// Run orchestrator
///
/// Drives one workflow run: schedules the nodes once, then for each node in
/// order computes its visible inputs, executes it and records the result.
/// Node failures are already absorbed by the executor; only engine-level
/// failures (missing or invalid snapshot, broken invariants, panics) fail the run.

use crate::runtime::{
    executor::{NodeExecutor, RunContext},
    nodes::conditional::branch_result,
    output::NodeOutput,
    record::ExecutionRecord,
    router::visible_inputs,
    scheduler::schedule,
};
use crate::workflow::types::{NodeKind, TriggerEvent, Workflow};
use anyhow::Result;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc};

/// Sequential execution engine
///
/// Runs exactly one node at a time; node k+1 never starts before node k's
/// output is recorded.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    /// Node executor for handling individual node execution
    executor: Arc<NodeExecutor>,
}

/// Upstream state supplied by the caller when testing a single node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTestRequest {
    /// Recorded outputs of other nodes, keyed by node id
    #[serde(default)]
    pub outputs: HashMap<String, Value>,
    /// Recorded conditional results, keyed by node id
    #[serde(default)]
    pub conditionals: HashMap<String, bool>,
    /// Trigger event to expose to trigger nodes
    #[serde(default)]
    pub trigger: TriggerEvent,
}

/// Resolved input and output of a single-node test
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTestResult {
    pub node_id: String,
    pub input: Vec<Value>,
    pub output: NodeOutput,
    pub duration_ms: u64,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl ExecutionEngine {
    /// Create new execution engine with node executor
    pub fn new(executor: Arc<NodeExecutor>) -> Self {
        Self { executor }
    }

    /// Run a workflow snapshot to completion
    ///
    /// `workflow` is the snapshot captured by the caller at run start; `None`
    /// means the definition could not be read and finalizes the record as failed.
    /// Always returns a finished record.
    pub async fn run(&self, workflow_id: &str, workflow: Option<Arc<Workflow>>, trigger: TriggerEvent) -> ExecutionRecord {
        let mut record = ExecutionRecord::pending(workflow_id, trigger.body.clone());
        record.start();

        tracing::info!("🚀 Starting workflow execution: {} (execution: {})", workflow_id, record.id);

        let Some(workflow) = workflow else {
            tracing::error!("❌ Workflow '{}' not found", workflow_id);
            record.fail(format!("Workflow '{}' not found", workflow_id));
            return record;
        };
        if let Err(e) = workflow.validate() {
            tracing::error!("❌ Workflow '{}' is invalid: {}", workflow_id, e);
            record.fail(format!("Invalid workflow snapshot: {}", e));
            return record;
        }

        let ctx = RunContext {
            workflow_id: workflow.id.clone(),
            execution_id: record.id.clone(),
            trigger,
        };

        let outcome = AssertUnwindSafe(self.execute_nodes(&workflow, &ctx, &mut record))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output_data)) => record.succeed(output_data),
            Ok(Err(e)) => {
                tracing::error!("❌ Workflow '{}' failed: {}", workflow_id, e);
                record.fail(e.to_string());
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("💥 Workflow '{}' panicked: {}", workflow_id, message);
                record.fail(format!("Engine panic: {}", message));
            }
        }

        tracing::info!(
            "🎉 Workflow '{}' finished as {:?}: {} node(s) in {}ms",
            workflow_id,
            record.status,
            record.execution_order.len(),
            record.duration_ms.unwrap_or_default()
        );
        record
    }

    /// Execute nodes in scheduler order, returning the last executed node's output
    async fn execute_nodes(&self, workflow: &Workflow, ctx: &RunContext, record: &mut ExecutionRecord) -> Result<Value> {
        tracing::debug!(
            "📊 Scheduling workflow '{}' with {} nodes and {} edges",
            workflow.id,
            workflow.nodes.len(),
            workflow.edges.len()
        );
        let plan = schedule(&workflow.nodes, &workflow.edges);
        tracing::debug!("📋 Execution order: {:?}", plan.order);

        let mut outputs: HashMap<String, NodeOutput> = HashMap::new();
        let mut conditionals: HashMap<String, bool> = HashMap::new();
        let mut last_output = Value::Null;

        for (step, node_id) in plan.order.iter().enumerate() {
            let node = workflow
                .node(node_id)
                .ok_or_else(|| anyhow::anyhow!("Scheduled node '{}' is missing from the workflow", node_id))?;

            let inputs = visible_inputs(node_id, &workflow.edges, &outputs, &conditionals, &workflow.nodes);
            if inputs.is_pruned() {
                tracing::debug!("⏭️ Skipping node '{}': every incoming branch was pruned", node_id);
                continue;
            }

            tracing::info!(
                "📍 Step {}/{}: Executing node '{}' (type: {})",
                step + 1,
                plan.order.len(),
                node_id,
                node.kind.as_str()
            );

            let node_start_time = std::time::Instant::now();
            let output = self.executor.execute_node(node, &inputs, ctx).await;
            let duration_ms = node_start_time.elapsed().as_millis() as u64;

            if node.kind == NodeKind::Conditional {
                match branch_result(&output) {
                    Some(result) => {
                        conditionals.insert(node_id.clone(), result);
                    }
                    None => tracing::warn!("⚠️ Conditional '{}' produced no result; neither branch will run", node_id),
                }
            }

            last_output = output.to_value();
            record.record_node(node_id, Value::Array(inputs.positional), output.clone(), duration_ms);
            outputs.insert(node_id.clone(), output);
        }

        Ok(last_output)
    }

    /// Execute one node against caller-supplied upstream state
    ///
    /// Nothing is recorded; used by the single-node test endpoint.
    pub async fn test_node(&self, workflow: &Workflow, node_id: &str, request: NodeTestRequest) -> Result<NodeTestResult> {
        let node = workflow
            .node(node_id)
            .ok_or_else(|| anyhow::anyhow!("Node '{}' not found in workflow '{}'", node_id, workflow.id))?;

        let outputs: HashMap<String, NodeOutput> = request
            .outputs
            .into_iter()
            .map(|(id, value)| (id, NodeOutput::from(value)))
            .collect();
        let inputs = visible_inputs(node_id, &workflow.edges, &outputs, &request.conditionals, &workflow.nodes);

        tracing::info!("🧪 Testing node '{}' of workflow '{}'", node_id, workflow.id);

        let ctx = RunContext {
            workflow_id: workflow.id.clone(),
            execution_id: String::new(),
            trigger: request.trigger,
        };
        let start_time = std::time::Instant::now();
        let output = self.executor.execute_node(node, &inputs, &ctx).await;

        Ok(NodeTestResult {
            node_id: node_id.to_string(),
            input: inputs.positional,
            output,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}
