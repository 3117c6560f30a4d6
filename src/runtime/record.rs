/// Execution records
///
/// The trace of one workflow run. Created when a run starts, written only by
/// the engine while it runs, and finalized exactly once.

use crate::runtime::output::NodeOutput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

/// What one attempted node saw and produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    /// Positional inputs the node received
    pub input: Value,
    /// The node's output (an error record when it failed)
    pub output: NodeOutput,
    /// Zero-based position in the execution order
    pub order: usize,
    /// Wall time spent in the node
    pub duration_ms: u64,
}

/// Trace of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub input_data: Value,
    pub output_data: Value,
    pub node_results: BTreeMap<String, NodeResult>,
    pub execution_order: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionRecord {
    /// New pending record with a fresh execution id
    pub fn pending(workflow_id: impl Into<String>, input_data: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            status: RunStatus::Pending,
            input_data,
            output_data: Value::Null,
            node_results: BTreeMap::new(),
            execution_order: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            error_message: None,
        }
    }

    /// `Pending -> Running`
    pub fn start(&mut self) {
        if self.status == RunStatus::Pending {
            self.status = RunStatus::Running;
            self.started_at = Utc::now();
        }
    }

    /// Append an attempted node to the trace
    pub fn record_node(&mut self, node_id: &str, input: Value, output: NodeOutput, duration_ms: u64) {
        if self.status.is_terminal() {
            tracing::warn!("⚠️ Ignoring result for '{}': execution {} already finished", node_id, self.id);
            return;
        }
        let order = self.execution_order.len();
        self.execution_order.push(node_id.to_string());
        self.node_results.insert(
            node_id.to_string(),
            NodeResult {
                input,
                output,
                order,
                duration_ms,
            },
        );
    }

    /// `Running -> Success`
    pub fn succeed(&mut self, output_data: Value) {
        if self.finish(RunStatus::Success) {
            self.output_data = output_data;
        }
    }

    /// `Running -> Failed`
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.finish(RunStatus::Failed) {
            self.error_message = Some(message.into());
        }
    }

    /// Set the terminal status and timing; only the first call has any effect
    fn finish(&mut self, status: RunStatus) -> bool {
        if self.status.is_terminal() {
            tracing::warn!("⚠️ Execution {} already finished as {:?}", self.id, self.status);
            return false;
        }
        let finished_at = Utc::now();
        self.status = status;
        self.duration_ms = Some((finished_at - self.started_at).num_milliseconds().max(0) as u64);
        self.finished_at = Some(finished_at);
        true
    }
}
