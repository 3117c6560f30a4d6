/// Runtime Execution Engine
///
/// This module runs workflow snapshots. It handles:
/// - Dependency-ordered scheduling with partial orders on cycles
/// - Branch routing of upstream outputs into each node's inputs
/// - Per-kind node execution with failure isolation
/// - Execution record assembly and test-listen sessions

// Sequential run orchestrator
pub mod engine;

// Node handler registry and the failure boundary
pub mod executor;

// Built-in node kinds
pub mod nodes;

// Discriminated node output values
pub mod output;

// Execution record and run status
pub mod record;

// Visible inputs per node
pub mod router;

// Repeated-pass dependency scheduler
pub mod scheduler;

// Caller-owned capture sessions for test webhooks
pub mod session;

// Re-export main types
pub use engine::{ExecutionEngine, NodeTestRequest, NodeTestResult};
pub use executor::{NodeError, NodeExecutor, NodeHandler, RunContext};
pub use output::NodeOutput;
pub use record::{ExecutionRecord, NodeResult, RunStatus};
pub use router::VisibleInputs;
pub use session::{SessionPoll, TestSessions};
