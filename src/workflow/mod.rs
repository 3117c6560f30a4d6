/// Workflow Management Layer
///
/// This module holds what the engine consumes from and hands back to the
/// surrounding application:
/// - Type definitions (Workflow, Node, Edge, TriggerEvent)
/// - Lock-free hot-reload registry of workflow snapshots using ArcSwap
/// - The execution log that completed run records are handed to

// Core workflow type definitions
pub mod types;

// Hot-reload registry using ArcSwap for zero-downtime updates
pub mod registry;

// Hand-off point for finished execution records
pub mod executions;

// Re-export commonly used types
pub use types::{Edge, Node, NodeData, NodeKind, TriggerEvent, Workflow};
pub use registry::WorkflowRegistry;
pub use executions::{ExecutionLog, MemoryExecutionLog};
