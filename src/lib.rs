/// Hookflow: webhook-triggered workflow execution engine
///
/// This library runs declarative workflow graphs: dependency-ordered
/// scheduling, conditional branch routing, `{{ ... }}` template resolution
/// and per-node execution with failure isolation, producing a replayable
/// execution record per run.

// Core configuration and setup
pub mod config;

// Read-only credential lookup for authenticated nodes
pub mod credentials;

// Workflow management layer - definitions, snapshot registry and execution log
pub mod workflow;

// Template expressions embedded in node configuration
pub mod template;

// Runtime execution engine - scheduling, routing and node execution
pub mod runtime;

// HTTP API layer - webhook triggers and editor test endpoints
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use runtime::{ExecutionEngine, ExecutionRecord, NodeExecutor, NodeOutput, RunStatus};
pub use server::start_server;
pub use workflow::{Edge, Node, NodeKind, TriggerEvent, Workflow};
