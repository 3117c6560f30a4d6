/// Passthrough node: default for unknown node types

use crate::runtime::{
    executor::{NodeError, NodeHandler, RunContext},
    output::NodeOutput,
    router::VisibleInputs,
};
use crate::workflow::types::Node;
use async_trait::async_trait;

/// Returns the first positional input unchanged
pub struct PassthroughHandler;

#[async_trait]
impl NodeHandler for PassthroughHandler {
    async fn execute(&self, _node: &Node, inputs: &VisibleInputs, _ctx: &RunContext) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::from(inputs.first()))
    }
}
