mod common;

use async_trait::async_trait;
use common::{engine, spawn_upstream, workflow};
use hookflow::{
    runtime::{ExecutionEngine, NodeError, NodeExecutor, NodeHandler, NodeOutput, RunContext, RunStatus, VisibleInputs},
    Node, NodeKind, TriggerEvent,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Emits its configured `value` verbatim
struct Fixed;

#[async_trait]
impl NodeHandler for Fixed {
    async fn execute(&self, node: &Node, _: &VisibleInputs, _: &RunContext) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::from(node.config()["value"].clone()))
    }
}

fn branching_workflow(base: &str) -> Value {
    json!({
        "id": "orders",
        "nodes": [
            { "id": "hook", "type": "trigger", "data": { "customName": "Webhook" } },
            { "id": "if", "type": "conditional", "data": { "config": {
                "combine": "AND",
                "conditions": [
                    { "leftValue": "{{ Webhook.body.amount }}", "operator": "gt", "rightValue": 100, "type": "number" }
                ]
            } } },
            { "id": "high", "type": "http", "data": { "customName": "HttpHighValue", "config": {
                "url": format!("{}/echo", base), "method": "POST",
                "body": "{\"tier\": \"high\", \"amount\": \"{{ output.body.amount }}\"}"
            } } },
            { "id": "low", "type": "http", "data": { "customName": "HttpLowValue", "config": {
                "url": format!("{}/echo", base), "method": "POST", "body": "{\"tier\": \"low\"}"
            } } }
        ],
        "edges": [
            { "source": "hook", "target": "if" },
            { "source": "if", "target": "high", "sourceHandle": "true" },
            { "source": "if", "target": "low", "sourceHandle": "false" }
        ]
    })
}

#[tokio::test]
async fn test_high_value_branch_runs_and_low_is_pruned() {
    let base = spawn_upstream().await;
    let record = engine(&base)
        .run("orders", Some(workflow(branching_workflow(&base))), TriggerEvent::with_body(json!({ "amount": 150 })))
        .await;

    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(record.execution_order, vec!["hook", "if", "high"]);
    assert!(!record.node_results.contains_key("low"));

    let condition = record.node_results["if"].output.to_value();
    assert_eq!(condition["result"], json!(true));
    assert_eq!(condition["output"]["body"]["amount"], json!(150));

    let high = &record.node_results["high"];
    assert_eq!(high.input, json!([condition]));
    let response = high.output.to_value();
    assert_eq!(response["status"], json!(200));
    assert_eq!(response["body"]["body"], json!({ "tier": "high", "amount": "150" }));

    assert_eq!(record.output_data, response);
}

#[tokio::test]
async fn test_low_value_takes_false_branch() {
    let base = spawn_upstream().await;
    let record = engine(&base)
        .run("orders", Some(workflow(branching_workflow(&base))), TriggerEvent::with_body(json!({ "amount": 20 })))
        .await;

    assert_eq!(record.execution_order, vec!["hook", "if", "low"]);
    assert!(!record.node_results.contains_key("high"));
}

#[tokio::test]
async fn test_failed_http_node_does_not_stop_the_run() {
    let wf = workflow(json!({
        "id": "isolation",
        "nodes": [
            { "id": "hook", "type": "trigger" },
            { "id": "call", "type": "http", "data": { "config": { "url": "http://127.0.0.1:1/down" } } },
            { "id": "after", "type": "passthrough" }
        ],
        "edges": [
            { "source": "hook", "target": "call" },
            { "source": "call", "target": "after" }
        ]
    }));
    let record = engine("http://127.0.0.1:1").run("isolation", Some(wf), TriggerEvent::with_body(json!({}))).await;

    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(record.node_results.len(), 3);

    let failed = record.node_results["call"].output.to_value();
    assert_eq!(failed["error"], json!("HTTP request failed"));
    assert!(failed["message"].is_string());

    // The passthrough still ran and forwarded the error record it received
    assert_eq!(record.node_results["after"].input, json!([failed]));
    assert_eq!(record.node_results["after"].output.to_value(), failed);
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let base = spawn_upstream().await;
    let engine = engine(&base);
    let trigger = TriggerEvent::with_body(json!({ "amount": 150 }));

    let first = engine.run("orders", Some(workflow(branching_workflow(&base))), trigger.clone()).await;
    let second = engine.run("orders", Some(workflow(branching_workflow(&base))), trigger).await;

    assert_eq!(first.execution_order, second.execution_order);
    for node_id in &first.execution_order {
        let a = first.node_results[node_id].output.to_value();
        let mut b = second.node_results[node_id].output.to_value();
        // Response headers carry a date
        if let (Some(headers), Some(other)) = (a.get("headers"), b.get_mut("headers")) {
            *other = headers.clone();
        }
        assert_eq!(a, b, "output of '{}' differs", node_id);
    }
}

#[tokio::test]
async fn test_legacy_reference_to_named_ancestor() {
    let base = spawn_upstream().await;
    let wf = workflow(json!({
        "id": "pricing",
        "nodes": [
            { "id": "hook", "type": "trigger" },
            { "id": "price", "type": "fixed", "data": { "customName": "Pricing", "config": { "value": { "total": 42 } } } },
            { "id": "tag", "type": "fixed", "data": { "config": { "value": { "tagged": true } } } },
            { "id": "send", "type": "http", "data": { "config": {
                "url": format!("{}/echo", base), "method": "POST",
                "body": "{\"total\": \"{{ $('Pricing').item.json.total }}\", \"note\": \"{{ note }}\"}"
            } } }
        ],
        "edges": [
            { "source": "hook", "target": "price" },
            { "source": "price", "target": "tag" },
            { "source": "tag", "target": "send" }
        ]
    }));
    let executor = common::executor(&base).register(NodeKind::Other("fixed".to_string()), Fixed);
    let record = ExecutionEngine::new(Arc::new(executor))
        .run("pricing", Some(wf), TriggerEvent::with_body(json!({})))
        .await;

    let sent = record.node_results["send"].output.to_value();
    // {{ note }} is unresolved and stays literal, still inside valid JSON
    assert_eq!(sent["body"]["body"], json!({ "total": "42", "note": "{{ note }}" }));
}

#[tokio::test]
async fn test_nodes_behind_a_pruned_branch_never_run() {
    let wf = workflow(json!({
        "id": "pruned",
        "nodes": [
            { "id": "if", "type": "conditional", "data": { "config": { "conditions": [
                { "leftValue": "a", "operator": "equals", "rightValue": "b" }
            ] } } },
            { "id": "yes", "type": "passthrough" },
            { "id": "after-yes", "type": "passthrough" },
            { "id": "no", "type": "passthrough" }
        ],
        "edges": [
            { "source": "if", "target": "yes", "sourceHandle": "true" },
            { "source": "yes", "target": "after-yes" },
            { "source": "if", "target": "no", "sourceHandle": "false" }
        ]
    }));
    let record = ExecutionEngine::new(Arc::new(NodeExecutor::empty().register(
        NodeKind::Conditional,
        hookflow::runtime::nodes::conditional::ConditionalHandler,
    )))
    .run("pruned", Some(wf), TriggerEvent::default())
    .await;

    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(record.execution_order, vec!["if", "no"]);
    assert_eq!(record.node_results.len(), 2);
}

#[tokio::test]
async fn test_cycle_runs_the_acyclic_prefix_only() {
    let wf = workflow(json!({
        "id": "cyclic",
        "nodes": [
            { "id": "start", "type": "passthrough" },
            { "id": "a", "type": "passthrough" },
            { "id": "b", "type": "passthrough" }
        ],
        "edges": [
            { "source": "start", "target": "a" },
            { "source": "a", "target": "b" },
            { "source": "b", "target": "a" }
        ]
    }));
    let record = ExecutionEngine::new(Arc::new(NodeExecutor::empty()))
        .run("cyclic", Some(wf), TriggerEvent::default())
        .await;

    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(record.execution_order, vec!["start"]);
}

#[tokio::test]
async fn test_code_node_output_is_recorded() {
    let wf = workflow(json!({
        "id": "code",
        "nodes": [
            { "id": "hook", "type": "trigger" },
            { "id": "script", "type": "codeRun", "data": { "config": { "code": "return { computed: true };" } } }
        ],
        "edges": [{ "source": "hook", "target": "script" }]
    }));
    let record = engine("http://127.0.0.1:1").run("code", Some(wf), TriggerEvent::with_body(json!({}))).await;

    assert_eq!(record.node_results["script"].output.to_value(), json!({ "computed": true }));
    assert_eq!(record.output_data, json!({ "computed": true }));
}

#[tokio::test]
async fn test_missing_workflow_fails_the_run() {
    let record = engine("http://127.0.0.1:1").run("ghost", None, TriggerEvent::default()).await;
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.error_message.as_deref(), Some("Workflow 'ghost' not found"));
    assert!(record.duration_ms.is_some());
    assert!(record.execution_order.is_empty());
}
