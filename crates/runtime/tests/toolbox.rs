//! Tests for `Toolbox` registration and dispatch.

use serde_json::json;
use ucore::{Tool, ToolCall};
use ullm_runtime::{ToolContext, ToolExecutor, Toolbox};

fn ctx(call: &ToolCall) -> ToolContext {
    ToolContext {
        call_id: call.id.clone(),
        tool: call.name.clone(),
        iteration: 3,
        position: 1,
    }
}

fn toolbox() -> Toolbox {
    let add = Tool::new(
        "add",
        "Add two integers",
        schemars::json_schema!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {
                "a": { "type": "integer" },
                "b": { "type": "integer" }
            }
        }),
    );
    let echo = Tool::new(
        "echo",
        "Echo the call context",
        schemars::json_schema!({ "type": "object" }),
    );

    let mut toolbox = Toolbox::new();
    toolbox.register(add, |args, _| async move {
        let sum = args["a"].as_i64().unwrap_or(0) + args["b"].as_i64().unwrap_or(0);
        anyhow::Ok(json!(sum))
    });
    toolbox.register(echo, |_, ctx| async move {
        anyhow::Ok(json!({ "call": ctx.call_id.as_str(), "iteration": ctx.iteration }))
    });
    toolbox
}

#[test]
fn definitions_are_sorted_by_name() {
    let toolbox = toolbox();
    let names: Vec<_> = toolbox.tools().into_iter().map(|tool| tool.name).collect();
    assert_eq!(names, vec!["add", "echo"]);
    assert_eq!(toolbox.len(), 2);
    assert!(toolbox.get("add").is_some());
    assert!(toolbox.get("sub").is_none());
}

#[tokio::test]
async fn dispatches_with_validated_arguments() {
    let toolbox = toolbox();

    let call = ToolCall::new("c1", "add", json!({ "a": 2, "b": 40 }));
    let sum = toolbox.call(&call, &ctx(&call)).await.expect("add");
    assert_eq!(sum, json!(42));

    let call = ToolCall::new("c2", "echo", json!({}));
    let echoed = toolbox.call(&call, &ctx(&call)).await.expect("echo");
    assert_eq!(echoed, json!({ "call": "c2", "iteration": 3 }));
}

#[tokio::test]
async fn rejects_bad_calls() {
    let toolbox = toolbox();

    let call = ToolCall::new("c1", "add", json!({ "a": 2, "b": "forty" }));
    let err = toolbox.call(&call, &ctx(&call)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid arguments for 'add': /b: expected integer, found string"
    );

    let call = ToolCall::new("c2", "sub", json!({}));
    let err = toolbox.call(&call, &ctx(&call)).await.unwrap_err();
    assert_eq!(err.to_string(), "tool 'sub' is not available");
}

#[test]
fn later_registration_replaces() {
    let mut toolbox = toolbox();
    toolbox.register(
        Tool::new("add", "Add floats", schemars::json_schema!({ "type": "object" })),
        |_, _| async { anyhow::Ok(json!(0.0)) },
    );
    assert_eq!(toolbox.len(), 2);
    assert_eq!(toolbox.get("add").unwrap().description, "Add floats");
}
