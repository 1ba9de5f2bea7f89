//! Test: Driver - stage ordering, registry reset, stop on first failure

use crate::helpers::*;
use staging::{ExecutionEvent, StageStatus, StagingError};
use std::sync::{Arc, Mutex};

/// Stage B never starts when stage A fails
#[tokio::test]
async fn test_failing_stage_stops_pipeline() {
    let ws = Workspace::new();
    let toml = format!(
        r#"
[tool.staging.steps.fail]
execute = "exit 1"

[tool.staging.steps.mark]
execute = "{}"

[tool.staging.stages.A]
steps = [{{ step = "fail" }}]

[tool.staging.stages.B]
steps = [{{ step = "mark" }}]
"#,
        ws.touch("B")
    );

    let mut engine = engine_from_toml(&toml);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event.clone()));

    let err = engine.run(&stage_names(&["A", "B"])).await.unwrap_err();
    assert!(matches!(err, StagingError::StageAborted { ref stage, .. } if stage == "A"));
    assert_not_ran(&ws, "B");

    let events = events.lock().unwrap();
    let started: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ExecutionEvent::StageStarted { stage, .. } => Some(stage.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec!["A"]);
    assert!(matches!(
        events.last(),
        Some(ExecutionEvent::StageFinished { status: StageStatus::Failed, .. })
    ));
}

/// Stages run in the order requested, not the order configured
#[tokio::test]
async fn test_stages_run_in_requested_order() {
    let ws = Workspace::new();
    let log = ws.marker("log");
    let toml = format!(
        r#"
[tool.staging.steps.a]
execute = "echo a >> '{log}'"

[tool.staging.steps.b]
execute = "echo b >> '{log}'"

[tool.staging.stages.alpha]
steps = [{{ step = "a" }}]

[tool.staging.stages.beta]
steps = [{{ step = "b" }}]
"#,
        log = log.display()
    );

    let engine = engine_from_toml(&toml);
    engine.run(&stage_names(&["beta", "alpha", "beta"])).await.unwrap();
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "b\na\nb\n");
}

/// Each stage starts with an empty registry
#[tokio::test]
async fn test_registry_empty_at_stage_start() {
    let toml = r#"
[tool.staging.steps.produce]
execute = "printf stale"
output = "value"

[tool.staging.steps.expect_empty]
execute = "test -z '{v}'"
format = { v = "value" }

[tool.staging.stages.first]
format = { seed = "x" }
steps = [{ step = "produce" }]

[tool.staging.stages.second]
steps = [{ step = "expect_empty" }]
"#;

    let engine = engine_from_toml(toml);
    engine.registry().set("value", "set before any stage");
    engine.run(&stage_names(&["first", "second"])).await.unwrap();
    assert_eq!(engine.registry().get("seed"), "");
}

/// A misconfigured stage anywhere in the request prevents every stage from running
#[tokio::test]
async fn test_config_error_before_execution() {
    let ws = Workspace::new();
    let toml = format!(
        r#"
[tool.staging.steps.mark]
execute = "{}"

[tool.staging.steps.broken]
execute = "true"
success_codes = [0]
error_codes = [1]

[tool.staging.stages.good]
steps = [{{ step = "mark" }}]

[tool.staging.stages.bad]
steps = [{{ step = "broken" }}]
"#,
        ws.touch("good")
    );

    let engine = engine_from_toml(&toml);
    let err = engine.run(&stage_names(&["good", "bad"])).await.unwrap_err();
    assert!(matches!(err, StagingError::Config(_)));
    assert_not_ran(&ws, "good");
}
