//! Test: Stage flow - sequential units and continue_on_failure

use crate::helpers::*;
use staging::{FormatRegistry, Stage, StagingError};

fn two_step_stage(ws: &Workspace, continue_on_failure: bool) -> String {
    format!(
        r#"
[tool.staging.steps.fail]
execute = "exit 1"

[tool.staging.steps.second]
execute = "{}"

[tool.staging.stages.ci]
steps = [
    {{ step = "fail", continue_on_failure = {} }},
    {{ step = "second" }},
]
"#,
        ws.touch("second"),
        continue_on_failure
    )
}

/// continue_on_failure = true: the next unit runs and the stage succeeds
#[tokio::test]
async fn test_continue_on_failure() {
    let ws = Workspace::new();
    let config = config_from_toml(&two_step_stage(&ws, true));
    let stage = Stage::from_config("ci", &config).unwrap();

    let report = stage.run(&FormatRegistry::new()).await.unwrap();
    assert_ran(&ws, "second");
    assert_eq!(report.units_run, 2);
    assert_eq!(report.recovered.len(), 1);
    assert_eq!(report.recovered[0].unit, "fail");
}

/// continue_on_failure = false: the stage stops at the failing unit
#[tokio::test]
async fn test_abort_on_failure() {
    let ws = Workspace::new();
    let (result, _) = run_stage(&two_step_stage(&ws, false), "ci").await;

    let err = result.unwrap_err();
    match &err {
        StagingError::StageAborted { stage, unit, .. } => {
            assert_eq!(stage, "ci");
            assert_eq!(unit, "fail");
        }
        other => panic!("expected StageAborted, got {other:?}"),
    }
    assert!(matches!(root_cause(&err), StagingError::StepFailed { code: 1, .. }));
    assert_not_ran(&ws, "second");
}

/// continue_on_failure on a parallel group applies to the group as a whole
#[tokio::test]
async fn test_parallel_group_continue_on_failure() {
    let ws = Workspace::new();
    let toml = format!(
        r#"
[tool.staging.steps.ok]
execute = "true"

[tool.staging.steps.fail]
execute = "exit 1"

[tool.staging.steps.after]
execute = "{}"

[tool.staging.stages.ci]
steps = [
    {{ parallel = {{ steps = ["ok", "fail"] }}, continue_on_failure = true }},
    {{ step = "after" }},
]
"#,
        ws.touch("after")
    );

    let (result, _) = run_stage(&toml, "ci").await;
    result.unwrap();
    assert_ran(&ws, "after");
}

/// A failing parallel group without continue_on_failure aborts the stage
#[tokio::test]
async fn test_parallel_group_aborts_stage() {
    let ws = Workspace::new();
    let toml = format!(
        r#"
[tool.staging.steps.fail]
execute = "exit 1"

[tool.staging.steps.after]
execute = "{}"

[tool.staging.stages.ci]
steps = [
    {{ parallel = {{ steps = ["fail"] }} }},
    {{ step = "after" }},
]
"#,
        ws.touch("after")
    );

    let (result, _) = run_stage(&toml, "ci").await;
    let err = result.unwrap_err();
    assert!(matches!(&err, StagingError::StageAborted { unit, .. } if unit == "parallel[fail]"));
    assert_not_ran(&ws, "after");
}

/// Stage format values and step outputs flow through later units
#[tokio::test]
async fn test_values_flow_through_stage() {
    let toml = r#"
[tool.staging.steps.version]
execute = "printf {base}.1"
format = { base = "major" }
output = "version"

[tool.staging.steps.tag]
execute = "printf {prefix}{v}"
format = { prefix = "prefix", v = "version" }
output = "tag"

[tool.staging.stages.release]
format = { major = "2", prefix = "v" }
steps = [{ step = "version" }, { step = "tag" }]
"#;

    let (result, registry) = run_stage(toml, "release").await;
    result.unwrap();
    assert_eq!(registry.get("version"), "2.1");
    assert_eq!(registry.get("tag"), "v2.1");
}
