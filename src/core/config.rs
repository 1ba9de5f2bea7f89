//! Staging configuration from the `[tool.staging]` table of a TOML file

use crate::core::StagingError;
use crate::execution::{Stage, Step};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use toml::Value;

/// Steps and stages defined under `[tool.staging]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagingConfig {
    /// Step definitions keyed by step name
    #[serde(default)]
    pub steps: BTreeMap<String, StepConfig>,

    /// Stage definitions keyed by stage name
    #[serde(default)]
    pub stages: BTreeMap<String, StageConfig>,
}

/// Step definition as written in TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepConfig {
    /// Command to run (required)
    #[serde(default)]
    pub execute: Option<String>,

    /// Command run before `execute`
    #[serde(default)]
    pub prepare: Option<String>,

    /// Command run after `execute`, whatever its outcome
    #[serde(default)]
    pub cleanup: Option<String>,

    /// Registry key receiving the captured stdout of `execute`
    #[serde(default)]
    pub output: Option<String>,

    /// Placeholder name -> registry key
    #[serde(default)]
    pub format: BTreeMap<String, String>,

    #[serde(default)]
    pub success_codes: Vec<i32>,

    #[serde(default)]
    pub error_codes: Vec<i32>,
}

/// Stage definition as written in TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Registry key -> literal value set before the stage runs
    #[serde(default)]
    pub format: BTreeMap<String, Value>,

    /// Ordered executable units
    #[serde(default)]
    pub steps: Vec<StageEntryConfig>,
}

/// One entry of a stage's `steps` list: either `step` or `parallel`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageEntryConfig {
    #[serde(default)]
    pub step: Option<String>,

    #[serde(default)]
    pub parallel: Option<ParallelConfig>,

    #[serde(default)]
    pub continue_on_failure: bool,
}

/// Body of a `parallel` entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParallelConfig {
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    #[serde(default)]
    tool: ToolTable,
}

#[derive(Debug, Default, Deserialize)]
struct ToolTable {
    #[serde(default)]
    staging: StagingConfig,
}

impl StageConfig {
    /// Formatter values rendered as strings
    pub fn formatter(&self) -> BTreeMap<String, String> {
        self.format
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }
}

impl StagingConfig {
    /// Load the configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StagingError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StagingError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse the `[tool.staging]` table; a document without it is an empty config
    pub fn from_toml(content: &str) -> Result<Self, StagingError> {
        let document: PyProject = toml::from_str(content)
            .map_err(|e| StagingError::config(format!("invalid TOML: {}", e)))?;
        Ok(document.tool.staging)
    }

    /// Names of all configured stages
    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str)
    }

    /// Look up a step definition
    pub fn step(&self, name: &str) -> Result<&StepConfig, StagingError> {
        self.steps
            .get(name)
            .ok_or_else(|| StagingError::config(format!("step '{}' is not defined", name)))
    }

    /// Build a fresh executable tree for the named stage
    pub fn resolve_stage(&self, name: &str) -> Result<Stage, StagingError> {
        Stage::from_config(name, self)
    }

    /// Validate every step and stage definition
    pub fn validate(&self) -> Result<(), StagingError> {
        for (name, step) in &self.steps {
            Step::from_config(name, step)?;
        }
        for name in self.stages.keys() {
            self.resolve_stage(name)?;
        }
        Ok(())
    }
}
