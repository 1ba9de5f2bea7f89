//! Test utility functions for staging scenarios

use staging::core::config::StagingConfig;
use staging::{FormatRegistry, Stage, StagingEngine, StagingError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch directory for marker files written by test commands
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a marker file inside the workspace
    pub fn marker(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Shell command that creates the named marker
    pub fn touch(&self, name: &str) -> String {
        format!("touch '{}'", self.marker(name).display())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.marker(name).exists()
    }
}

/// Parse a `[tool.staging]` document
pub fn config_from_toml(toml: &str) -> StagingConfig {
    StagingConfig::from_toml(toml).expect("test configuration should parse")
}

/// Build an engine over a `[tool.staging]` document
pub fn engine_from_toml(toml: &str) -> StagingEngine {
    StagingEngine::new(config_from_toml(toml))
}

/// Resolve and run one stage against a fresh registry
pub async fn run_stage(toml: &str, name: &str) -> (Result<(), StagingError>, FormatRegistry) {
    let stage = Stage::from_config(name, &config_from_toml(toml)).expect("stage should resolve");
    let registry = FormatRegistry::new();
    let result = stage.run(&registry).await.map(|_| ());
    (result, registry)
}

pub fn stage_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Assert a marker file was created
pub fn assert_ran(workspace: &Workspace, marker: &str) {
    assert!(workspace.exists(marker), "expected '{}' to have run", marker);
}

/// Assert a marker file was never created
pub fn assert_not_ran(workspace: &Workspace, marker: &str) {
    assert!(!workspace.exists(marker), "expected '{}' not to have run", marker);
}

/// Unwrap the innermost error below stage/parallel wrappers
pub fn root_cause(err: &StagingError) -> &StagingError {
    match err {
        StagingError::StageAborted { source, .. } | StagingError::Parallel { source, .. } => {
            root_cause(source)
        }
        other => other,
    }
}
