//! Error types for configuration and execution

use crate::core::template::TemplateError;
use std::fmt;
use thiserror::Error;

/// The phase of a step a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Execute,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Prepare => f.write_str("prepare"),
            Phase::Execute => f.write_str("execute"),
            Phase::Cleanup => f.write_str("cleanup"),
        }
    }
}

/// Errors raised while loading, resolving or running stages
#[derive(Debug, Error)]
pub enum StagingError {
    /// Malformed step or stage definition
    #[error("configuration error: {0}")]
    Config(String),

    /// A command template of the step could not be rendered
    #[error("step '{step}': {source}")]
    Template {
        step: String,
        #[source]
        source: TemplateError,
    },

    /// The prepare or execute phase exited with a failing code
    #[error("step '{step}' {phase} failed with exit code {code}")]
    StepFailed { step: String, phase: Phase, code: i32 },

    /// The shell for a phase could not be started
    #[error("step '{step}' {phase} could not be started: {source}")]
    Spawn {
        step: String,
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    /// The step was stopped because a sibling in its parallel group failed
    #[error("step '{step}' was cancelled")]
    Cancelled { step: String },

    /// A parallel group member task panicked
    #[error("step '{step}' panicked: {message}")]
    TaskPanicked { step: String, message: String },

    /// One or more members of a parallel group failed
    #[error("parallel steps failed ({failed} failed): {source}")]
    Parallel {
        failed: usize,
        #[source]
        source: Box<StagingError>,
    },

    /// A unit without continue_on_failure failed and stopped its stage
    #[error("stage '{stage}' aborted at {unit}: {source}")]
    StageAborted {
        stage: String,
        unit: String,
        #[source]
        source: Box<StagingError>,
    },
}

impl StagingError {
    /// Build a configuration error from any message
    pub fn config(message: impl Into<String>) -> Self {
        StagingError::Config(message.into())
    }

    /// Whether this error only records a cancellation, not a genuine failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StagingError::Cancelled { .. })
    }

    /// Exit code observed by the failing phase, if the error carries one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            StagingError::StepFailed { code, .. } => Some(*code),
            StagingError::Parallel { source, .. } | StagingError::StageAborted { source, .. } => {
                source.exit_code()
            }
            _ => None,
        }
    }
}
