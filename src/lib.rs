//! staging - run stages of shell steps declared in pyproject.toml

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use self::core::{FormatRegistry, StageStatus, StagingConfig, StagingError};
pub use self::execution::{Executable, ExecutionEvent, Parallel, Stage, StagingEngine, Step};
