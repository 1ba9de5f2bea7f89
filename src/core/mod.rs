//! Core models for staging
//!
//! Configuration, the format registry shared by steps, command templates,
//! and the error and state types used by the execution engine.

pub mod config;
pub mod error;
pub mod registry;
pub mod state;
pub mod template;

pub use config::StagingConfig;
pub use error::{Phase, StagingError};
pub use registry::FormatRegistry;
pub use state::*;
pub use template::TemplateError;
