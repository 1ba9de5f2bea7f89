//! CLI output formatting

use crate::core::{StageStatus, StagingConfig};
use crate::execution::ExecutionEvent;
use console::Emoji;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a stage status for display
pub fn format_status(status: StageStatus) -> String {
    match status {
        StageStatus::Pending => style("PENDING").dim().to_string(),
        StageStatus::Running => style("RUNNING").yellow().to_string(),
        StageStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        StageStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::StageStarted { stage, units } => format!(
            "{} Staging {} ({} units)",
            ROCKET,
            style(stage).bold(),
            units
        ),
        ExecutionEvent::UnitRecovered { stage, unit, error } => format!(
            "{} [{}] {} failed, continuing: {}",
            WARN,
            style(stage).dim(),
            style(unit).yellow(),
            style(error).dim()
        ),
        ExecutionEvent::StageFinished {
            stage,
            status,
            elapsed,
        } => {
            let icon = match status {
                StageStatus::Succeeded => CHECK,
                StageStatus::Failed => CROSS,
                _ => INFO,
            };
            format!(
                "{} {} finished with {} in {}",
                icon,
                style(stage).bold(),
                format_status(*status),
                style(format_duration(*elapsed)).dim()
            )
        }
    }
}

/// List configured stages with their descriptions
pub fn format_stage_list(config: &StagingConfig) -> String {
    if config.stages.is_empty() {
        return format!("{} No stages configured\n", INFO);
    }

    let mut listing = format!("{} Stages:\n", INFO);
    for (name, stage) in &config.stages {
        match &stage.description {
            Some(description) => {
                listing.push_str(&format!("  {} - {}\n", style(name).bold(), description))
            }
            None => listing.push_str(&format!("  {}\n", style(name).bold())),
        }
    }
    listing
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
