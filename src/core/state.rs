//! Execution state models

/// Status of one stage run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Stage has not started
    Pending,
    /// Stage is currently running its units
    Running,
    /// Every unit succeeded or was allowed to fail
    Succeeded,
    /// A unit without continue_on_failure failed
    Failed,
}

impl StageStatus {
    /// Check if the stage is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Succeeded | StageStatus::Failed)
    }
}

/// A unit failure that was logged and skipped because of continue_on_failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredFailure {
    /// Display name of the unit (step name or parallel group)
    pub unit: String,
    /// Rendered error message
    pub error: String,
}

/// Outcome of a stage that completed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Number of units that ran
    pub units_run: usize,
    /// Failures tolerated along the way
    pub recovered: Vec<RecoveredFailure>,
}
