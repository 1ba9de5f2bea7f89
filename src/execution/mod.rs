//! Stage execution engine

pub mod cancel;
pub mod engine;
pub mod parallel;
pub mod process;
pub mod stage;
pub mod step;

pub use cancel::{cancel_pair, CancelSignal, CancelTrigger};
pub use engine::{EventHandler, ExecutionEvent, StagingEngine};
pub use parallel::Parallel;
pub use process::{CapturedOutput, ShellCommand, ShellOutcome};
pub use stage::{Executable, Stage};
pub use step::{ExitCodePolicy, Step};
