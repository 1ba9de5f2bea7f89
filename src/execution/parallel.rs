//! Parallel group - steps launched together and joined as one unit

use crate::core::{FormatRegistry, StagingError};
use crate::execution::cancel::cancel_pair;
use crate::execution::step::Step;
use std::collections::HashMap;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error};

/// A flat group of steps run concurrently
#[derive(Debug, Clone, Default)]
pub struct Parallel {
    /// Members, in launch order
    pub steps: Vec<Step>,

    /// Whether a failure of the group lets its stage continue
    pub continue_on_failure: bool,
}

impl Parallel {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            continue_on_failure: false,
        }
    }

    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    /// Display name listing the members, e.g. `parallel[lint, test]`
    pub fn name(&self) -> String {
        let names: Vec<&str> = self.steps.iter().map(|s| s.name.as_str()).collect();
        format!("parallel[{}]", names.join(", "))
    }

    /// Run every member concurrently and wait for all of them to settle
    ///
    /// The first genuine failure cancels the remaining members. Errors caused
    /// only by that cancellation are dropped; if any other error remains the
    /// group fails with the first one, in completion order.
    pub async fn run(&self, registry: &FormatRegistry) -> Result<(), StagingError> {
        let (trigger, signal) = cancel_pair();
        let mut tasks = JoinSet::new();
        let mut members = HashMap::new();

        for step in &self.steps {
            let name = step.name.clone();
            let step = step.clone();
            let registry = registry.clone();
            let signal = signal.clone();
            let handle = tasks.spawn(async move { step.run_until_cancelled(&registry, signal).await });
            members.insert(handle.id(), name);
        }
        debug!("Launched {} with {} members", self.name(), self.steps.len());

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let Some(failure) = genuine_failure(joined, &members) else {
                continue;
            };
            if failures.is_empty() {
                trigger.cancel();
            }
            failures.push(failure);
        }

        for failure in &failures {
            error!("Exception happened: {}", failure);
        }

        let failed = failures.len();
        match failures.into_iter().next() {
            Some(first) => Err(StagingError::Parallel {
                failed,
                source: Box::new(first),
            }),
            None => Ok(()),
        }
    }
}

/// The error a settled member contributes to the group, if any
///
/// Cancellation-only errors are dropped. A panicked task is reported under
/// the name of the member it ran.
fn genuine_failure(
    joined: Result<Result<(), StagingError>, JoinError>,
    members: &HashMap<Id, String>,
) -> Option<StagingError> {
    match joined {
        Ok(Ok(())) => None,
        Ok(Err(err)) if err.is_cancellation() => {
            debug!("{}", err);
            None
        }
        Ok(Err(err)) => Some(err),
        Err(join_err) if join_err.is_cancelled() => None,
        Err(join_err) => Some(StagingError::TaskPanicked {
            step: members.get(&join_err.id()).cloned().unwrap_or_default(),
            message: join_err.to_string(),
        }),
    }
}
