//! Stage - an ordered sequence of steps and parallel groups

use crate::core::{
    config::StagingConfig, FormatRegistry, RecoveredFailure, StageReport, StagingError,
};
use crate::execution::{parallel::Parallel, step::Step};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One unit of a stage
#[derive(Debug, Clone)]
pub enum Executable {
    Step(Step),
    Parallel(Parallel),
}

impl Executable {
    /// Display name of the unit
    pub fn name(&self) -> String {
        match self {
            Executable::Step(step) => step.name.clone(),
            Executable::Parallel(group) => group.name(),
        }
    }

    pub fn continue_on_failure(&self) -> bool {
        match self {
            Executable::Step(step) => step.continue_on_failure,
            Executable::Parallel(group) => group.continue_on_failure,
        }
    }

    pub async fn run(&self, registry: &FormatRegistry) -> Result<(), StagingError> {
        match self {
            Executable::Step(step) => step.run(registry).await,
            Executable::Parallel(group) => group.run(registry).await,
        }
    }
}

impl From<Step> for Executable {
    fn from(step: Step) -> Self {
        Executable::Step(step)
    }
}

impl From<Parallel> for Executable {
    fn from(group: Parallel) -> Self {
        Executable::Parallel(group)
    }
}

/// A named pipeline run
#[derive(Debug, Clone, Default)]
pub struct Stage {
    pub name: String,

    /// Informational only
    pub description: Option<String>,

    /// Registry values set before the first unit runs
    pub formatter: BTreeMap<String, String>,

    /// Units, run in order
    pub steps: Vec<Executable>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_formatter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.formatter.insert(key.into(), value.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<Executable>) -> Self {
        self.steps.push(unit.into());
        self
    }

    /// Build the executable tree of the named stage
    pub fn from_config(name: &str, config: &StagingConfig) -> Result<Self, StagingError> {
        let stage_config = config
            .stages
            .get(name)
            .ok_or_else(|| StagingError::config(format!("stage '{}' is not defined", name)))?;

        let mut steps = Vec::with_capacity(stage_config.steps.len());
        for (index, entry) in stage_config.steps.iter().enumerate() {
            let unit = match (&entry.step, &entry.parallel) {
                (Some(_), Some(_)) => {
                    return Err(StagingError::config(format!(
                        "stage '{}' entry {}: both step and parallel cannot be set",
                        name, index
                    )))
                }
                (None, None) => {
                    return Err(StagingError::config(format!(
                        "stage '{}' entry {}: one of step or parallel is required",
                        name, index
                    )))
                }
                (Some(step_name), None) => {
                    let step = Step::from_config(step_name, config.step(step_name)?)?
                        .with_continue_on_failure(entry.continue_on_failure);
                    Executable::Step(step)
                }
                (None, Some(parallel)) => {
                    let members = parallel
                        .steps
                        .iter()
                        .map(|step_name| Step::from_config(step_name, config.step(step_name)?))
                        .collect::<Result<Vec<_>, _>>()?;
                    Executable::Parallel(
                        Parallel::new(members).with_continue_on_failure(entry.continue_on_failure),
                    )
                }
            };
            steps.push(unit);
        }

        Ok(Stage {
            name: name.to_string(),
            description: stage_config.description.clone(),
            formatter: stage_config.formatter(),
            steps,
        })
    }

    /// Apply the formatter, then run each unit in order
    pub async fn run(&self, registry: &FormatRegistry) -> Result<StageReport, StagingError> {
        self.run_observed(registry, |_| {}).await
    }

    /// Like [`Stage::run`], reporting each recovered failure as it happens
    ///
    /// `on_recovered` also sees failures recovered before a later unit aborts
    /// the stage.
    pub async fn run_observed<F>(
        &self,
        registry: &FormatRegistry,
        mut on_recovered: F,
    ) -> Result<StageReport, StagingError>
    where
        F: FnMut(&RecoveredFailure),
    {
        for (key, value) in &self.formatter {
            registry.set(key.clone(), value.clone());
        }

        let mut report = StageReport::default();
        for unit in &self.steps {
            report.units_run += 1;
            match unit.run(registry).await {
                Ok(()) => {}
                Err(err) if unit.continue_on_failure() => {
                    warn!(
                        "[Stage {}] {} failed but continue_on_failure is set: {}",
                        self.name,
                        unit.name(),
                        err
                    );
                    let recovered = RecoveredFailure {
                        unit: unit.name(),
                        error: err.to_string(),
                    };
                    on_recovered(&recovered);
                    report.recovered.push(recovered);
                }
                Err(err) => {
                    return Err(StagingError::StageAborted {
                        stage: self.name.clone(),
                        unit: unit.name(),
                        source: Box::new(err),
                    })
                }
            }
        }

        info!("[Stage {}] All {} units done", self.name, report.units_run);
        Ok(report)
    }
}
