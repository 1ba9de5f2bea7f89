//! Pipeline driver - runs requested stages in order

use crate::core::{FormatRegistry, StageStatus, StagingConfig, StagingError};
use crate::execution::stage::Stage;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Events that can occur while stages run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    StageStarted {
        stage: String,
        units: usize,
    },
    UnitRecovered {
        stage: String,
        unit: String,
        error: String,
    },
    StageFinished {
        stage: String,
        status: StageStatus,
        elapsed: Duration,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Resolves stage names from configuration and runs them one after another
pub struct StagingEngine {
    config: StagingConfig,
    registry: FormatRegistry,
    event_handlers: Vec<EventHandler>,
    /// Status of each stage of the latest run, in request order
    statuses: Mutex<Vec<(String, StageStatus)>>,
}

impl StagingEngine {
    pub fn new(config: StagingConfig) -> Self {
        Self {
            config,
            registry: FormatRegistry::new(),
            event_handlers: Vec::new(),
            statuses: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// The registry shared by every step of the current stage
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Stage statuses of the latest run; stages that never started stay pending
    pub fn statuses(&self) -> Vec<(String, StageStatus)> {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_status(&self, index: usize, status: StageStatus) {
        let mut statuses = self.statuses.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = statuses.get_mut(index) {
            entry.1 = status;
        }
    }

    /// Build fresh executable trees for the requested stages
    ///
    /// Fails on the first unknown stage or invalid definition, so nothing
    /// runs when any requested stage is misconfigured.
    pub fn resolve(&self, stage_names: &[String]) -> Result<Vec<Stage>, StagingError> {
        stage_names
            .iter()
            .map(|name| self.config.resolve_stage(name))
            .collect()
    }

    /// Run the requested stages in order, stopping at the first failure
    pub async fn run(&self, stage_names: &[String]) -> Result<(), StagingError> {
        let stages = self.resolve(stage_names).inspect_err(|e| error!("{}", e))?;

        *self.statuses.lock().unwrap_or_else(PoisonError::into_inner) = stages
            .iter()
            .map(|stage| (stage.name.clone(), StageStatus::Pending))
            .collect();

        for (index, stage) in stages.iter().enumerate() {
            self.run_stage(index, stage).await?;
        }
        Ok(())
    }

    /// Clear the registry and run one stage
    async fn run_stage(&self, index: usize, stage: &Stage) -> Result<(), StagingError> {
        self.registry.clear();
        self.set_status(index, StageStatus::Running);
        info!("[Staging {}] Starting", stage.name);
        self.emit_event(ExecutionEvent::StageStarted {
            stage: stage.name.clone(),
            units: stage.steps.len(),
        });

        let started = Instant::now();
        let result = stage
            .run_observed(&self.registry, |recovered| {
                self.emit_event(ExecutionEvent::UnitRecovered {
                    stage: stage.name.clone(),
                    unit: recovered.unit.clone(),
                    error: recovered.error.clone(),
                })
            })
            .await;

        let status = match &result {
            Ok(_) => {
                info!("[Staging {}] Finishing with success", stage.name);
                StageStatus::Succeeded
            }
            Err(err) => {
                error!("Error in stage [{}]: {}", stage.name, err);
                info!("[Staging {}] Finishing with error", stage.name);
                StageStatus::Failed
            }
        };
        self.set_status(index, status);
        self.emit_event(ExecutionEvent::StageFinished {
            stage: stage.name.clone(),
            status,
            elapsed: started.elapsed(),
        });

        result.map(|_| ())
    }
}
