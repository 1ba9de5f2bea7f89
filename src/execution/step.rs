//! Step - one shell command with prepare/execute/cleanup phases

use crate::core::{
    config::StepConfig,
    template, FormatRegistry, Phase, StagingError,
};
use crate::execution::cancel::CancelSignal;
use crate::execution::process::{CapturedOutput, ShellCommand, ShellOutcome};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Policy mapping an exit code to success or failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCodePolicy {
    /// Any code outside the set fails
    SuccessCodes(BTreeSet<i32>),
    /// Any code inside the set fails
    ErrorCodes(BTreeSet<i32>),
}

impl Default for ExitCodePolicy {
    fn default() -> Self {
        ExitCodePolicy::SuccessCodes(BTreeSet::from([0]))
    }
}

impl ExitCodePolicy {
    /// Build from the two configured lists, at most one of which may be non-empty
    pub fn from_lists(step: &str, success_codes: &[i32], error_codes: &[i32]) -> Result<Self, StagingError> {
        match (success_codes.is_empty(), error_codes.is_empty()) {
            (false, false) => Err(StagingError::config(format!(
                "step '{}': success_codes and error_codes cannot both be set",
                step
            ))),
            (false, true) => Ok(ExitCodePolicy::SuccessCodes(success_codes.iter().copied().collect())),
            (true, false) => Ok(ExitCodePolicy::ErrorCodes(error_codes.iter().copied().collect())),
            (true, true) => Ok(ExitCodePolicy::default()),
        }
    }

    pub fn is_failure(&self, code: i32) -> bool {
        match self {
            ExitCodePolicy::SuccessCodes(codes) => !codes.contains(&code),
            ExitCodePolicy::ErrorCodes(codes) => codes.contains(&code),
        }
    }
}

/// A single external command unit
#[derive(Debug, Clone)]
pub struct Step {
    /// Step name, unique among steps
    pub name: String,

    /// Command template for the main phase
    pub execute: String,

    /// Command template run first; must exit 0
    pub prepare: Option<String>,

    /// Command template run after `execute` on every outcome
    pub cleanup: Option<String>,

    /// Registry key receiving stdout of a successful `execute`
    pub output: Option<String>,

    /// Placeholder name -> registry key
    pub format: BTreeMap<String, String>,

    pub exit_codes: ExitCodePolicy,

    /// Whether a failure of this step lets its stage continue
    pub continue_on_failure: bool,
}

impl Step {
    pub fn new(name: impl Into<String>, execute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            execute: execute.into(),
            prepare: None,
            cleanup: None,
            output: None,
            format: BTreeMap::new(),
            exit_codes: ExitCodePolicy::default(),
            continue_on_failure: false,
        }
    }

    /// Create a step from its configuration
    pub fn from_config(name: &str, config: &StepConfig) -> Result<Self, StagingError> {
        let exit_codes = ExitCodePolicy::from_lists(name, &config.success_codes, &config.error_codes)?;
        let execute = config.execute.clone().ok_or_else(|| {
            StagingError::config(format!("step '{}': content of `execute` is required", name))
        })?;

        Ok(Step {
            name: name.to_string(),
            execute,
            prepare: config.prepare.clone(),
            cleanup: config.cleanup.clone(),
            output: config.output.clone(),
            format: config.format.clone(),
            exit_codes,
            continue_on_failure: false,
        })
    }

    pub fn with_prepare(mut self, prepare: impl Into<String>) -> Self {
        self.prepare = Some(prepare.into());
        self
    }

    pub fn with_cleanup(mut self, cleanup: impl Into<String>) -> Self {
        self.cleanup = Some(cleanup.into());
        self
    }

    pub fn with_output(mut self, key: impl Into<String>) -> Self {
        self.output = Some(key.into());
        self
    }

    pub fn with_format(mut self, placeholder: impl Into<String>, key: impl Into<String>) -> Self {
        self.format.insert(placeholder.into(), key.into());
        self
    }

    pub fn with_exit_codes(mut self, exit_codes: ExitCodePolicy) -> Self {
        self.exit_codes = exit_codes;
        self
    }

    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    /// Codes considered success; empty when an error-code list is used
    pub fn success_codes(&self) -> BTreeSet<i32> {
        match &self.exit_codes {
            ExitCodePolicy::SuccessCodes(codes) => codes.clone(),
            ExitCodePolicy::ErrorCodes(_) => BTreeSet::new(),
        }
    }

    /// Codes considered failure; empty when a success-code list is used
    pub fn error_codes(&self) -> BTreeSet<i32> {
        match &self.exit_codes {
            ExitCodePolicy::ErrorCodes(codes) => codes.clone(),
            ExitCodePolicy::SuccessCodes(_) => BTreeSet::new(),
        }
    }

    /// Resolve `format` against the registry into placeholder values
    pub fn substitutions(&self, registry: &FormatRegistry) -> HashMap<String, String> {
        self.format
            .iter()
            .map(|(placeholder, key)| (placeholder.clone(), registry.get(key)))
            .collect()
    }

    fn render(&self, template: &str, values: &HashMap<String, String>) -> Result<String, StagingError> {
        template::render(template, values).map_err(|source| StagingError::Template {
            step: self.name.clone(),
            source,
        })
    }

    fn render_optional(
        &self,
        template: Option<&str>,
        values: &HashMap<String, String>,
    ) -> Result<Option<String>, StagingError> {
        template.map(|t| self.render(t, values)).transpose()
    }

    /// Run the step on its own
    pub async fn run(&self, registry: &FormatRegistry) -> Result<(), StagingError> {
        self.run_until_cancelled(registry, CancelSignal::never()).await
    }

    /// Run the step, stopping early if `cancel` is raised
    ///
    /// Once any phase has been spawned, cleanup runs on every outcome,
    /// including a failed prepare and cancellation. Only cancellation seen
    /// before the first spawn skips it.
    pub async fn run_until_cancelled(
        &self,
        registry: &FormatRegistry,
        mut cancel: CancelSignal,
    ) -> Result<(), StagingError> {
        if cancel.is_cancelled() {
            return Err(self.cancelled());
        }
        info!("[Step {}] Starting", self.name);

        let values = self.substitutions(registry);
        let cleanup = self.render_optional(self.cleanup.as_deref(), &values)?;
        let commands = self
            .render_optional(self.prepare.as_deref(), &values)
            .and_then(|prepare| Ok((prepare, self.render(&self.execute, &values)?)));
        let (prepare, execute) = match commands {
            Ok(commands) => commands,
            Err(err) => {
                self.cleanup_phase(cleanup.as_deref()).await;
                return Err(err);
            }
        };

        let result = self
            .run_phases(prepare.as_deref(), &execute, registry, &mut cancel)
            .await;
        self.cleanup_phase(cleanup.as_deref()).await;

        match &result {
            Ok(()) => info!("[Step {}] Finished", self.name),
            Err(err) => debug!("[Step {}] {}", self.name, err),
        }
        result
    }

    /// Prepare then execute; any error here still goes through cleanup
    async fn run_phases(
        &self,
        prepare: Option<&str>,
        execute: &str,
        registry: &FormatRegistry,
        cancel: &mut CancelSignal,
    ) -> Result<(), StagingError> {
        if let Some(prepare) = prepare {
            self.prepare_phase(prepare, cancel).await?;
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }
        }
        self.execute_phase(execute, registry, cancel).await
    }

    async fn spawn(
        &self,
        phase: Phase,
        command: &str,
        cancel: &mut CancelSignal,
    ) -> Result<CapturedOutput, StagingError> {
        debug!("[Step {}] {}: {}", self.name, phase, command);
        let outcome = ShellCommand::new(command)
            .output_until_cancelled(cancel)
            .await
            .map_err(|source| StagingError::Spawn {
                step: self.name.clone(),
                phase,
                source,
            })?;

        match outcome {
            ShellOutcome::Exited(output) => {
                debug!("[Step {}] {} exited with code {}", self.name, phase, output.code);
                Ok(output)
            }
            ShellOutcome::Cancelled => Err(self.cancelled()),
        }
    }

    async fn prepare_phase(&self, command: &str, cancel: &mut CancelSignal) -> Result<(), StagingError> {
        let output = self.spawn(Phase::Prepare, command, cancel).await?;
        if output.code != 0 {
            return Err(self.failed(Phase::Prepare, &output));
        }
        Ok(())
    }

    async fn execute_phase(
        &self,
        command: &str,
        registry: &FormatRegistry,
        cancel: &mut CancelSignal,
    ) -> Result<(), StagingError> {
        let output = self.spawn(Phase::Execute, command, cancel).await?;
        if self.exit_codes.is_failure(output.code) {
            return Err(self.failed(Phase::Execute, &output));
        }

        if let Some(key) = &self.output {
            registry.set(key.clone(), output.stdout_text());
        }
        Ok(())
    }

    /// Cleanup is never classified; its failures are only logged
    async fn cleanup_phase(&self, command: Option<&str>) {
        let Some(command) = command else { return };
        debug!("[Step {}] {}: {}", self.name, Phase::Cleanup, command);

        match ShellCommand::new(command).output().await {
            Ok(output) => debug!(
                "[Step {}] {} exited with code {}",
                self.name,
                Phase::Cleanup,
                output.code
            ),
            Err(e) => debug!("[Step {}] {} could not be started: {}", self.name, Phase::Cleanup, e),
        }
    }

    fn failed(&self, phase: Phase, output: &CapturedOutput) -> StagingError {
        if let Err(e) = output.echo_to_stderr() {
            warn!("[Step {}] Could not echo captured output: {}", self.name, e);
        }
        StagingError::StepFailed {
            step: self.name.clone(),
            phase,
            code: output.code,
        }
    }

    fn cancelled(&self) -> StagingError {
        StagingError::Cancelled {
            step: self.name.clone(),
        }
    }
}
