//! Command-line interface

pub mod output;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Execute stages of the pipeline
#[derive(Debug, Parser, Clone)]
#[command(name = "staging")]
#[command(version)]
#[command(about = "Execute stages of the pipeline declared in pyproject.toml", long_about = None)]
pub struct Cli {
    /// Names of the stages to execute, in order
    #[arg(value_name = "STAGE", required_unless_present_any = ["list", "check"])]
    pub stages: Vec<String>,

    /// Path to the TOML file holding [tool.staging]
    #[arg(short, long, default_value = "pyproject.toml")]
    pub config: PathBuf,

    /// Increase log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// List configured stages and exit
    #[arg(long, conflicts_with = "check")]
    pub list: bool,

    /// Validate every configured step and stage, then exit
    #[arg(long)]
    pub check: bool,
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Log level selected by -q / -v flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Check every requested stage against the configured names
    pub fn validate_stages<'a>(&self, known: impl IntoIterator<Item = &'a str>) -> Result<(), clap::Error> {
        let known: Vec<&str> = known.into_iter().collect();
        for stage in &self.stages {
            if !known.contains(&stage.as_str()) {
                let choices = if known.is_empty() {
                    "no stages are configured".to_string()
                } else {
                    format!("choose from {}", known.join(", "))
                };
                return Err(Cli::command().error(
                    ErrorKind::InvalidValue,
                    format!("invalid stage '{}' ({})", stage, choices),
                ));
            }
        }
        Ok(())
    }
}

/// Install the global tracing subscriber writing to stderr
///
/// `RUST_LOG`, when set, takes precedence over `level`.
pub fn init_logging(level: LevelFilter) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))
}
