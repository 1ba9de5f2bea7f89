use anyhow::{Context, Result};
use staging::cli::output::{
    format_execution_event, format_stage_list, format_status, style, CHECK, CROSS, INFO,
};
use staging::cli::{init_logging, Cli};
use staging::{StageStatus, StagingConfig, StagingEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    init_logging(cli.log_level())?;

    let config = StagingConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    if cli.list {
        print!("{}", format_stage_list(&config));
        return Ok(());
    }

    if cli.check {
        return check_config(&config);
    }

    if let Err(err) = cli.validate_stages(config.stage_names()) {
        err.exit();
    }

    let mut engine = StagingEngine::new(config);
    engine.add_event_handler(|event| println!("{}", format_execution_event(event)));

    if engine.run(&cli.stages).await.is_err() {
        for (stage, status) in engine.statuses() {
            if status == StageStatus::Pending {
                println!("{} {} {}", INFO, style(stage).bold(), format_status(status));
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

fn check_config(config: &StagingConfig) -> Result<()> {
    match config.validate() {
        Ok(()) => {
            println!(
                "{} Configuration is valid: {} steps, {} stages",
                CHECK,
                style(config.steps.len()).cyan(),
                style(config.stages.len()).cyan()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
