mod cli;
mod config;
mod logging;
mod runner;

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use caption_engine::ensure_artifact_dir;
use clap::Parser;
use job_logging::job_info;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("caption_app: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = AppConfig::load(cli.config.as_deref())?;

    ensure_artifact_dir(&config.scheduler.artifact_directory).with_context(|| {
        format!(
            "failed to prepare artifact directory {}",
            config.scheduler.artifact_directory.display()
        )
    })?;
    if config.logging.destination.to_file() {
        ensure_artifact_dir(&config.logging.directory).with_context(|| {
            format!(
                "failed to prepare log directory {}",
                config.logging.directory.display()
            )
        })?;
    }
    logging::initialize(&config.logging)?;
    job_info!(
        "Artifacts in {}, extractor {}",
        config.scheduler.artifact_directory.display(),
        config.extractor.program
    );

    let scheduler = runner::build_scheduler(&config)?;
    let mut out = io::stdout().lock();
    match cli.command {
        Command::Extract {
            poll_interval_ms,
            urls,
        } => runner::extract(
            &scheduler,
            &urls,
            Duration::from_millis(poll_interval_ms),
            &mut out,
        ),
        Command::Status { job_ids } => runner::status(&scheduler, &job_ids, &mut out),
    }
}
