//! Logger initialization for caption_app.
//!
//! Appends to `<logging.directory>/app.log` and/or writes to standard error,
//! keeping standard output free for status lines.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "app.log";

/// Installs the global logger. The log directory must already exist.
pub(crate) fn initialize(config: &LoggingConfig) -> Result<()> {
    let level = config.level_filter()?;
    let log_config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if config.destination.to_terminal() {
        loggers.push(TermLogger::new(
            level,
            log_config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if config.destination.to_file() {
        let path = log_file_path(&config.directory);
        let file = open_log_file(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        loggers.push(WriteLogger::new(level, log_config, file));
    }

    CombinedLogger::init(loggers).context("a global logger is already installed")
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn log_file_path(directory: &Path) -> PathBuf {
    directory.join(LOG_FILE_NAME)
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
