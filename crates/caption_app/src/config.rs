use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use caption_engine::{ExtractorConfig, SchedulerConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogDestination {
    /// Standard error only.
    Terminal,
    /// `<directory>/app.log` only.
    File,
    #[default]
    Both,
}

impl LogDestination {
    pub(crate) fn to_terminal(self) -> bool {
        matches!(self, Self::Terminal | Self::Both)
    }

    pub(crate) fn to_file(self) -> bool {
        matches!(self, Self::File | Self::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LoggingConfig {
    pub(crate) directory: PathBuf,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub(crate) level: String,
    pub(crate) destination: LogDestination,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            level: "info".to_string(),
            destination: LogDestination::default(),
        }
    }
}

impl LoggingConfig {
    pub(crate) fn level_filter(&self) -> Result<LevelFilter> {
        self.level
            .parse()
            .map_err(|_| anyhow!("unknown log level {:?}", self.level))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) scheduler: SchedulerConfig,
    pub(crate) extractor: ExtractorConfig,
    pub(crate) logging: LoggingConfig,
}

impl AppConfig {
    /// Reads `path` when given, otherwise returns the defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub(crate) fn from_ron(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text)?;
        config.scheduler.validate()?;
        config.extractor.validate()?;
        config.logging.level_filter()?;
        Ok(config)
    }
}
