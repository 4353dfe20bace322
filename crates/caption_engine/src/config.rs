use std::path::PathBuf;
use std::time::Duration;

use caption_core::RetryPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_concurrent_tasks must be at least 1")]
    ZeroConcurrency,
    #[error("max_retries must be at least 1")]
    ZeroRetries,
    #[error("retry_delay_seconds must be a non-negative number of seconds that fits a Duration, got {0}")]
    InvalidRetryDelay(f64),
    #[error("max_retained_terminal must be at least 1 when set")]
    ZeroRetention,
    #[error("extractor timeout_seconds must be a positive number of seconds that fits a Duration, got {0}")]
    InvalidTimeout(f64),
    #[error("extractor needs at least one caption language")]
    NoLanguages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker pool size.
    pub max_concurrent_tasks: usize,
    /// Extractor invocations per job, the first one included.
    pub max_retries: u32,
    /// Fixed backoff between attempts.
    pub retry_delay_seconds: f64,
    pub artifact_directory: PathBuf,
    /// Cap on cached terminal statuses; `None` keeps every one.
    ///
    /// Once a job is evicted its status is answered again from scratch: a job
    /// with a caption file on disk reads `completed` through reconciliation,
    /// any other job reads `not_found`, even if it was seen `completed` or
    /// `failed` before. Eviction also drops the live record, so a job that was
    /// reconciled while its worker was still running stops at its next
    /// attempt boundary and its own result is discarded.
    pub max_retained_terminal: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            max_retries: 3,
            retry_delay_seconds: 2.0,
            artifact_directory: PathBuf::from("subtitles"),
            max_retained_terminal: None,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_tasks == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if Duration::try_from_secs_f64(self.retry_delay_seconds).is_err() {
            return Err(ConfigError::InvalidRetryDelay(self.retry_delay_seconds));
        }
        if self.max_retained_terminal == Some(0) {
            return Err(ConfigError::ZeroRetention);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_retries,
            backoff: Duration::try_from_secs_f64(self.retry_delay_seconds)
                .unwrap_or(defaults.backoff),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Executable to run, `yt-dlp` unless overridden.
    pub program: String,
    /// Arguments placed before the generated ones, e.g. `["-m", "yt_dlp"]` with `python3`.
    pub program_args: Vec<String>,
    /// Caption languages in order of preference.
    pub languages: Vec<String>,
    /// Upper bound for one extractor invocation.
    pub timeout_seconds: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            program_args: Vec::new(),
            languages: vec!["zh".to_string(), "en".to_string()],
            timeout_seconds: 3600.0,
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Duration::try_from_secs_f64(self.timeout_seconds) {
            Ok(timeout) if !timeout.is_zero() => {}
            _ => return Err(ConfigError::InvalidTimeout(self.timeout_seconds)),
        }
        if self.languages.is_empty() {
            return Err(ConfigError::NoLanguages);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_concurrent_tasks, 3);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_policy().backoff, Duration::from_secs(2));
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(ExtractorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = SchedulerConfig {
            max_concurrent_tasks: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));

        let config = SchedulerConfig {
            max_retries: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRetries));

        let config = SchedulerConfig {
            retry_delay_seconds: -1.0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidRetryDelay(-1.0)));

        let config = SchedulerConfig {
            max_retained_terminal: Some(0),
            ..SchedulerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRetention));

        let extractor = ExtractorConfig {
            timeout_seconds: 0.0,
            ..ExtractorConfig::default()
        };
        assert_eq!(extractor.validate(), Err(ConfigError::InvalidTimeout(0.0)));

        let extractor = ExtractorConfig {
            languages: Vec::new(),
            ..ExtractorConfig::default()
        };
        assert_eq!(extractor.validate(), Err(ConfigError::NoLanguages));
    }

    #[test]
    fn durations_beyond_range_are_rejected_not_replaced() {
        let config = SchedulerConfig {
            retry_delay_seconds: 1e20,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidRetryDelay(1e20)));

        let config = SchedulerConfig {
            retry_delay_seconds: f64::NAN,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRetryDelay(_))
        ));

        let extractor = ExtractorConfig {
            timeout_seconds: 1e20,
            ..ExtractorConfig::default()
        };
        assert_eq!(extractor.validate(), Err(ConfigError::InvalidTimeout(1e20)));
    }

    #[test]
    fn fractional_delay_is_honoured() {
        let config = SchedulerConfig {
            retry_delay_seconds: 0.25,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.retry_policy().backoff, Duration::from_millis(250));
    }
}
