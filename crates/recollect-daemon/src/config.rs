//! Daemon configuration
//!
//! Every setting comes from a `RECOLLECT_*` environment variable with a
//! default. Unset and blank variables fall back to the default; malformed
//! values are rejected so the process refuses to start.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use recollect_core::{
    ConsolidationConfig, DispatchConfig, ReviewScheduleConfig, ScheduleConfigError,
};

pub const ENV_DB_PATH: &str = "RECOLLECT_DB_PATH";
pub const ENV_REVIEW_INTERVALS: &str = "RECOLLECT_REVIEW_INTERVALS";
pub const ENV_DISPATCH_INTERVAL_MINUTES: &str = "RECOLLECT_DISPATCH_INTERVAL_MINUTES";
pub const ENV_DISPATCH_SESSION_SIZE: &str = "RECOLLECT_DISPATCH_SESSION_SIZE";
pub const ENV_DISPATCH_DELAY_MS: &str = "RECOLLECT_DISPATCH_DELAY_MS";
pub const ENV_CONSOLIDATION_TIME: &str = "RECOLLECT_CONSOLIDATION_TIME";
pub const ENV_LOG_FORMAT: &str = "RECOLLECT_LOG_FORMAT";

/// Invalid configuration value
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be a comma-separated list of days, got {value:?}")]
    InvalidIntervalList { var: &'static str, value: String },
    #[error("Invalid review intervals: {0}")]
    Schedule(#[from] ScheduleConfigError),
    #[error("{var} must be a time like 02:00, got {value:?}")]
    InvalidTime { var: &'static str, value: String },
    #[error("{var} must be 'text' or 'json', got {value:?}")]
    InvalidLogFormat { var: &'static str, value: String },
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat {
                var: ENV_LOG_FORMAT,
                value: s.to_string(),
            }),
        }
    }
}

/// Settings shared by the daemon and the CLI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaemonConfig {
    /// `None` means the platform data directory
    pub db_path: Option<PathBuf>,
    pub review_schedule: ReviewScheduleConfig,
    pub dispatch: DispatchConfig,
    pub consolidation: ConsolidationConfig,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(raw) = read(ENV_REVIEW_INTERVALS) {
            config.review_schedule = parse_intervals(&raw)?;
        }
        if let Some(raw) = read(ENV_DISPATCH_INTERVAL_MINUTES) {
            let seconds = parse_positive(ENV_DISPATCH_INTERVAL_MINUTES, &raw)?
                .checked_mul(60)
                .ok_or_else(|| ConfigError::InvalidNumber {
                    var: ENV_DISPATCH_INTERVAL_MINUTES,
                    value: raw.clone(),
                })?;
            config.dispatch.period = Duration::from_secs(seconds);
        }
        if let Some(raw) = read(ENV_DISPATCH_SESSION_SIZE) {
            config.dispatch.session_size = parse_positive(ENV_DISPATCH_SESSION_SIZE, &raw)? as usize;
        }
        if let Some(raw) = read(ENV_DISPATCH_DELAY_MS) {
            let millis = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                var: ENV_DISPATCH_DELAY_MS,
                value: raw.clone(),
            })?;
            config.dispatch.delivery_delay = Duration::from_millis(millis);
        }
        if let Some(raw) = read(ENV_CONSOLIDATION_TIME) {
            config.consolidation.run_at = NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                .map_err(|_| ConfigError::InvalidTime {
                    var: ENV_CONSOLIDATION_TIME,
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = read(ENV_LOG_FORMAT) {
            config.log_format = raw.parse()?;
        }

        Ok(config)
    }
}

/// Parse a list such as `1,3,7,14,30`
pub fn parse_intervals(raw: &str) -> Result<ReviewScheduleConfig, ConfigError> {
    let days = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ConfigError::InvalidIntervalList {
            var: ENV_REVIEW_INTERVALS,
            value: raw.to_string(),
        })?;
    Ok(ReviewScheduleConfig::new(days)?)
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: raw.to_string(),
        }),
    }
}
