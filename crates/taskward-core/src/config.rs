//! Manager configuration.
//!
//! The manager never reads files or the environment; a loader builds a
//! [`ManagerConfig`] once and hands it to
//! [`TaskManagerBuilder`](crate::app::TaskManagerBuilder), which validates it.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_MAX_CONCURRENT_TASKS: usize = 5;
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
const DEFAULT_TASK_RETENTION_HOURS: u64 = 24;
const DEFAULT_MAX_TASKS_COUNT: usize = 1000;
const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 3600;

/// Limits and windows for one manager instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Gate capacity.
    pub max_concurrent_tasks: usize,

    /// Per-task deadline, measured from `started_at`.
    pub timeout_seconds: u64,

    /// How long terminal records stay queryable. `0` disables time-based eviction.
    pub task_retention_hours: u64,

    /// Registry size above which the oldest terminal records are evicted.
    pub max_tasks_count: usize,

    /// Period of the background sweep.
    pub cleanup_interval_seconds: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            task_retention_hours: DEFAULT_TASK_RETENTION_HOURS,
            max_tasks_count: DEFAULT_MAX_TASKS_COUNT,
            cleanup_interval_seconds: DEFAULT_CLEANUP_INTERVAL_SECONDS,
        }
    }
}

/// A configuration value that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_concurrent_tasks must be greater than 0")]
    ZeroConcurrency,

    #[error("timeout_seconds must be greater than 0")]
    ZeroTimeout,

    #[error("max_tasks_count must be greater than 0")]
    ZeroMaxTasks,

    #[error("cleanup_interval_seconds must be greater than 0")]
    ZeroCleanupInterval,

    #[error("task_retention_hours is too large: {0}")]
    RetentionOutOfRange(u64),
}

impl ManagerConfig {
    /// Check every limit; the first offending field is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_tasks == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_tasks_count == 0 {
            return Err(ConfigError::ZeroMaxTasks);
        }
        if self.cleanup_interval_seconds == 0 {
            return Err(ConfigError::ZeroCleanupInterval);
        }
        if self.task_retention_hours > 0 && self.retention().is_none() {
            return Err(ConfigError::RetentionOutOfRange(self.task_retention_hours));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }

    /// Retention window, or `None` when time-based eviction is disabled.
    pub fn retention(&self) -> Option<TimeDelta> {
        if self.task_retention_hours == 0 {
            return None;
        }
        i64::try_from(self.task_retention_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
    }
}
