//! TaskStatus - タスク状態の状態機械
//!
//! # 遷移
//! - Pending -> Running
//! - Running -> Completed | Failed
//! - 終端状態からは遷移しない（自己遷移も不可）

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// State transitions:
/// - Pending -> Running (a gate permit was granted)
/// - Running -> Completed (executor returned a result before the deadline)
/// - Running -> Failed (executor error, panic, or deadline)
///
/// Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted, waiting for a gate permit.
    Pending,

    /// Holding a gate permit; the executor is running.
    Running,

    /// Finished with a result.
    Completed,

    /// Finished with an error (including timeout).
    Failed,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Is `next` a legal successor of this status?
    ///
    /// Self-transitions are rejected, so a second terminal commit for the
    /// same task never succeeds.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match self {
            TaskStatus::Pending => next == TaskStatus::Running,
            TaskStatus::Running => next.is_terminal(),
            TaskStatus::Completed | TaskStatus::Failed => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0:?}")]
pub struct UnknownStatus(String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::start(TaskStatus::Pending, TaskStatus::Running, true)]
    #[case::complete(TaskStatus::Running, TaskStatus::Completed, true)]
    #[case::fail(TaskStatus::Running, TaskStatus::Failed, true)]
    #[case::skip_running(TaskStatus::Pending, TaskStatus::Completed, false)]
    #[case::pending_fail(TaskStatus::Pending, TaskStatus::Failed, false)]
    #[case::restart(TaskStatus::Running, TaskStatus::Running, false)]
    #[case::regress(TaskStatus::Running, TaskStatus::Pending, false)]
    #[case::completed_again(TaskStatus::Completed, TaskStatus::Completed, false)]
    #[case::completed_to_failed(TaskStatus::Completed, TaskStatus::Failed, false)]
    #[case::failed_to_completed(TaskStatus::Failed, TaskStatus::Completed, false)]
    #[case::failed_to_running(TaskStatus::Failed, TaskStatus::Running, false)]
    fn transition_matrix(#[case] from: TaskStatus, #[case] to: TaskStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("RUNNING".parse::<TaskStatus>().unwrap(), TaskStatus::Running);
        assert_eq!(" failed ".parse::<TaskStatus>().unwrap(), TaskStatus::Failed);
        assert!("cancelled".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
