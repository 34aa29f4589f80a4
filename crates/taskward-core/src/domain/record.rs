//! Task record: the single source of truth for one task.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{TaskError, TaskId, TaskStatus};

/// Caller-supplied key/value options, passed through to the executor untouched.
pub type TaskOptions = serde_json::Map<String, Value>;

/// Why a task ended up `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The executor returned an error.
    Execution,

    /// The deadline elapsed before the executor finished.
    Timeout,

    /// The executor panicked.
    Panicked,
}

/// Error payload stored on a failed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Execution,
            message: message.into(),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: format!("task timed out after {}s", limit.as_secs()),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panicked,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A forward step of the state machine, carrying whatever the target state
/// needs. Applied as one unit by [`TaskRecord::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Start,
    Complete(Value),
    Fail(TaskFailure),
}

impl Transition {
    pub fn target(&self) -> TaskStatus {
        match self {
            Transition::Start => TaskStatus::Running,
            Transition::Complete(_) => TaskStatus::Completed,
            Transition::Fail(_) => TaskStatus::Failed,
        }
    }
}

/// One task and its lifecycle.
///
/// Invariants:
/// - `result` is set iff status is Completed, `error` iff Failed.
/// - `created_at <= started_at <= completed_at` once present.
/// - only status, timestamps, result and error change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub input: String,
    pub options: TaskOptions,
    pub result: Option<Value>,
    pub error: Option<TaskFailure>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(id: TaskId, input: String, options: TaskOptions, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            input,
            options,
            result: None,
            error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The caller-supplied `"type"` option, when it is a string.
    pub fn task_type(&self) -> Option<&str> {
        self.options.get("type").and_then(Value::as_str)
    }

    /// Apply a transition, or reject it and leave the record untouched.
    pub fn apply(&mut self, transition: Transition, now: DateTime<Utc>) -> Result<(), TaskError> {
        let to = transition.target();
        if !self.status.can_transition_to(to) {
            return Err(TaskError::InvalidTransition {
                task_id: self.id,
                from: self.status,
                to,
            });
        }

        // Timestamps never run backwards, even with a skewed clock.
        let floor = self.started_at.unwrap_or(self.created_at);
        let now = now.max(floor);

        match transition {
            Transition::Start => {
                self.started_at = Some(now);
            }
            Transition::Complete(result) => {
                self.result = Some(result);
                self.completed_at = Some(now);
            }
            Transition::Fail(failure) => {
                self.error = Some(failure);
                self.completed_at = Some(now);
            }
        }
        self.status = to;
        Ok(())
    }

    /// Terminal and completed more than `retention` before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: TimeDelta) -> bool {
        match (self.is_terminal(), self.completed_at) {
            (true, Some(completed_at)) => now - completed_at > retention,
            _ => false,
        }
    }
}
