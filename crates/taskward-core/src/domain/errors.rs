//! Error types for registry and executor operations.

use thiserror::Error;

use super::{TaskId, TaskStatus};

/// Errors returned by registry lookups and transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// No record with this id (never issued, or already evicted).
    #[error("task not found: {task_id}")]
    NotFound { task_id: TaskId },

    /// The requested transition is not a forward step from the current status.
    #[error("invalid transition from {from} to {to} for task {task_id}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// The manager was shut down and accepts no new tasks.
    #[error("task manager is shut down")]
    ShutDown,
}

/// Error raised by an [`Executor`](crate::ports::Executor).
///
/// It is captured into the task's `error` field and never surfaces to a
/// polling caller as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The request itself cannot be processed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The inference work failed.
    #[error("{0}")]
    Failed(String),
}

impl ExecutionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn not_found_mentions_id() {
        let task_id = TaskId::from_ulid(Ulid::new());
        let err = TaskError::NotFound { task_id };
        assert!(err.to_string().contains(&task_id.to_string()));
    }

    #[test]
    fn invalid_transition_mentions_both_states() {
        let err = TaskError::InvalidTransition {
            task_id: TaskId::from_ulid(Ulid::new()),
            from: TaskStatus::Completed,
            to: TaskStatus::Failed,
        };
        let msg = err.to_string();
        assert!(msg.contains("completed"));
        assert!(msg.contains("failed"));
    }

    #[test]
    fn execution_error_messages() {
        assert_eq!(ExecutionError::failed("boom").to_string(), "boom");
        assert_eq!(
            ExecutionError::InvalidInput("empty".into()).to_string(),
            "invalid input: empty"
        );
    }
}
