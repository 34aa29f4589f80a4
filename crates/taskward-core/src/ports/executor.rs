//! Executor port: the inference work behind one task.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ExecutionError, TaskOptions};

/// Runs the work for one task.
///
/// The dispatcher calls `run` on its own tokio task and aborts it when the
/// deadline passes, so implementations should yield at `.await` points to be
/// cancellable. Work that never yields is abandoned rather than waited on:
/// the task is marked failed and its gate permit is released either way.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    async fn run(&self, input: &str, options: &TaskOptions) -> Result<Value, ExecutionError>;
}
