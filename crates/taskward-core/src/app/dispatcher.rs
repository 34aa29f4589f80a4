//! Dispatcher - 1 タスクを Pending から終端状態まで進める
//!
//! # フロー
//! 1. gate の permit を待つ（その間タスクは Pending のまま）
//! 2. Pending -> Running をコミット
//! 3. Executor を別の tokio タスクで実行し、期限と競争させる
//! 4. Completed / Failed をコミットしてから permit を drop
//!
//! Executor を別タスクで動かすので、panic は `JoinError` として閉じ込められ、
//! タイムアウトした呼び出しは await せずに abort できる。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::domain::{ExecutionError, TaskError, TaskFailure, TaskId, TaskOptions, Transition};
use crate::gate::ConcurrencyGate;
use crate::ports::{Clock, Executor};
use crate::registry::TaskRegistry;

use super::status::TaskStats;

pub(crate) struct Dispatcher {
    registry: Arc<TaskRegistry>,
    gate: Arc<ConcurrencyGate>,
    executor: Arc<dyn Executor>,
    clock: Arc<dyn Clock>,
    stats: Arc<TaskStats>,
    timeout: Duration,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<TaskRegistry>,
        gate: Arc<ConcurrencyGate>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
        stats: Arc<TaskStats>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            gate,
            executor,
            clock,
            stats,
            timeout,
        }
    }

    /// Run `task_id` in the background.
    pub(crate) fn spawn(self: &Arc<Self>, task_id: TaskId) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.dispatch(task_id).await })
    }

    async fn dispatch(&self, task_id: TaskId) {
        let permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(err) => {
                tracing::debug!(task_id = %task_id, error = %err, "task left pending");
                return;
            }
        };

        let record = match self
            .registry
            .update(task_id, Transition::Start, self.clock.now())
            .await
        {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(task_id = %task_id, error = %err, "task not started");
                return;
            }
        };
        tracing::debug!(task_id = %task_id, "task started");

        let transition = self.execute(record.input, record.options).await;
        self.commit(task_id, transition).await;

        drop(permit);
    }

    async fn execute(&self, input: String, options: TaskOptions) -> Transition {
        let executor = Arc::clone(&self.executor);
        let mut handle: JoinHandle<Result<Value, ExecutionError>> =
            tokio::spawn(async move { executor.run(&input, &options).await });

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(value))) => Transition::Complete(value),
            Ok(Ok(Err(err))) => Transition::Fail(TaskFailure::execution(err.to_string())),
            Ok(Err(join_err)) if join_err.is_panic() => {
                Transition::Fail(TaskFailure::panicked("executor panicked"))
            }
            Ok(Err(join_err)) => Transition::Fail(TaskFailure::execution(join_err.to_string())),
            Err(_elapsed) => {
                handle.abort();
                Transition::Fail(TaskFailure::timeout(self.timeout))
            }
        }
    }

    async fn commit(&self, task_id: TaskId, transition: Transition) {
        match self
            .registry
            .update(task_id, transition, self.clock.now())
            .await
        {
            Ok(record) => {
                if let Some(failure) = &record.error {
                    self.stats.record_failed();
                    tracing::warn!(
                        task_id = %task_id,
                        kind = ?failure.kind,
                        error = %failure,
                        "task failed"
                    );
                } else {
                    self.stats.record_completed();
                    tracing::info!(task_id = %task_id, "task completed");
                }
            }
            Err(TaskError::InvalidTransition { from, .. }) => {
                tracing::debug!(task_id = %task_id, status = %from, "late outcome discarded");
            }
            Err(err) => {
                tracing::debug!(task_id = %task_id, error = %err, "outcome dropped");
            }
        }
    }
}
