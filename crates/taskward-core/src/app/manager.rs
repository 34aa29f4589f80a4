//! TaskManager - 外部から呼ばれる窓口
//!
//! [`TaskManagerBuilder`](super::TaskManagerBuilder) で 1 度だけ構築し、
//! `Arc` で共有する（グローバルなインスタンスは持たない）。

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::config::ManagerConfig;
use crate::domain::{TaskError, TaskId, TaskOptions, TaskRecord};
use crate::gate::ConcurrencyGate;
use crate::ports::Clock;
use crate::registry::{TaskFilter, TaskRegistry};

use super::dispatcher::Dispatcher;
use super::evictor::{CleanupHandle, EvictionReport, Evictor};
use super::status::{Health, TaskMetrics, TaskStats};

pub struct TaskManager {
    config: ManagerConfig,
    registry: Arc<TaskRegistry>,
    gate: Arc<ConcurrencyGate>,
    dispatcher: Arc<Dispatcher>,
    evictor: Arc<Evictor>,
    clock: Arc<dyn Clock>,
    stats: Arc<TaskStats>,
    started_at: Instant,
    cleanup: Mutex<Option<CleanupHandle>>,
}

impl TaskManager {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: ManagerConfig,
        registry: Arc<TaskRegistry>,
        gate: Arc<ConcurrencyGate>,
        dispatcher: Arc<Dispatcher>,
        evictor: Arc<Evictor>,
        clock: Arc<dyn Clock>,
        stats: Arc<TaskStats>,
    ) -> Self {
        Self {
            config,
            registry,
            gate,
            dispatcher,
            evictor,
            clock,
            stats,
            started_at: Instant::now(),
            cleanup: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Accept a task and schedule it. Returns immediately with the new id;
    /// the task starts once a gate permit is free.
    ///
    /// An eviction sweep runs first, in line with the call. After
    /// [`shutdown`](Self::shutdown) nothing is accepted and
    /// [`TaskError::ShutDown`] is returned, since no permit would ever be
    /// granted to the new task.
    pub async fn submit(
        &self,
        input: impl Into<String>,
        options: TaskOptions,
    ) -> Result<TaskId, TaskError> {
        if self.gate.is_closed() {
            return Err(TaskError::ShutDown);
        }
        self.evictor.sweep().await;

        let task_id = self
            .registry
            .create(input.into(), options, self.clock.now())
            .await;
        tracing::info!(task_id = %task_id, "task submitted");

        self.dispatcher.spawn(task_id);
        Ok(task_id)
    }

    /// Last committed state of a task.
    pub async fn get_status(&self, task_id: TaskId) -> Result<TaskRecord, TaskError> {
        self.registry.get(task_id).await
    }

    /// Tasks in insertion order, optionally filtered by status and type.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Vec<TaskRecord> {
        self.registry.list(filter).await
    }

    pub async fn health(&self) -> Health {
        Health::healthy(self.registry.size().await)
    }

    pub async fn metrics(&self) -> TaskMetrics {
        TaskMetrics {
            counts: self.registry.counts().await,
            completed_total: self.stats.completed(),
            failed_total: self.stats.failed(),
            in_flight: self.gate.in_flight(),
            max_concurrent_tasks: self.gate.capacity(),
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }

    /// Run an eviction sweep now.
    pub async fn sweep(&self) -> EvictionReport {
        self.evictor.sweep().await
    }

    /// Start the periodic sweep. Calling it again while it runs is a no-op.
    pub async fn start_periodic_cleanup(&self) {
        let mut cleanup = self.cleanup.lock().await;
        if cleanup.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        *cleanup = Some(CleanupHandle::spawn(
            Arc::clone(&self.evictor),
            self.config.cleanup_interval(),
        ));
        tracing::info!(
            interval_secs = self.config.cleanup_interval_seconds,
            "periodic cleanup started"
        );
    }

    /// Stop the periodic sweep, stop admitting pending tasks to the gate,
    /// and run one final sweep. Tasks already running finish normally.
    pub async fn shutdown(&self) {
        let handle = self.cleanup.lock().await.take();
        if let Some(handle) = handle {
            handle.shutdown_and_join().await;
        }
        self.gate.close();

        let report = self.evictor.sweep().await;
        tracing::info!(evicted = report.total(), "task manager shut down");
    }
}
