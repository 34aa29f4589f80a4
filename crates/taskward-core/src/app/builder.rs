//! TaskManagerBuilder - TaskManager の構築とワイヤリング
//!
//! # 使用例
//! ```ignore
//! let manager = TaskManagerBuilder::new(config)
//!     .executor(SimulatedExecutor::default())
//!     .build()?;
//! ```
//!
//! # Fail-fast
//! - 設定値が不正なら `BuildError::InvalidConfig`
//! - Executor 未登録なら `BuildError::MissingExecutor`
//! - どちらもタスク投入前に検出される

use std::sync::Arc;

use crate::config::{ConfigError, ManagerConfig};
use crate::gate::ConcurrencyGate;
use crate::ports::{Clock, Executor, IdGenerator, SystemClock, UlidGenerator};
use crate::registry::TaskRegistry;

use super::dispatcher::Dispatcher;
use super::evictor::{EvictionPolicy, Evictor};
use super::manager::TaskManager;
use super::status::TaskStats;

/// Error raised while assembling a [`TaskManager`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("no executor registered")]
    MissingExecutor,
}

pub struct TaskManagerBuilder {
    config: ManagerConfig,
    executor: Option<Arc<dyn Executor>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl TaskManagerBuilder {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            executor: None,
            clock: None,
            ids: None,
        }
    }

    pub fn executor<E: Executor>(mut self, executor: E) -> Self {
        self.executor = Some(Arc::new(executor) as Arc<dyn Executor>);
        self
    }

    pub fn shared_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock<C: Clock + 'static>(mut self, clock: Arc<C>) -> Self {
        self.clock = Some(clock as Arc<dyn Clock>);
        self
    }

    /// Defaults to a [`UlidGenerator`] on the manager's clock.
    pub fn id_generator<G: IdGenerator + 'static>(mut self, ids: G) -> Self {
        self.ids = Some(Arc::new(ids) as Arc<dyn IdGenerator>);
        self
    }

    pub fn build(self) -> Result<TaskManager, BuildError> {
        self.config.validate()?;
        let executor = self.executor.ok_or(BuildError::MissingExecutor)?;

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        let registry = Arc::new(TaskRegistry::new(ids));
        let gate = Arc::new(ConcurrencyGate::new(self.config.max_concurrent_tasks));
        let stats = Arc::new(TaskStats::default());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&gate),
            executor,
            Arc::clone(&clock),
            Arc::clone(&stats),
            self.config.timeout(),
        ));
        let evictor = Arc::new(Evictor::new(
            Arc::clone(&registry),
            EvictionPolicy::from_config(&self.config),
            Arc::clone(&clock),
        ));

        tracing::debug!(
            max_concurrent_tasks = self.config.max_concurrent_tasks,
            timeout_seconds = self.config.timeout_seconds,
            task_retention_hours = self.config.task_retention_hours,
            max_tasks_count = self.config.max_tasks_count,
            "task manager built"
        );

        Ok(TaskManager::new(
            self.config,
            registry,
            gate,
            dispatcher,
            evictor,
            clock,
            stats,
        ))
    }
}
