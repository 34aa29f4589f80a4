//! taskward-core
//!
//! 推論タスクのライフサイクル管理: 受け付け、同時実行数の制限下での実行、
//! 状態の追跡、古い結果の回収。
//!
//! # 主要コンポーネント
//! - **domain**: ID、状態遷移、タスクレコード、エラー
//! - **ports**: `Executor` / `Clock` / `IdGenerator` の抽象
//! - **registry**: 挿入順を保つ並行安全なレコードストア
//! - **gate**: 同時実行数のリミッタ
//! - **app**: builder、manager、dispatcher、evictor、status
//! - **impls**: 組み込みの Executor 実装
//! - **config**: manager の上限値と検証

pub mod app;
pub mod config;
pub mod domain;
pub mod gate;
pub mod impls;
pub mod ports;
pub mod registry;

pub use app::{BuildError, EvictionReport, Health, TaskManager, TaskManagerBuilder, TaskMetrics};
pub use config::{ConfigError, ManagerConfig};
pub use domain::{
    ExecutionError, FailureKind, TaskError, TaskFailure, TaskId, TaskOptions, TaskRecord,
    TaskStatus, Transition,
};
pub use impls::SimulatedExecutor;
pub use ports::Executor;
pub use registry::{TaskCounts, TaskFilter};
