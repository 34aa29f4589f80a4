//! App 層: registry / gate / executor / evictor を manager に組み上げる
//!
//! # 主要コンポーネント
//! - **TaskManagerBuilder**: 設定の検証と組み立て
//! - **TaskManager**: submit / get_status / list_tasks / health / metrics
//! - **Dispatcher**: permit -> Running -> executor -> 終端コミット
//! - **Evictor**: 保持期間と件数上限による回収、定期ループ
//! - **status**: health / metrics のビュー

pub mod builder;
mod dispatcher;
pub mod evictor;
pub mod manager;
pub mod status;

pub use self::builder::{BuildError, TaskManagerBuilder};
pub use self::evictor::{CleanupHandle, EvictionPolicy, EvictionReport, Evictor};
pub use self::manager::TaskManager;
pub use self::status::{Health, TaskMetrics};
