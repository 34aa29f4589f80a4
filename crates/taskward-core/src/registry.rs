//! TaskRegistry - タスクレコードの唯一の保管場所
//!
//! # 設計
//! - tokio `Mutex` で守られた `IndexMap` 1 つ（走査順 = 挿入順）
//! - レコードの変更（status + 時刻 + result/error）は 1 回のクリティカル
//!   セクション内で完結し、読み手はコミット済みの状態しか見ない
//! - ロックを保持したまま `.await` しない
//! - 呼び出し側には clone を返す（参照は外に出さない）

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{TaskError, TaskId, TaskOptions, TaskRecord, TaskStatus, Transition};
use crate::ports::IdGenerator;

/// Records keyed by id, in insertion order.
pub type RecordMap = IndexMap<TaskId, TaskRecord>;

/// Number of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.pending + self.running + self.completed + self.failed
    }
}

/// Selection for [`TaskRegistry::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    /// Matched against the `"type"` option of each record.
    pub task_type: Option<String>,
}

impl TaskFilter {
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn matches(&self, record: &TaskRecord) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self
                .task_type
                .as_deref()
                .is_none_or(|t| record.task_type() == Some(t))
    }
}

pub struct TaskRegistry {
    records: Mutex<RecordMap>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskRegistry {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            records: Mutex::new(IndexMap::new()),
            ids,
        }
    }

    /// Insert a new Pending record and return its id.
    pub async fn create(&self, input: String, options: TaskOptions, now: DateTime<Utc>) -> TaskId {
        let mut records = self.records.lock().await;
        let mut id = self.ids.generate_task_id();
        while records.contains_key(&id) {
            id = self.ids.generate_task_id();
        }
        records.insert(id, TaskRecord::new(id, input, options, now));
        id
    }

    pub async fn get(&self, id: TaskId) -> Result<TaskRecord, TaskError> {
        let records = self.records.lock().await;
        records
            .get(&id)
            .cloned()
            .ok_or(TaskError::NotFound { task_id: id })
    }

    /// 前進方向の遷移をアトミックに適用し、コミット後のレコードを返す。
    ///
    /// 終端状態からの遷移は拒否される。これにより終端コミットは冪等になり、
    /// 「結果」と「タイムアウト」のうち後から来た方は捨てられる。
    pub async fn update(
        &self,
        id: TaskId,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, TaskError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&id)
            .ok_or(TaskError::NotFound { task_id: id })?;
        record.apply(transition, now)?;
        Ok(record.clone())
    }

    /// All records in insertion order.
    pub async fn snapshot(&self) -> Vec<TaskRecord> {
        let records = self.records.lock().await;
        records.values().cloned().collect()
    }

    /// Records matching `filter`, in insertion order.
    pub async fn list(&self, filter: &TaskFilter) -> Vec<TaskRecord> {
        let records = self.records.lock().await;
        records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub async fn size(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn counts(&self) -> TaskCounts {
        let records = self.records.lock().await;
        let mut counts = TaskCounts::default();
        for record in records.values() {
            match record.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Running => counts.running += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Run `f` with exclusive access to the map. Used by the evictor so that
    /// planning and deleting happen under the same lock as transitions.
    pub(crate) async fn with_records<R>(&self, f: impl FnOnce(&mut RecordMap) -> R) -> R {
        let mut records = self.records.lock().await;
        f(&mut records)
    }
}
