//! Request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskward_core::{FailureKind, TaskId, TaskOptions, TaskRecord, TaskStatus};

/// Body of `POST /task/inference`.
#[derive(Debug, Deserialize)]
pub struct InferenceRequest {
    pub input: String,
    #[serde(default)]
    pub options: TaskOptions,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

/// Body of `GET /task/{task_id}`. Timestamps are RFC 3339.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<TaskRecord> for TaskStatusResponse {
    fn from(record: TaskRecord) -> Self {
        Self {
            task_id: record.id,
            status: record.status,
            result: record.result,
            error: record.error.as_ref().map(|f| f.message.clone()),
            error_kind: record.error.map(|f| f.kind),
            created_at: rfc3339(record.created_at),
            started_at: record.started_at.map(rfc3339),
            completed_at: record.completed_at.map(rfc3339),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(record: &TaskRecord) -> Self {
        Self {
            task_id: record.id,
            status: record.status,
            created_at: rfc3339(record.created_at),
            completed_at: record.completed_at.map(rfc3339),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub count: usize,
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub tasks_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub app_name: String,
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}
