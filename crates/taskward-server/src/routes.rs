//! HTTP routes over a shared [`TaskManager`].
//!
//! Task routes are mounted under the configured prefix; `GET /` stays at the
//! root.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use taskward_core::{TaskError, TaskFilter, TaskId, TaskManager, TaskMetrics, TaskStatus};
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::schemas::{
    ErrorResponse, HealthResponse, InferenceRequest, InferenceResponse, ListQuery, RootResponse,
    TaskListResponse, TaskStatusResponse, TaskSummary,
};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TaskManager>,
    pub app_name: String,
    pub version: String,
}

impl AppState {
    pub fn new(manager: Arc<TaskManager>, config: &AppConfig) -> Self {
        Self {
            manager,
            app_name: config.app_name.clone(),
            version: config.api.version.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound { .. } => Self::NotFound(err.to_string()),
            TaskError::ShutDown => Self::Unavailable(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn create_inference_task(
    State(state): State<AppState>,
    Json(body): Json<InferenceRequest>,
) -> Result<Json<InferenceResponse>, ApiError> {
    if body.input.trim().is_empty() {
        return Err(ApiError::BadRequest("input must be non-empty".to_string()));
    }
    let preview: String = body.input.chars().take(50).collect();
    tracing::debug!(input = %preview, "inference request received");

    let task_id = state.manager.submit(body.input, body.options).await?;
    Ok(Json(InferenceResponse {
        task_id,
        status: TaskStatus::Pending,
    }))
}

async fn get_task_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, ApiError> {
    // A malformed id can never name a task, so it is reported like an unknown one.
    let task_id: TaskId = raw_id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("task {raw_id} not found")))?;

    let record = state.manager.get_status(task_id).await.inspect_err(|_| {
        tracing::debug!(task_id = %task_id, "status requested for unknown task");
    })?;
    Ok(Json(record.into()))
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    let filter = TaskFilter {
        status,
        task_type: query.task_type,
    };

    let tasks: Vec<TaskSummary> = state
        .manager
        .list_tasks(&filter)
        .await
        .iter()
        .map(TaskSummary::from)
        .collect();
    Ok(Json(TaskListResponse {
        count: tasks.len(),
        tasks,
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.manager.health().await;
    Json(HealthResponse {
        status: health.status,
        version: state.version.clone(),
        tasks_count: health.tasks_count,
    })
}

async fn metrics(State(state): State<AppState>) -> Json<TaskMetrics> {
    Json(state.manager.metrics().await)
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to the taskward API".to_string(),
        app_name: state.app_name.clone(),
    })
}

/// Build the full router. `prefix` is normalized to `/segment/...`; an empty
/// or `/` prefix mounts the task routes at the root.
///
/// CORS is open: any origin, method and header.
pub fn router(state: AppState, prefix: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/task/inference", post(create_inference_task))
        .route("/task/{task_id}", get(get_task_status))
        .route("/tasks", get(list_tasks))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics));

    let app = match normalize_prefix(prefix) {
        Some(prefix) => Router::new().nest(&prefix, api),
        None => api,
    };
    app.route("/", get(root)).layer(cors).with_state(state)
}

fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use taskward_core::{ManagerConfig, SimulatedExecutor, TaskManagerBuilder};
    use tower::ServiceExt;

    fn state() -> AppState {
        let manager = TaskManagerBuilder::new(ManagerConfig::default())
            .executor(SimulatedExecutor::new(Duration::from_millis(10)))
            .build()
            .unwrap();
        AppState::new(Arc::new(manager), &AppConfig::default())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn prefix_normalization() {
        assert_eq!(normalize_prefix("/api/v1"), Some("/api/v1".to_string()));
        assert_eq!(normalize_prefix("api/v1/"), Some("/api/v1".to_string()));
        assert_eq!(normalize_prefix("/"), None);
        assert_eq!(normalize_prefix(""), None);
    }

    #[tokio::test]
    async fn submit_then_poll_until_completed() {
        let app = router(state(), "/api/v1");

        let (status, body) = send(
            &app,
            post_json("/api/v1/task/inference", json!({"input": "hello", "options": {"k": 1}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        let task_id = body["task_id"].as_str().unwrap().to_string();
        assert!(task_id.starts_with("task-"));

        let uri = format!("/api/v1/task/{task_id}");
        let mut last = Value::Null;
        for _ in 0..100 {
            let (status, body) = send(&app, get_req(&uri)).await;
            assert_eq!(status, StatusCode::OK);
            if body["status"] == "completed" {
                last = body;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(last["result"], json!({"output": "Processed input: hello"}));
        assert!(last["error"].is_null());
        assert!(last["started_at"].is_string());
        assert!(last["completed_at"].is_string());
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let app = router(state(), "/api/v1");
        let (status, body) = send(&app, post_json("/api/v1/task/inference", json!({"input": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "input must be non-empty");
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() {
        let app = router(state(), "/api/v1");

        let (status, _) = send(
            &app,
            get_req("/api/v1/task/task-01ARZ3NDEKTSV4RRFFQ69G5FAV"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, get_req("/api/v1/task/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "task nope not found");
    }

    #[tokio::test]
    async fn health_reports_registry_size_and_version() {
        let state = state();
        let app = router(state.clone(), "/api/v1");
        state.manager.submit("a", Default::default()).await.unwrap();
        state.manager.submit("b", Default::default()).await.unwrap();

        let (status, body) = send(&app, get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "healthy", "version": "1.0.0", "tasks_count": 2})
        );
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let state = state();
        let app = router(state.clone(), "/api/v1");
        state.manager.submit("a", Default::default()).await.unwrap();

        let (status, body) = send(&app, get_req("/api/v1/tasks")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, body) = send(&app, get_req("/api/v1/tasks?status=failed")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, _) = send(&app, get_req("/api/v1/tasks?status=cancelled")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_filters_by_type() {
        let state = state();
        let app = router(state.clone(), "/api/v1");
        let mut options = taskward_core::TaskOptions::new();
        options.insert("type".into(), json!("summarize"));
        state.manager.submit("a", options).await.unwrap();
        state.manager.submit("b", Default::default()).await.unwrap();

        let (status, body) = send(&app, get_req("/api/v1/tasks?type=summarize")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_unavailable() {
        let state = state();
        let app = router(state.clone(), "/api/v1");
        state.manager.shutdown().await;

        let (status, body) =
            send(&app, post_json("/api/v1/task/inference", json!({"input": "late"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "task manager is shut down");
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = router(state(), "/api/v1");
        let request = Request::builder()
            .uri("/api/v1/health")
            .header("origin", "http://example.com")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let app = router(state(), "/api/v1");
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/task/inference")
            .header("origin", "http://example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-methods")
        );
    }

    #[tokio::test]
    async fn metrics_expose_capacity() {
        let app = router(state(), "/api/v1");
        let (status, body) = send(&app, get_req("/api/v1/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["max_concurrent_tasks"], 5);
        assert_eq!(body["in_flight"], 0);
    }

    #[tokio::test]
    async fn root_is_unprefixed() {
        let app = router(state(), "/api/v1");
        let (status, body) = send(&app, get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["app_name"], "taskward");

        let (status, _) = send(&app, get_req("/api/v1/")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_prefix_mounts_at_root() {
        let app = router(state(), "");
        let (status, _) = send(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
