//! services/api/src/web/tasks.rs
//!
//! Task CRUD endpoints. Every read lists the full collection from the store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{is_overdue, Account, Task, TaskDraft, TaskPatch};

use crate::error::{reject, HandlerError};
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A task as shown in lists, with its overdue flag.
#[derive(Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub overdue: bool,
}

impl TaskView {
    pub fn new(task: Task, now: DateTime<Utc>) -> Self {
        let overdue = is_overdue(&task, now);
        Self { task, overdue }
    }
}

fn task_views(tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<TaskView> {
    tasks.into_iter().map(|t| TaskView::new(t, now)).collect()
}

#[derive(Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
    pub skipped: usize,
}

#[derive(Serialize)]
pub struct PartitionedTasksResponse {
    pub active: Vec<TaskView>,
    pub completed: Vec<TaskView>,
    pub skipped: usize,
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Deserialize)]
pub struct CompletionRequest {
    pub completed: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List every task of the signed-in account.
#[utoipa::path(
    get,
    path = "/tasks",
    responses((status = 200, description = "All tasks, unordered, with overdue flags"))
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, HandlerError> {
    let snapshot = state
        .tracker
        .list_tasks(&account)
        .await
        .map_err(reject("Failed to load tasks"))?;

    Ok(Json(TaskListResponse {
        tasks: task_views(snapshot.records, Utc::now()),
        skipped: snapshot.skipped,
    }))
}

/// Active tasks by due date and completed tasks by most recent completion.
#[utoipa::path(
    get,
    path = "/tasks/partitioned",
    responses((status = 200, description = "Active and completed task lists"))
)]
pub async fn partitioned_tasks_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, HandlerError> {
    let view = state
        .tracker
        .partitioned_tasks(&account)
        .await
        .map_err(reject("Failed to load tasks"))?;

    let now = Utc::now();
    let (active, completed) = view.value;
    Ok(Json(PartitionedTasksResponse {
        active: task_views(active, now),
        completed: task_views(completed, now),
        skipped: view.skipped,
    }))
}

#[utoipa::path(
    post,
    path = "/tasks",
    request_body(content_type = "application/json", description = "title, dueDate, and optional description, priority, subject"),
    responses(
        (status = 201, description = "Task created"),
        (status = 400, description = "Missing title")
    )
)]
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Json(draft): Json<TaskDraft>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = state
        .tracker
        .add_task(&account, draft, Utc::now())
        .await
        .map_err(reject("Failed to save task"))?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

#[utoipa::path(
    patch,
    path = "/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    request_body(content_type = "application/json", description = "Any subset of the task fields; empty strings clear optional text"),
    responses(
        (status = 204, description = "Task updated"),
        (status = 404, description = "No such task")
    )
)]
pub async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<StatusCode, HandlerError> {
    state
        .tracker
        .update_task(&account, &id, patch, Utc::now())
        .await
        .map_err(reject("Failed to update task"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a task completed or active again.
#[utoipa::path(
    put,
    path = "/tasks/{id}/completion",
    params(("id" = String, Path, description = "Task id")),
    request_body(content_type = "application/json", description = "{ \"completed\": bool }"),
    responses(
        (status = 200, description = "The task after the transition"),
        (status = 400, description = "Task already in the requested state"),
        (status = 404, description = "No such task")
    )
)]
pub async fn set_completion_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
    Json(req): Json<CompletionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let now = Utc::now();
    let task = state
        .tracker
        .set_task_completed(&account, &id, req.completed, now)
        .await
        .map_err(reject("Failed to update task"))?;
    Ok(Json(TaskView::new(task, now)))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "No such task")
    )
)]
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    state
        .tracker
        .delete_task(&account, &id)
        .await
        .map_err(reject("Failed to delete task"))?;
    Ok(StatusCode::NO_CONTENT)
}
