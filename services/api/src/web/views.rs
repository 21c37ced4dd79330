//! services/api/src/web/views.rs
//!
//! Read-only derived views: progress report, schedule and dashboard.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use study_tracker_core::{dates::format_date, Account, Dashboard, ProgressReport};

use crate::error::{reject, HandlerError};
use crate::web::sessions::SessionView;
use crate::web::state::AppState;

#[derive(Serialize)]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub report: ProgressReport,
    pub skipped: usize,
}

#[derive(Serialize)]
pub struct ScheduleGroup {
    pub key: String,
    pub label: String,
    pub sessions: Vec<SessionView>,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub groups: Vec<ScheduleGroup>,
    pub skipped: usize,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub dashboard: Dashboard,
    pub skipped: usize,
}

#[utoipa::path(
    get,
    path = "/progress",
    responses((status = 200, description = "Completion totals overall, per subject and per weekday of the due date"))
)]
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, HandlerError> {
    let view = state
        .tracker
        .progress(&account)
        .await
        .map_err(reject("Failed to compute progress"))?;

    Ok(Json(ProgressResponse {
        report: view.value,
        skipped: view.skipped,
    }))
}

#[utoipa::path(
    get,
    path = "/schedule",
    responses((status = 200, description = "Study sessions grouped by day in ascending date order"))
)]
pub async fn schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, HandlerError> {
    let view = state
        .tracker
        .schedule(&account)
        .await
        .map_err(reject("Failed to load schedule"))?;

    let now = Utc::now();
    let groups = view
        .value
        .into_iter()
        .map(|group| ScheduleGroup {
            key: group.key(),
            label: format_date(group.date),
            sessions: group.sessions.into_iter().map(|s| SessionView::new(s, now)).collect(),
        })
        .collect();

    Ok(Json(ScheduleResponse {
        groups,
        skipped: view.skipped,
    }))
}

#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Overall completion with the next tasks and sessions"))
)]
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, HandlerError> {
    let view = state
        .tracker
        .dashboard(&account, Utc::now(), state.config.dashboard_limits)
        .await
        .map_err(reject("Failed to build dashboard"))?;

    Ok(Json(DashboardResponse {
        dashboard: view.value,
        skipped: view.skipped,
    }))
}
