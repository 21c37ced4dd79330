//! services/api/src/web/sessions.rs
//!
//! Study session CRUD endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use study_tracker_core::{
    dates::{format_time, relative_day_description},
    validation::ScheduleAdvisory,
    Account, SavedSession, SessionDraft, SessionPatch, StudySession,
};

use crate::error::{reject, HandlerError};
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A session with its display labels.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: StudySession,
    pub day_label: String,
    pub time_range: String,
}

impl SessionView {
    pub fn new(session: StudySession, now: DateTime<Utc>) -> Self {
        let day_label = relative_day_description(session.date, now);
        let time_range = format!("{} - {}", format_time(session.start_time), format_time(session.end_time));
        Self {
            session,
            day_label,
            time_range,
        }
    }
}

#[derive(Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionView>,
    pub skipped: usize,
}

#[derive(Serialize)]
pub struct SavedSessionResponse {
    pub id: String,
    pub advisory: Option<ScheduleAdvisory>,
}

impl From<SavedSession> for SavedSessionResponse {
    fn from(saved: SavedSession) -> Self {
        Self {
            id: saved.id,
            advisory: saved.advisory,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/sessions",
    responses((status = 200, description = "All study sessions, sorted by date then start time"))
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, HandlerError> {
    let snapshot = state
        .tracker
        .list_sessions(&account)
        .await
        .map_err(reject("Failed to load study sessions"))?;

    let now = Utc::now();
    let mut sessions = snapshot.records;
    sessions.sort_by_key(|s| (s.date, s.start_time));
    Ok(Json(SessionListResponse {
        sessions: sessions.into_iter().map(|s| SessionView::new(s, now)).collect(),
        skipped: snapshot.skipped,
    }))
}

#[utoipa::path(
    post,
    path = "/sessions",
    request_body(content_type = "application/json", description = "title, date, startTime, endTime, and optional location, subject, notes"),
    responses(
        (status = 201, description = "Session created; an advisory is set when the end time was adjusted"),
        (status = 400, description = "Missing title")
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Json(draft): Json<SessionDraft>,
) -> Result<impl IntoResponse, HandlerError> {
    let saved = state
        .tracker
        .add_session(&account, draft, Utc::now())
        .await
        .map_err(reject("Failed to save study session"))?;
    Ok((StatusCode::CREATED, Json(SavedSessionResponse::from(saved))))
}

#[utoipa::path(
    patch,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    request_body(content_type = "application/json", description = "Any subset of the session fields"),
    responses(
        (status = 200, description = "Session updated"),
        (status = 404, description = "No such session")
    )
)]
pub async fn update_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
    Json(patch): Json<SessionPatch>,
) -> Result<impl IntoResponse, HandlerError> {
    let saved = state
        .tracker
        .update_session(&account, &id, patch, Utc::now())
        .await
        .map_err(reject("Failed to update study session"))?;
    Ok(Json(SavedSessionResponse::from(saved)))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "No such session")
    )
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    state
        .tracker
        .delete_session(&account, &id)
        .await
        .map_err(reject("Failed to delete study session"))?;
    Ok(StatusCode::NO_CONTENT)
}
