//! crates/study_tracker_core/src/validation.rs
//!
//! Synchronous checks run before any store or identity call.

use chrono::Duration;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::domain::{SessionDraft, SessionPatch, StudySession, TaskDraft, TaskPatch};
use crate::error::{TrackerError, TrackerResult};

pub const MIN_PASSWORD_LEN: usize = 6;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

fn require_title(title: &str, what: &str) -> TrackerResult<()> {
    if title.trim().is_empty() {
        return Err(TrackerError::Validation(format!("Please enter a {what} title")));
    }
    Ok(())
}

pub fn validate_task_draft(draft: &TaskDraft) -> TrackerResult<()> {
    require_title(&draft.title, "task")
}

pub fn validate_task_patch(patch: &TaskPatch) -> TrackerResult<()> {
    if patch.is_empty() {
        return Err(TrackerError::Validation("Nothing to update".to_string()));
    }
    match &patch.title {
        Some(title) => require_title(title, "task"),
        None => Ok(()),
    }
}

/// Non-blocking notice attached to a saved session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ScheduleAdvisory {
    /// The end time preceded the start time and was moved to start + 1h.
    EndTimeAdjusted,
}

/// Validates a new session. A start after the end is not an error: the end is
/// moved to one hour after the start and an advisory is returned.
pub fn validate_session_draft(draft: &mut SessionDraft) -> TrackerResult<Option<ScheduleAdvisory>> {
    require_title(&draft.title, "session")?;
    if draft.start_time > draft.end_time {
        draft.end_time = draft.start_time + Duration::hours(1);
        return Ok(Some(ScheduleAdvisory::EndTimeAdjusted));
    }
    Ok(None)
}

/// Same as [`validate_session_draft`], but only when both times are in the patch.
pub fn validate_session_patch(patch: &mut SessionPatch) -> TrackerResult<Option<ScheduleAdvisory>> {
    if patch.is_empty() {
        return Err(TrackerError::Validation("Nothing to update".to_string()));
    }
    if let Some(title) = &patch.title {
        require_title(title, "session")?;
    }
    if let (Some(start), Some(end)) = (patch.start_time, patch.end_time) {
        if start > end {
            patch.end_time = Some(start + Duration::hours(1));
            return Ok(Some(ScheduleAdvisory::EndTimeAdjusted));
        }
    }
    Ok(None)
}

/// Checks a patch that moves only one of the two times against the stored
/// session. Same adjustment as [`validate_session_draft`].
pub fn reconcile_session_times(patch: &mut SessionPatch, stored: &StudySession) -> Option<ScheduleAdvisory> {
    let start = patch.start_time.unwrap_or(stored.start_time);
    let end = patch.end_time.unwrap_or(stored.end_time);
    if start > end {
        patch.end_time = Some(start + Duration::hours(1));
        return Some(ScheduleAdvisory::EndTimeAdjusted);
    }
    None
}

fn validate_new_password(password: &str, confirmation: &str) -> TrackerResult<()> {
    if password != confirmation {
        return Err(TrackerError::Validation("Passwords do not match".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(TrackerError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirmation: &str,
) -> TrackerResult<()> {
    if [name, email, password, confirmation]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(TrackerError::Validation("Please fill in all fields".to_string()));
    }
    if !email_pattern().is_match(email.trim()) {
        return Err(TrackerError::Validation(format!("'{email}' is not a valid email address")));
    }
    validate_new_password(password, confirmation)
}

pub fn validate_display_name(name: &str) -> TrackerResult<()> {
    if name.trim().is_empty() {
        return Err(TrackerError::Validation("Name cannot be empty".to_string()));
    }
    Ok(())
}

pub fn validate_password_change(current: &str, new: &str, confirmation: &str) -> TrackerResult<()> {
    if current.is_empty() || new.is_empty() || confirmation.is_empty() {
        return Err(TrackerError::Validation("Please fill in all fields".to_string()));
    }
    validate_new_password(new, confirmation)
}
