//! crates/study_tracker_core/src/views.rs
//!
//! Filtered and sorted views over a snapshot. Every function takes the
//! snapshot by reference and returns a fresh vector.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Reverse;

use crate::dates::is_past;
use crate::domain::{StudySession, Task};
use crate::progress::percentage;

/// Incomplete tasks, earliest due first, at most `limit`.
pub fn upcoming_tasks(tasks: &[Task], limit: usize) -> Vec<Task> {
    let mut open: Vec<Task> = tasks.iter().filter(|t| !t.completed).cloned().collect();
    open.sort_by_key(|t| t.due_date);
    open.truncate(limit);
    open
}

/// Sessions dated today or later, earliest first, at most `limit`.
pub fn upcoming_sessions(sessions: &[StudySession], now: DateTime<Utc>, limit: usize) -> Vec<StudySession> {
    let today = now.date_naive();
    let mut ahead: Vec<StudySession> = sessions
        .iter()
        .filter(|s| s.date >= today)
        .cloned()
        .collect();
    ahead.sort_by_key(|s| (s.date, s.start_time));
    ahead.truncate(limit);
    ahead
}

/// Display flag only; never used to filter.
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    !task.completed && is_past(task.due_date, now)
}

/// `(active, completed)`: active by due date ascending, completed by most
/// recent completion first (falling back to the due date).
pub fn partition_by_completion(tasks: &[Task]) -> (Vec<Task>, Vec<Task>) {
    let (mut completed, mut active): (Vec<Task>, Vec<Task>) =
        tasks.iter().cloned().partition(|t| t.completed);

    active.sort_by_key(|t| t.due_date);
    completed.sort_by_key(|t| Reverse(t.completed_at.unwrap_or(t.due_date)));
    (active, completed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardLimits {
    pub tasks: usize,
    pub sessions: usize,
}

impl Default for DashboardLimits {
    fn default() -> Self {
        Self { tasks: 3, sessions: 2 }
    }
}

/// The home overview: overall completion plus what is coming up next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total: u32,
    pub completed: u32,
    pub percentage: u32,
    pub upcoming_tasks: Vec<Task>,
    pub upcoming_sessions: Vec<StudySession>,
}

pub fn dashboard(
    tasks: &[Task],
    sessions: &[StudySession],
    now: DateTime<Utc>,
    limits: DashboardLimits,
) -> Dashboard {
    let total = tasks.len() as u32;
    let completed = tasks.iter().filter(|t| t.completed).count() as u32;
    Dashboard {
        total,
        completed,
        percentage: percentage(completed, total),
        upcoming_tasks: upcoming_tasks(tasks, limits.tasks),
        upcoming_sessions: upcoming_sessions(sessions, now, limits.sessions),
    }
}
