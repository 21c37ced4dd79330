//! crates/study_tracker_core/src/tracker.rs
//!
//! The thin data-access layer between callers and the document store.
//!
//! Writes are validated before the store is touched. Reads always list the
//! whole collection and derive views from that fresh snapshot; nothing is
//! cached between calls.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::domain::{Account, SessionDraft, SessionPatch, StudySession, Task, TaskDraft, TaskPatch};
use crate::error::{TrackerError, TrackerResult};
use crate::ports::{Collection, DocumentStore, PortError};
use crate::progress::{compute_progress, ProgressReport};
use crate::records::{
    completion_patch_document, new_session_document, new_task_document, parse_sessions, parse_tasks,
    session_patch_document, task_patch_document, try_parse_session, try_parse_task, Snapshot,
};
use crate::schedule::{group_by_date, DateGroup};
use crate::validation::{
    reconcile_session_times, validate_session_draft, validate_session_patch, validate_task_draft,
    validate_task_patch, ScheduleAdvisory,
};
use crate::views::{dashboard, partition_by_completion, Dashboard, DashboardLimits};

/// Resolves the ambient "maybe signed in" state into an account or an error.
pub fn require_account(current: Option<Account>) -> TrackerResult<Account> {
    current.ok_or(TrackerError::NotAuthenticated)
}

/// A derived view plus the number of malformed records left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct View<T> {
    pub value: T,
    pub skipped: usize,
}

/// Result of saving a study session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSession {
    pub id: String,
    pub advisory: Option<ScheduleAdvisory>,
}

#[derive(Clone)]
pub struct StudyTracker {
    store: Arc<dyn DocumentStore>,
}

impl StudyTracker {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // --- Tasks ---

    pub async fn add_task(&self, account: &Account, draft: TaskDraft, now: DateTime<Utc>) -> TrackerResult<String> {
        validate_task_draft(&draft)?;
        let id = self
            .store
            .add(account, Collection::Tasks, new_task_document(&draft, now))
            .await?;
        info!("Task {} created for account {}", id, account.id);
        Ok(id)
    }

    pub async fn list_tasks(&self, account: &Account) -> TrackerResult<Snapshot<Task>> {
        let docs = self.store.list(account, Collection::Tasks).await?;
        Ok(parse_tasks(&docs))
    }

    /// Fetches one task, failing fast if its stored form is malformed.
    pub async fn get_task(&self, account: &Account, id: &str) -> TrackerResult<Task> {
        let docs = self.store.list(account, Collection::Tasks).await?;
        let doc = docs
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Task {id} not found")))?;
        try_parse_task(doc)
    }

    pub async fn update_task(
        &self,
        account: &Account,
        id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> TrackerResult<()> {
        validate_task_patch(&patch)?;
        self.store
            .update(account, Collection::Tasks, id, task_patch_document(&patch, now))
            .await?;
        Ok(())
    }

    /// Moves a task between Active and Completed. Requesting the state the task
    /// is already in is a validation error.
    pub async fn set_task_completed(
        &self,
        account: &Account,
        id: &str,
        completed: bool,
        now: DateTime<Utc>,
    ) -> TrackerResult<Task> {
        let mut task = self.get_task(account, id).await?;
        if completed {
            task.complete(now)?;
        } else {
            task.reopen(now)?;
        }
        self.store
            .update(account, Collection::Tasks, id, completion_patch_document(&task))
            .await?;
        Ok(task)
    }

    pub async fn delete_task(&self, account: &Account, id: &str) -> TrackerResult<()> {
        self.store.delete(account, Collection::Tasks, id).await?;
        info!("Task {} deleted for account {}", id, account.id);
        Ok(())
    }

    // --- Study sessions ---

    pub async fn add_session(
        &self,
        account: &Account,
        mut draft: SessionDraft,
        now: DateTime<Utc>,
    ) -> TrackerResult<SavedSession> {
        let advisory = validate_session_draft(&mut draft)?;
        let id = self
            .store
            .add(account, Collection::Sessions, new_session_document(&draft, now))
            .await?;
        info!("Study session {} created for account {}", id, account.id);
        Ok(SavedSession { id, advisory })
    }

    pub async fn list_sessions(&self, account: &Account) -> TrackerResult<Snapshot<StudySession>> {
        let docs = self.store.list(account, Collection::Sessions).await?;
        Ok(parse_sessions(&docs))
    }

    /// Fetches one session, failing fast if its stored form is malformed.
    pub async fn get_session(&self, account: &Account, id: &str) -> TrackerResult<StudySession> {
        let docs = self.store.list(account, Collection::Sessions).await?;
        let doc = docs
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Study session {id} not found")))?;
        try_parse_session(doc)
    }

    pub async fn update_session(
        &self,
        account: &Account,
        id: &str,
        mut patch: SessionPatch,
        now: DateTime<Utc>,
    ) -> TrackerResult<SavedSession> {
        let mut advisory = validate_session_patch(&mut patch)?;
        if patch.start_time.is_some() != patch.end_time.is_some() {
            let stored = self.get_session(account, id).await?;
            advisory = reconcile_session_times(&mut patch, &stored);
        }
        self.store
            .update(account, Collection::Sessions, id, session_patch_document(&patch, now))
            .await?;
        Ok(SavedSession {
            id: id.to_string(),
            advisory,
        })
    }

    pub async fn delete_session(&self, account: &Account, id: &str) -> TrackerResult<()> {
        self.store.delete(account, Collection::Sessions, id).await?;
        info!("Study session {} deleted for account {}", id, account.id);
        Ok(())
    }

    // --- Derived views ---

    pub async fn progress(&self, account: &Account) -> TrackerResult<View<ProgressReport>> {
        let tasks = self.list_tasks(account).await?;
        Ok(View {
            value: compute_progress(&tasks.records),
            skipped: tasks.skipped,
        })
    }

    pub async fn partitioned_tasks(&self, account: &Account) -> TrackerResult<View<(Vec<Task>, Vec<Task>)>> {
        let tasks = self.list_tasks(account).await?;
        Ok(View {
            value: partition_by_completion(&tasks.records),
            skipped: tasks.skipped,
        })
    }

    pub async fn schedule(&self, account: &Account) -> TrackerResult<View<Vec<DateGroup>>> {
        let sessions = self.list_sessions(account).await?;
        Ok(View {
            value: group_by_date(&sessions.records),
            skipped: sessions.skipped,
        })
    }

    pub async fn dashboard(
        &self,
        account: &Account,
        now: DateTime<Utc>,
        limits: DashboardLimits,
    ) -> TrackerResult<View<Dashboard>> {
        let tasks = self.list_tasks(account).await?;
        let sessions = self.list_sessions(account).await?;
        Ok(View {
            value: dashboard(&tasks.records, &sessions.records, now, limits),
            skipped: tasks.skipped + sessions.skipped,
        })
    }
}
