//! crates/study_tracker_core/src/records.rs
//!
//! Conversion between raw store documents and the typed records.
//!
//! Reading is tolerant of the shapes older clients wrote: timestamps may be
//! RFC 3339 strings, bare `YYYY-MM-DD` dates, or `{ seconds, nanoseconds }`
//! objects. Anything that still cannot be read is a malformed record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::domain::{Priority, SessionDraft, SessionPatch, StudySession, Task, TaskDraft, TaskPatch};
use crate::error::{TrackerError, TrackerResult};
use crate::ports::RawDocument;

/// Records parsed from one listing, plus how many documents were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

//=========================================================================================
// Reading
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDocument {
    title: Option<String>,
    description: Option<String>,
    due_date: Option<Value>,
    priority: Option<String>,
    subject: Option<String>,
    completed: Option<bool>,
    completed_at: Option<Value>,
    created_at: Option<Value>,
    updated_at: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionDocument {
    title: Option<String>,
    date: Option<Value>,
    start_time: Option<Value>,
    end_time: Option<Value>,
    location: Option<String>,
    subject: Option<String>,
    notes: Option<String>,
    created_at: Option<Value>,
    updated_at: Option<Value>,
}

fn timestamp(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::String(text) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
                return Ok(ts.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
                .ok_or_else(|| format!("unparseable timestamp '{text}'"))
        }
        Value::Object(fields) => {
            let seconds = fields
                .get("seconds")
                .and_then(Value::as_i64)
                .ok_or_else(|| "timestamp object without seconds".to_string())?;
            let nanos = fields.get("nanoseconds").and_then(Value::as_u64).unwrap_or(0);
            let nanos = u32::try_from(nanos).map_err(|_| format!("nanoseconds {nanos} out of range"))?;
            DateTime::<Utc>::from_timestamp(seconds, nanos)
                .ok_or_else(|| format!("timestamp {seconds} out of range"))
        }
        other => Err(format!("expected a timestamp, found {other}")),
    }
}

fn required_timestamp(field: &str, value: Option<&Value>) -> Result<DateTime<Utc>, String> {
    match value {
        None | Some(Value::Null) => Err(format!("missing {field}")),
        Some(v) => timestamp(v).map_err(|e| format!("{field}: {e}")),
    }
}

fn optional_timestamp(field: &str, value: Option<&Value>) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => timestamp(v).map(Some).map_err(|e| format!("{field}: {e}")),
    }
}

fn required_title(title: Option<String>) -> Result<String, String> {
    title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| "missing title".to_string())
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

fn malformed(id: &str, reason: impl Into<String>) -> TrackerError {
    TrackerError::MalformedRecord {
        id: id.to_string(),
        reason: reason.into(),
    }
}

/// Parses one task document, failing fast on anything unreadable.
pub fn try_parse_task(doc: &RawDocument) -> TrackerResult<Task> {
    let raw: TaskDocument =
        serde_json::from_value(doc.body.clone()).map_err(|e| malformed(&doc.id, e.to_string()))?;
    let parse = || -> Result<Task, String> {
        let completed = raw.completed.unwrap_or(false);
        let completed_at = if completed {
            optional_timestamp("completedAt", raw.completed_at.as_ref())?
        } else {
            None
        };
        Ok(Task {
            id: doc.id.clone(),
            title: required_title(raw.title.clone())?,
            description: non_blank(raw.description.clone()),
            due_date: required_timestamp("dueDate", raw.due_date.as_ref())?,
            priority: raw
                .priority
                .as_deref()
                .map(Priority::from_label)
                .unwrap_or_default(),
            subject: non_blank(raw.subject.clone()),
            completed,
            completed_at,
            created_at: optional_timestamp("createdAt", raw.created_at.as_ref())?,
            updated_at: optional_timestamp("updatedAt", raw.updated_at.as_ref())?,
        })
    };
    parse().map_err(|reason| malformed(&doc.id, reason))
}

pub fn try_parse_session(doc: &RawDocument) -> TrackerResult<StudySession> {
    let raw: SessionDocument =
        serde_json::from_value(doc.body.clone()).map_err(|e| malformed(&doc.id, e.to_string()))?;
    let parse = || -> Result<StudySession, String> {
        let start_time = required_timestamp("startTime", raw.start_time.as_ref())?;
        Ok(StudySession {
            id: doc.id.clone(),
            title: required_title(raw.title.clone())?,
            // The calendar day is taken from `date`; the time of day is ignored.
            date: required_timestamp("date", raw.date.as_ref())?.date_naive(),
            start_time,
            end_time: required_timestamp("endTime", raw.end_time.as_ref())?,
            location: non_blank(raw.location.clone()),
            subject: non_blank(raw.subject.clone()),
            notes: non_blank(raw.notes.clone()),
            created_at: optional_timestamp("createdAt", raw.created_at.as_ref())?,
            updated_at: optional_timestamp("updatedAt", raw.updated_at.as_ref())?,
        })
    };
    parse().map_err(|reason| malformed(&doc.id, reason))
}

fn parse_lenient<T>(
    docs: &[RawDocument],
    parse: impl Fn(&RawDocument) -> TrackerResult<T>,
) -> Snapshot<T> {
    let mut records = Vec::with_capacity(docs.len());
    let mut skipped = 0;
    for doc in docs {
        match parse(doc) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping record: {}", e);
                skipped += 1;
            }
        }
    }
    Snapshot { records, skipped }
}

/// Parses a task listing, skipping and counting malformed documents.
pub fn parse_tasks(docs: &[RawDocument]) -> Snapshot<Task> {
    parse_lenient(docs, try_parse_task)
}

pub fn parse_sessions(docs: &[RawDocument]) -> Snapshot<StudySession> {
    parse_lenient(docs, try_parse_session)
}

//=========================================================================================
// Writing
//=========================================================================================

/// Empty strings clear the field.
fn clearable(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::String(trimmed.to_string())
    }
}

fn optional_text(text: &Option<String>) -> Value {
    text.as_deref().map(clearable).unwrap_or(Value::Null)
}

pub fn new_task_document(draft: &TaskDraft, now: DateTime<Utc>) -> Value {
    json!({
        "title": draft.title.trim(),
        "description": optional_text(&draft.description),
        "dueDate": draft.due_date,
        "priority": draft.priority,
        "subject": optional_text(&draft.subject),
        "completed": false,
        "completedAt": null,
        "createdAt": now,
    })
}

pub fn task_patch_document(patch: &TaskPatch, now: DateTime<Utc>) -> Value {
    let mut fields = Map::new();
    if let Some(title) = &patch.title {
        fields.insert("title".into(), json!(title.trim()));
    }
    if let Some(description) = &patch.description {
        fields.insert("description".into(), clearable(description));
    }
    if let Some(due_date) = patch.due_date {
        fields.insert("dueDate".into(), json!(due_date));
    }
    if let Some(priority) = patch.priority {
        fields.insert("priority".into(), json!(priority));
    }
    if let Some(subject) = &patch.subject {
        fields.insert("subject".into(), clearable(subject));
    }
    fields.insert("updatedAt".into(), json!(now));
    Value::Object(fields)
}

/// The fields written by a completion transition of `task`.
pub fn completion_patch_document(task: &Task) -> Value {
    json!({
        "completed": task.completed,
        "completedAt": task.completed_at,
        "updatedAt": task.updated_at,
    })
}

pub fn new_session_document(draft: &SessionDraft, now: DateTime<Utc>) -> Value {
    json!({
        "title": draft.title.trim(),
        "date": draft.date,
        "startTime": draft.start_time,
        "endTime": draft.end_time,
        "location": optional_text(&draft.location),
        "subject": optional_text(&draft.subject),
        "notes": optional_text(&draft.notes),
        "createdAt": now,
    })
}

pub fn session_patch_document(patch: &SessionPatch, now: DateTime<Utc>) -> Value {
    let mut fields = Map::new();
    if let Some(title) = &patch.title {
        fields.insert("title".into(), json!(title.trim()));
    }
    if let Some(date) = patch.date {
        fields.insert("date".into(), json!(date));
    }
    if let Some(start) = patch.start_time {
        fields.insert("startTime".into(), json!(start));
    }
    if let Some(end) = patch.end_time {
        fields.insert("endTime".into(), json!(end));
    }
    for (key, value) in [
        ("location", &patch.location),
        ("subject", &patch.subject),
        ("notes", &patch.notes),
    ] {
        if let Some(text) = value {
            fields.insert(key.into(), clearable(text));
        }
    }
    fields.insert("updatedAt".into(), json!(now));
    Value::Object(fields)
}
