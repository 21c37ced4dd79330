pub mod dates;
pub mod domain;
pub mod error;
pub mod ports;
pub mod progress;
pub mod records;
pub mod schedule;
pub mod tracker;
pub mod validation;
pub mod views;

pub use domain::{
    Account, AccountEvent, Priority, ProfileUpdate, SessionDraft, SessionPatch, SignedIn, StudySession, Task,
    TaskDraft, TaskPatch,
};
pub use error::{TrackerError, TrackerResult};
pub use ports::{
    AccountEventStream, Collection, DocumentStore, IdentityProvider, PortError, PortResult, RawDocument,
};
pub use progress::{compute_progress, ProgressReport, SubjectProgress, WeekdayProgress};
pub use records::Snapshot;
pub use schedule::{group_by_date, DateGroup};
pub use tracker::{require_account, SavedSession, StudyTracker, View};
pub use views::{
    dashboard, is_overdue, partition_by_completion, upcoming_sessions, upcoming_tasks, Dashboard,
    DashboardLimits,
};
