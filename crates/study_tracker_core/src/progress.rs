//! crates/study_tracker_core/src/progress.rs
//!
//! Completion statistics over a task snapshot: overall, per subject and per
//! weekday of the due date.

use chrono::{Datelike, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::Task;

/// Weekday buckets in display order.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// `round(completed / total * 100)`, half away from zero; 0 when `total == 0`.
///
/// This deliberately departs from plain rounding at the top end: only a fully
/// completed bucket reports 100, and anything short of that is capped at 99,
/// so 199/200 gives 99 where `round` would give 100.
pub fn percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (c, t) = (u64::from(completed), u64::from(total));
    let rounded = ((c * 200 + t) / (t * 2)) as u32;
    if completed < total {
        rounded.min(99)
    } else {
        rounded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectProgress {
    pub subject: String,
    pub total: u32,
    pub completed: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayProgress {
    pub weekday: Weekday,
    pub total: u32,
    pub completed: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub total: u32,
    pub completed: u32,
    pub overall_percentage: u32,
    pub by_subject: BTreeMap<String, SubjectProgress>,
    /// Always seven entries, Monday first.
    pub by_weekday: Vec<WeekdayProgress>,
}

impl ProgressReport {
    pub fn weekday(&self, day: Weekday) -> &WeekdayProgress {
        &self.by_weekday[day.num_days_from_monday() as usize]
    }
}

#[derive(Default, Clone, Copy)]
struct Tally {
    total: u32,
    completed: u32,
}

impl Tally {
    fn add(&mut self, completed: bool) {
        self.total += 1;
        if completed {
            self.completed += 1;
        }
    }
}

pub fn compute_progress(tasks: &[Task]) -> ProgressReport {
    let mut overall = Tally::default();
    let mut subjects: BTreeMap<String, Tally> = BTreeMap::new();
    let mut weekdays = [Tally::default(); 7];

    for task in tasks {
        overall.add(task.completed);
        if let Some(subject) = task.subject_label() {
            subjects
                .entry(subject.to_string())
                .or_default()
                .add(task.completed);
        }
        let slot = task.due_date.weekday().num_days_from_monday() as usize;
        weekdays[slot].add(task.completed);
    }

    let by_subject = subjects
        .into_iter()
        .map(|(subject, tally)| {
            let progress = SubjectProgress {
                subject: subject.clone(),
                total: tally.total,
                completed: tally.completed,
                percentage: percentage(tally.completed, tally.total),
            };
            (subject, progress)
        })
        .collect();

    let by_weekday = WEEKDAYS
        .iter()
        .zip(weekdays)
        .map(|(&weekday, tally)| WeekdayProgress {
            weekday,
            total: tally.total,
            completed: tally.completed,
            percentage: percentage(tally.completed, tally.total),
        })
        .collect();

    ProgressReport {
        total: overall.total,
        completed: overall.completed,
        overall_percentage: percentage(overall.completed, overall.total),
        by_subject,
        by_weekday,
    }
}
