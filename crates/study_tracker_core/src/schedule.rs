//! crates/study_tracker_core/src/schedule.rs
//!
//! Groups study sessions by calendar day for the schedule view.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dates::date_key;
use crate::domain::StudySession;

/// All sessions that fall on one calendar day, earliest start first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub sessions: Vec<StudySession>,
}

impl DateGroup {
    pub fn key(&self) -> String {
        date_key(self.date)
    }
}

/// Partitions `sessions` by their `date`. Groups come back in ascending date
/// order. No past/future filtering happens here.
pub fn group_by_date(sessions: &[StudySession]) -> Vec<DateGroup> {
    let mut by_day: BTreeMap<NaiveDate, Vec<StudySession>> = BTreeMap::new();
    for session in sessions {
        by_day.entry(session.date).or_default().push(session.clone());
    }

    by_day
        .into_iter()
        .map(|(date, mut sessions)| {
            sessions.sort_by_key(|s| s.start_time);
            DateGroup { date, sessions }
        })
        .collect()
}
