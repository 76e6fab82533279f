//! Pure admission decision.
//!
//! Takes a snapshot of the student and of the records already stored for the
//! slot, and produces either a denial or the write set to apply. No I/O happens
//! here; the gate is responsible for reading snapshots and committing intents.

use crate::domain::model::{AttendanceRecord, DayWindow, MealSlot, NewAttendance, Student};
use crate::domain::ports::AdmissionIntent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NoTokensAvailable,
    AlreadyMarked,
}

impl DenialReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::NoTokensAvailable => "no_tokens_available",
            DenialReason::AlreadyMarked => "already_marked",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    pub reason: DenialReason,
    pub message: String,
}

impl Denial {
    pub fn no_tokens(student: &Student, slot: MealSlot) -> Self {
        Self {
            reason: DenialReason::NoTokensAvailable,
            message: format!("No {} tokens available for {}", slot, student.name),
        }
    }

    pub fn already_marked(student: &Student, slot: MealSlot) -> Self {
        Self {
            reason: DenialReason::AlreadyMarked,
            message: format!("{} already marked attendance for {} today", student.name, slot),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Deny(Denial),
    Admit(AdmissionIntent),
}

/// Decides whether `student` may take `slot` within `window`.
///
/// The token check runs first, so an empty slot is always reported as
/// `NoTokensAvailable` even when a record already exists.
pub fn decide(
    student: &Student,
    slot: MealSlot,
    existing: &[AttendanceRecord],
    window: &DayWindow,
    now: DateTime<Utc>,
) -> Decision {
    let balance = student.tokens.get(slot);
    if balance == 0 {
        return Decision::Deny(Denial::no_tokens(student, slot));
    }

    let already_marked = existing.iter().any(|record| {
        record.student_id == student.id
            && record.meal_slot == slot
            && window.contains(record.timestamp)
    });
    if already_marked {
        return Decision::Deny(Denial::already_marked(student, slot));
    }

    Decision::Admit(AdmissionIntent {
        record: NewAttendance {
            student_id: student.id.clone(),
            meal_slot: slot,
            date: window.date,
            timestamp: now,
        },
        expected_version: student.version,
        new_balance: balance - 1,
    })
}
