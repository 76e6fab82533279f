use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::AdmitError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = AdmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealSlot::Breakfast),
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            other => Err(AdmitError::ValidationError {
                message: format!("Unknown meal slot '{}', expected breakfast, lunch or dinner", other),
            }),
        }
    }
}

/// Remaining meal entitlements. Unsigned, so a balance can never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenBalance {
    pub breakfast: u32,
    pub lunch: u32,
    pub dinner: u32,
}

impl TokenBalance {
    pub fn new(breakfast: u32, lunch: u32, dinner: u32) -> Self {
        Self {
            breakfast,
            lunch,
            dinner,
        }
    }

    pub fn uniform(count: u32) -> Self {
        Self::new(count, count, count)
    }

    pub fn get(&self, slot: MealSlot) -> u32 {
        match slot {
            MealSlot::Breakfast => self.breakfast,
            MealSlot::Lunch => self.lunch,
            MealSlot::Dinner => self.dinner,
        }
    }

    pub fn set(&mut self, slot: MealSlot, value: u32) {
        match slot {
            MealSlot::Breakfast => self.breakfast = value,
            MealSlot::Lunch => self.lunch = value,
            MealSlot::Dinner => self.dinner = value,
        }
    }

    /// Balance after consuming one token, or `None` when the slot is empty.
    pub fn consume(&self, slot: MealSlot) -> Option<TokenBalance> {
        let remaining = self.get(slot).checked_sub(1)?;
        let mut next = *self;
        next.set(slot, remaining);
        Some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub year: u32,
    pub email: String,
    pub phone_number: String,
    pub tokens: TokenBalance,
    /// Bumped by the store on every write; used for optimistic concurrency.
    #[serde(default)]
    pub version: u64,
}

/// Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: StudentId,
    pub meal_slot: MealSlot,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendance {
    pub student_id: StudentId,
    pub meal_slot: MealSlot,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

impl NewAttendance {
    pub fn into_record(self, id: RecordId) -> AttendanceRecord {
        AttendanceRecord {
            id,
            student_id: self.student_id,
            meal_slot: self.meal_slot,
            date: self.date,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

/// A message addressed to a set of students, kept for the notice board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub recipients: Vec<StudentId>,
    pub sent_at: DateTime<Utc>,
    pub status: NotificationStatus,
}

/// Half-open instant range `[start, end)` covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_decrements_only_the_requested_slot() {
        let tokens = TokenBalance::new(1, 0, 5);
        assert_eq!(tokens.consume(MealSlot::Lunch), None);
        assert_eq!(
            tokens.consume(MealSlot::Breakfast),
            Some(TokenBalance::new(0, 0, 5))
        );
    }

    #[test]
    fn test_meal_slot_parsing() {
        assert_eq!("Lunch".parse::<MealSlot>().unwrap(), MealSlot::Lunch);
        assert_eq!(" dinner ".parse::<MealSlot>().unwrap(), MealSlot::Dinner);
        assert!("supper".parse::<MealSlot>().is_err());
    }

    #[test]
    fn test_student_serializes_with_camel_case_fields() {
        let student = Student {
            id: StudentId::new("s-1"),
            name: "Asha".to_string(),
            roll_number: "CS2021001".to_string(),
            department: "Computer Science".to_string(),
            year: 3,
            email: "asha@example.com".to_string(),
            phone_number: "1234567890".to_string(),
            tokens: TokenBalance::uniform(10),
            version: 0,
        };

        let json = serde_json::to_value(&student).unwrap();
        assert_eq!(json["id"], "s-1");
        assert_eq!(json["rollNumber"], "CS2021001");
        assert_eq!(json["tokens"]["lunch"], 10);
    }
}
