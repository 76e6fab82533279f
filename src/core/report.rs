use crate::core::meal_clock::MealSchedule;
use crate::domain::model::{MealSlot, NotificationStatus, Student, StudentId};
use crate::domain::ports::RecordStore;
use crate::utils::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentAttendance {
    pub student_name: String,
    pub meal_slot: MealSlot,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_students: usize,
    pub breakfast: usize,
    pub lunch: usize,
    pub dinner: usize,
    pub total_attendance: usize,
    /// Share of enrolled students with at least one meal today, rounded.
    pub attendance_rate_percent: u32,
    /// Tokens consumed today against three meals per enrolled student, rounded.
    pub token_usage_percent: u32,
    /// Notifications still waiting for delivery, across all days.
    pub pending_notifications: usize,
    pub recent: Vec<RecentAttendance>,
}

impl DailySummary {
    pub fn count(&self, slot: MealSlot) -> usize {
        match slot {
            MealSlot::Breakfast => self.breakfast,
            MealSlot::Lunch => self.lunch,
            MealSlot::Dinner => self.dinner,
        }
    }
}

fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

pub async fn daily_summary<S: RecordStore + ?Sized>(
    store: &S,
    schedule: &MealSchedule,
    date: NaiveDate,
) -> Result<DailySummary> {
    let window = schedule.day_window(date);
    let students = store.list_students().await?;
    let mut records = store.attendance_between(window.start, window.end).await?;
    let pending_notifications = store
        .list_notifications()
        .await?
        .iter()
        .filter(|n| n.status == NotificationStatus::Pending)
        .count();

    let names: HashMap<&StudentId, &Student> = students.iter().map(|s| (&s.id, s)).collect();
    let mut attended = std::collections::HashSet::new();
    let (mut breakfast, mut lunch, mut dinner) = (0, 0, 0);
    for record in &records {
        attended.insert(record.student_id.clone());
        match record.meal_slot {
            MealSlot::Breakfast => breakfast += 1,
            MealSlot::Lunch => lunch += 1,
            MealSlot::Dinner => dinner += 1,
        }
    }

    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let recent = records
        .iter()
        .take(RECENT_LIMIT)
        .map(|r| RecentAttendance {
            student_name: names
                .get(&r.student_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "Unknown Student".to_string()),
            meal_slot: r.meal_slot,
            timestamp: r.timestamp,
        })
        .collect();

    let total_attendance = records.len();
    let summary = DailySummary {
        date,
        total_students: students.len(),
        breakfast,
        lunch,
        dinner,
        total_attendance,
        attendance_rate_percent: rounded_percent(attended.len(), students.len()),
        token_usage_percent: rounded_percent(total_attendance, students.len() * 3),
        pending_notifications,
        recent,
    };

    tracing::debug!(
        "Summary for {}: {} students, {}/{}/{} meals",
        date,
        summary.total_students,
        breakfast,
        lunch,
        dinner
    );
    Ok(summary)
}
