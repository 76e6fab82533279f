use crate::core::meal_clock::MealSchedule;
use crate::core::roster::RosterFilter;
use crate::domain::model::{
    MealSlot, Notification, NotificationId, NotificationStatus, Student, StudentId,
};
use crate::domain::ports::{Clock, RecordStore, SystemClock};
use crate::utils::error::{AdmitError, Result};
use crate::utils::validation::validate_required_field;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub recipients: Vec<StudentId>,
}

fn meal_title(slot: MealSlot) -> &'static str {
    match slot {
        MealSlot::Breakfast => "Breakfast",
        MealSlot::Lunch => "Lunch",
        MealSlot::Dinner => "Dinner",
    }
}

/// Composes and records notifications. Delivery is outside this crate; a
/// notification is stored as `Sent` when handed over directly, or `Pending`
/// when queued for a delivery worker.
pub struct NotificationService<S: RecordStore, C: Clock = SystemClock> {
    store: Arc<S>,
    clock: C,
    schedule: MealSchedule,
}

impl<S: RecordStore> NotificationService<S, SystemClock> {
    pub fn new(store: Arc<S>, schedule: MealSchedule) -> Self {
        Self::with_clock(store, SystemClock, schedule)
    }
}

impl<S: RecordStore, C: Clock> NotificationService<S, C> {
    pub fn with_clock(store: Arc<S>, clock: C, schedule: MealSchedule) -> Self {
        Self {
            store,
            clock,
            schedule,
        }
    }

    /// Ids of students matching `filter`, ordered by roll number.
    pub async fn recipients(&self, filter: &RosterFilter) -> Result<Vec<StudentId>> {
        let mut students: Vec<Student> = self
            .store
            .list_students()
            .await?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        students.sort_by(|a, b| a.roll_number.cmp(&b.roll_number));
        Ok(students.into_iter().map(|s| s.id).collect())
    }

    /// Reminder for students matching `filter` who hold a token for `slot`
    /// but have no record for it in today's local day window.
    pub async fn missed_meal(
        &self,
        slot: MealSlot,
        filter: &RosterFilter,
    ) -> Result<NotificationDraft> {
        let window = self.schedule.window_containing(self.clock.now());
        let attended: HashSet<StudentId> = self
            .store
            .attendance_between(window.start, window.end)
            .await?
            .into_iter()
            .filter(|r| r.meal_slot == slot)
            .map(|r| r.student_id)
            .collect();

        let mut missed: Vec<Student> = self
            .store
            .list_students()
            .await?
            .into_iter()
            .filter(|s| filter.matches(s) && s.tokens.get(slot) > 0 && !attended.contains(&s.id))
            .collect();
        missed.sort_by(|a, b| a.roll_number.cmp(&b.roll_number));

        tracing::debug!("{} students missed {} on {}", missed.len(), slot, window.date);
        Ok(NotificationDraft {
            title: format!("Missed {} Attendance", meal_title(slot)),
            message: format!(
                "This is a reminder that you missed your {} attendance today. \
                 Please ensure you mark your attendance for future meals.",
                slot
            ),
            recipients: missed.into_iter().map(|s| s.id).collect(),
        })
    }

    pub async fn send(&self, draft: NotificationDraft) -> Result<Notification> {
        self.record(draft, NotificationStatus::Sent).await
    }

    pub async fn queue(&self, draft: NotificationDraft) -> Result<Notification> {
        self.record(draft, NotificationStatus::Pending).await
    }

    pub async fn set_status(&self, id: &NotificationId, status: NotificationStatus) -> Result<()> {
        if !self.store.set_notification_status(id, status).await? {
            return Err(AdmitError::NotificationNotFound {
                notification_id: id.to_string(),
            });
        }
        tracing::info!("Notification {} marked {:?}", id, status);
        Ok(())
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<Notification>> {
        self.store.list_notifications().await
    }

    async fn record(
        &self,
        draft: NotificationDraft,
        status: NotificationStatus,
    ) -> Result<Notification> {
        validate_required_field("title", &draft.title)?;
        validate_required_field("message", &draft.message)?;
        if draft.recipients.is_empty() {
            return Err(AdmitError::ValidationError {
                message: "Select at least one recipient".to_string(),
            });
        }

        let known: HashSet<StudentId> = self
            .store
            .list_students()
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let mut seen = HashSet::new();
        let mut recipients = Vec::with_capacity(draft.recipients.len());
        for id in draft.recipients {
            if !known.contains(&id) {
                return Err(AdmitError::StudentNotFound {
                    student_id: id.to_string(),
                });
            }
            if seen.insert(id.clone()) {
                recipients.push(id);
            }
        }

        let notification = Notification {
            id: NotificationId::generate(),
            title: draft.title.trim().to_string(),
            message: draft.message.trim().to_string(),
            recipients,
            sent_at: self.clock.now(),
            status,
        };
        self.store.insert_notification(notification.clone()).await?;
        tracing::info!(
            "📣 Notification '{}' for {} students ({:?})",
            notification.title,
            notification.recipients.len(),
            status
        );
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;
    use crate::domain::model::{NewAttendance, TokenBalance};
    use crate::domain::ports::FixedClock;
    use chrono::{Duration, TimeZone, Utc};

    fn evening() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 20, 0, 0).unwrap()
    }

    fn service(store: &Arc<MemoryStore>) -> NotificationService<MemoryStore, FixedClock> {
        NotificationService::with_clock(
            Arc::clone(store),
            FixedClock(evening()),
            MealSchedule::default(),
        )
    }

    fn draft(recipients: Vec<StudentId>) -> NotificationDraft {
        NotificationDraft {
            title: "Canteen Closure Notice".to_string(),
            message: "The canteen will be closed for maintenance on Saturday.".to_string(),
            recipients,
        }
    }

    #[tokio::test]
    async fn test_missed_meal_targets_token_holders_without_a_record() {
        let store = Arc::new(MemoryStore::new());
        let asha = store.seed_student("Asha", "CS2021001", TokenBalance::uniform(5));
        let ravi = store.seed_student("Ravi", "CS2021002", TokenBalance::uniform(5));
        store.seed_student("Meera", "CS2021003", TokenBalance::new(5, 0, 5));
        let kiran = store.seed_student("Kiran", "CS2021004", TokenBalance::uniform(5));

        let lunch = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        for (id, at) in [(&asha, lunch), (&kiran, lunch - Duration::days(1))] {
            store
                .insert_attendance(NewAttendance {
                    student_id: id.clone(),
                    meal_slot: MealSlot::Lunch,
                    date: at.date_naive(),
                    timestamp: at,
                })
                .await
                .unwrap();
        }

        let draft = service(&store)
            .missed_meal(MealSlot::Lunch, &RosterFilter::default())
            .await
            .unwrap();
        assert_eq!(draft.title, "Missed Lunch Attendance");
        assert!(draft.message.contains("missed your lunch attendance today"));
        // Meera has no lunch tokens; Kiran's record is from yesterday.
        assert_eq!(draft.recipients, vec![ravi, kiran]);
    }

    #[tokio::test]
    async fn test_missed_meal_respects_roster_filter() {
        let store = Arc::new(MemoryStore::new());
        store.seed_student("Asha", "CS2021001", TokenBalance::uniform(5));
        let draft = service(&store)
            .missed_meal(
                MealSlot::Dinner,
                &RosterFilter {
                    year: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(draft.recipients.is_empty());
    }

    #[tokio::test]
    async fn test_send_requires_title_message_and_recipients() {
        let store = Arc::new(MemoryStore::new());
        let asha = store.seed_student("Asha", "CS2021001", TokenBalance::uniform(5));
        let notices = service(&store);

        let untitled = NotificationDraft {
            title: " ".to_string(),
            ..draft(vec![asha.clone()])
        };
        assert!(matches!(
            notices.send(untitled).await,
            Err(AdmitError::ValidationError { .. })
        ));
        assert!(matches!(
            notices.send(draft(Vec::new())).await,
            Err(AdmitError::ValidationError { .. })
        ));
        assert!(matches!(
            notices.send(draft(vec![StudentId::new("ghost")])).await,
            Err(AdmitError::StudentNotFound { .. })
        ));
        assert!(notices.list().await.unwrap().is_empty());

        let sent = notices
            .send(draft(vec![asha.clone(), asha.clone()]))
            .await
            .unwrap();
        assert_eq!(sent.recipients, vec![asha]);
        assert_eq!(sent.status, NotificationStatus::Sent);
        assert_eq!(sent.sent_at, evening());
    }

    #[tokio::test]
    async fn test_queued_notification_can_be_marked() {
        let store = Arc::new(MemoryStore::new());
        let asha = store.seed_student("Asha", "CS2021001", TokenBalance::uniform(5));
        let notices = service(&store);

        let queued = notices.queue(draft(vec![asha])).await.unwrap();
        assert_eq!(queued.status, NotificationStatus::Pending);

        notices
            .set_status(&queued.id, NotificationStatus::Failed)
            .await
            .unwrap();
        assert_eq!(notices.list().await.unwrap()[0].status, NotificationStatus::Failed);

        let err = notices
            .set_status(&NotificationId::generate(), NotificationStatus::Sent)
            .await
            .unwrap_err();
        assert!(matches!(err, AdmitError::NotificationNotFound { .. }));
    }
}
