use crate::domain::model::{
    AttendanceRecord, MealSlot, NewAttendance, Notification, NotificationId, NotificationStatus,
    RecordId, Student, StudentId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Write set produced by an admission decision, applied by the store in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionIntent {
    pub record: NewAttendance,
    /// Student version observed when the decision was made.
    pub expected_version: u64,
    pub new_balance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    Committed { record_id: RecordId, student: Student },
    /// A record for the same student, slot and date already exists.
    Duplicate,
    /// The student changed since the snapshot was read.
    VersionMismatch { current_version: u64 },
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_student(&self, id: &StudentId) -> Result<Option<Student>>;

    async fn list_attendance(
        &self,
        student_id: &StudentId,
        slot: MealSlot,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>>;

    async fn insert_attendance(&self, record: NewAttendance) -> Result<RecordId>;

    async fn update_student_tokens(
        &self,
        student_id: &StudentId,
        slot: MealSlot,
        new_value: u32,
    ) -> Result<()>;

    /// Inserts the record and writes the new balance atomically, or neither.
    async fn commit_admission(&self, intent: &AdmissionIntent) -> Result<CommitResult>;

    async fn list_students(&self) -> Result<Vec<Student>>;

    async fn put_student(&self, student: Student) -> Result<Student>;

    async fn delete_student(&self, id: &StudentId) -> Result<bool>;

    async fn attendance_between(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>>;

    async fn insert_notification(&self, notification: Notification) -> Result<()>;

    /// All stored notifications, newest `sent_at` first.
    async fn list_notifications(&self) -> Result<Vec<Notification>>;

    /// Returns false when no notification has this id.
    async fn set_notification_status(
        &self,
        id: &NotificationId,
        status: NotificationStatus,
    ) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification {
    Match(StudentId),
    NoMatch,
}

/// Resolves a captured image to a student. Stands in for a biometric matcher.
#[async_trait]
pub trait Identifier: Send + Sync {
    async fn identify(&self, image: &[u8]) -> Result<Identification>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for replaying captures and for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
