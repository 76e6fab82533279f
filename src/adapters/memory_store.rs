use crate::domain::model::{
    AttendanceRecord, MealSlot, NewAttendance, Notification, NotificationId, NotificationStatus,
    RecordId, Student, StudentId, TokenBalance,
};
use crate::domain::ports::{AdmissionIntent, CommitResult, RecordStore};
use crate::utils::error::{AdmitError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Collections {
    students: BTreeMap<StudentId, Student>,
    attendance: Vec<AttendanceRecord>,
    /// Uniqueness index over (student, slot, local date).
    marked: HashSet<(StudentId, MealSlot, NaiveDate)>,
    notifications: Vec<Notification>,
}

impl Collections {
    fn insert_record(&mut self, record: NewAttendance) -> Result<RecordId> {
        let key = (record.student_id.clone(), record.meal_slot, record.date);
        if self.marked.contains(&key) {
            return Err(AdmitError::ValidationError {
                message: format!(
                    "Attendance already recorded for {} ({}) on {}",
                    record.student_id, record.meal_slot, record.date
                ),
            });
        }

        let id = RecordId::generate();
        self.marked.insert(key);
        self.attendance.push(record.into_record(id.clone()));
        Ok(id)
    }
}

/// In-process record store. Every operation runs under one lock, which makes
/// `commit_admission` a single atomic transaction.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_students(students: impl IntoIterator<Item = Student>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap_or_else(PoisonError::into_inner);
            for student in students {
                inner.students.insert(student.id.clone(), student);
            }
        }
        store
    }

    /// Adds a student with placeholder contact details and returns its id.
    pub fn seed_student(&self, name: &str, roll_number: &str, tokens: TokenBalance) -> StudentId {
        let id = StudentId::generate();
        let student = Student {
            id: id.clone(),
            name: name.to_string(),
            roll_number: roll_number.to_string(),
            department: String::new(),
            year: 1,
            email: String::new(),
            phone_number: String::new(),
            tokens,
            version: 0,
        };
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.students.insert(id.clone(), student);
        id
    }

    pub fn attendance_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .attendance
            .len()
    }

    fn collections(&self, operation: &str) -> Result<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| AdmitError::store_unavailable(operation, "store lock poisoned"))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_student(&self, id: &StudentId) -> Result<Option<Student>> {
        Ok(self.collections("get_student")?.students.get(id).cloned())
    }

    async fn list_attendance(
        &self,
        student_id: &StudentId,
        slot: MealSlot,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>> {
        let inner = self.collections("list_attendance")?;
        Ok(inner
            .attendance
            .iter()
            .filter(|r| {
                &r.student_id == student_id
                    && r.meal_slot == slot
                    && r.timestamp >= range_start
                    && r.timestamp < range_end
            })
            .cloned()
            .collect())
    }

    async fn insert_attendance(&self, record: NewAttendance) -> Result<RecordId> {
        self.collections("insert_attendance")?.insert_record(record)
    }

    async fn update_student_tokens(
        &self,
        student_id: &StudentId,
        slot: MealSlot,
        new_value: u32,
    ) -> Result<()> {
        let mut inner = self.collections("update_student_tokens")?;
        let student = inner
            .students
            .get_mut(student_id)
            .ok_or_else(|| AdmitError::StudentNotFound {
                student_id: student_id.to_string(),
            })?;
        student.tokens.set(slot, new_value);
        student.version += 1;
        Ok(())
    }

    async fn commit_admission(&self, intent: &AdmissionIntent) -> Result<CommitResult> {
        let mut inner = self.collections("commit_admission")?;
        let student_id = &intent.record.student_id;

        let current_version = inner
            .students
            .get(student_id)
            .map(|s| s.version)
            .ok_or_else(|| AdmitError::StudentNotFound {
                student_id: student_id.to_string(),
            })?;

        let key = (student_id.clone(), intent.record.meal_slot, intent.record.date);
        if inner.marked.contains(&key) {
            return Ok(CommitResult::Duplicate);
        }
        if current_version != intent.expected_version {
            return Ok(CommitResult::VersionMismatch { current_version });
        }

        // Both writes happen under the same guard; nothing is visible until both are done.
        let record_id = inner.insert_record(intent.record.clone())?;
        let student = match inner.students.get_mut(student_id) {
            Some(student) => student,
            None => {
                return Err(AdmitError::StudentNotFound {
                    student_id: student_id.to_string(),
                })
            }
        };
        student.tokens.set(intent.record.meal_slot, intent.new_balance);
        student.version += 1;

        Ok(CommitResult::Committed {
            record_id,
            student: student.clone(),
        })
    }

    async fn list_students(&self) -> Result<Vec<Student>> {
        Ok(self
            .collections("list_students")?
            .students
            .values()
            .cloned()
            .collect())
    }

    async fn put_student(&self, mut student: Student) -> Result<Student> {
        let mut inner = self.collections("put_student")?;

        let roll_taken = inner
            .students
            .values()
            .any(|s| s.id != student.id && s.roll_number == student.roll_number);
        if roll_taken {
            return Err(AdmitError::ValidationError {
                message: format!("Roll number {} is already registered", student.roll_number),
            });
        }

        student.version = inner
            .students
            .get(&student.id)
            .map(|existing| existing.version + 1)
            .unwrap_or(0);
        inner.students.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    async fn delete_student(&self, id: &StudentId) -> Result<bool> {
        Ok(self.collections("delete_student")?.students.remove(id).is_some())
    }

    async fn attendance_between(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>> {
        let inner = self.collections("attendance_between")?;
        Ok(inner
            .attendance
            .iter()
            .filter(|r| r.timestamp >= range_start && r.timestamp < range_end)
            .cloned()
            .collect())
    }

    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        let mut inner = self.collections("insert_notification")?;
        if inner.notifications.iter().any(|n| n.id == notification.id) {
            return Err(AdmitError::ValidationError {
                message: format!("Notification {} already exists", notification.id),
            });
        }
        inner.notifications.push(notification);
        Ok(())
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        let mut notifications = self.collections("list_notifications")?.notifications.clone();
        notifications.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(notifications)
    }

    async fn set_notification_status(
        &self,
        id: &NotificationId,
        status: NotificationStatus,
    ) -> Result<bool> {
        let mut inner = self.collections("set_notification_status")?;
        match inner.notifications.iter_mut().find(|n| &n.id == id) {
            Some(notification) => {
                notification.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
