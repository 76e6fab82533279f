use crate::core::admission::{decide, Decision, Denial};
use crate::core::meal_clock::MealSchedule;
use crate::domain::model::{MealSlot, RecordId, Student, StudentId};
use crate::domain::ports::{Clock, CommitResult, RecordStore, SystemClock};
use crate::utils::error::{AdmitError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct GatePolicy {
    /// Upper bound for every individual record store call.
    pub operation_timeout: Duration,
    /// Upper bound for waiting on another admission for the same key.
    pub lock_timeout: Duration,
    /// Re-decide attempts after the student changed between read and commit.
    pub max_conflict_retries: u32,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_millis(2000),
            lock_timeout: Duration::from_millis(5000),
            max_conflict_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdmissionOutcome {
    Admitted { student: Student, record_id: RecordId },
    Denied(Denial),
}

impl AdmissionOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionOutcome::Admitted { .. })
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            AdmissionOutcome::Denied(denial) => Some(denial),
            AdmissionOutcome::Admitted { .. } => None,
        }
    }
}

/// Serialization unit for admissions: one student, one slot, one local day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AdmissionKey {
    student_id: StudentId,
    slot: MealSlot,
    date: NaiveDate,
}

impl std::fmt::Display for AdmissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.student_id, self.slot, self.date)
    }
}

/// Applies admission decisions against a record store.
///
/// Admissions for the same (student, slot, day) run one at a time; different
/// keys proceed in parallel. The store commit itself is conditional on the
/// student version read for the decision, so writers outside this process
/// cannot cause lost token updates either.
pub struct AdmissionGate<S: RecordStore, C: Clock = SystemClock> {
    store: Arc<S>,
    clock: C,
    schedule: MealSchedule,
    policy: GatePolicy,
    inflight: Mutex<HashMap<AdmissionKey, Arc<Mutex<()>>>>,
}

impl<S: RecordStore> AdmissionGate<S, SystemClock> {
    pub fn new(store: Arc<S>, schedule: MealSchedule, policy: GatePolicy) -> Self {
        Self::with_clock(store, SystemClock, schedule, policy)
    }
}

impl<S: RecordStore, C: Clock> AdmissionGate<S, C> {
    pub fn with_clock(store: Arc<S>, clock: C, schedule: MealSchedule, policy: GatePolicy) -> Self {
        Self {
            store,
            clock,
            schedule,
            policy,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn schedule(&self) -> &MealSchedule {
        &self.schedule
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Admits `student_id` for `slot`, or for the slot of the current time of day.
    pub async fn admit(
        &self,
        student_id: &StudentId,
        slot: Option<MealSlot>,
    ) -> Result<AdmissionOutcome> {
        let now = self.clock.now();
        let slot = slot.unwrap_or_else(|| self.schedule.slot_at(now));
        let window = self.schedule.window_containing(now);
        let key = AdmissionKey {
            student_id: student_id.clone(),
            slot,
            date: window.date,
        };

        let _guard = self.acquire(&key).await?;
        tracing::debug!("Admission lock acquired for {}", key);

        let mut attempts = 0u32;
        loop {
            attempts += 1;

            let student = self
                .bounded("get_student", self.store.get_student(student_id))
                .await?
                .ok_or_else(|| AdmitError::StudentNotFound {
                    student_id: student_id.to_string(),
                })?;

            let existing = if student.tokens.get(slot) == 0 {
                Vec::new()
            } else {
                self.bounded(
                    "list_attendance",
                    self.store
                        .list_attendance(student_id, slot, window.start, window.end),
                )
                .await?
            };

            let intent = match decide(&student, slot, &existing, &window, now) {
                Decision::Deny(denial) => {
                    tracing::info!(
                        student_id = %student_id,
                        slot = %slot,
                        reason = %denial.reason,
                        "Admission denied"
                    );
                    return Ok(AdmissionOutcome::Denied(denial));
                }
                Decision::Admit(intent) => intent,
            };

            match self
                .bounded("commit_admission", self.store.commit_admission(&intent))
                .await?
            {
                CommitResult::Committed { record_id, student } => {
                    tracing::info!(
                        student_id = %student_id,
                        slot = %slot,
                        remaining = student.tokens.get(slot),
                        record_id = %record_id,
                        "Admission recorded"
                    );
                    return Ok(AdmissionOutcome::Admitted { student, record_id });
                }
                CommitResult::Duplicate => {
                    tracing::info!(
                        student_id = %student_id,
                        slot = %slot,
                        "Admission denied: record committed elsewhere"
                    );
                    return Ok(AdmissionOutcome::Denied(Denial::already_marked(&student, slot)));
                }
                CommitResult::VersionMismatch { current_version } => {
                    tracing::warn!(
                        student_id = %student_id,
                        expected = intent.expected_version,
                        current = current_version,
                        attempt = attempts,
                        "Student changed during admission"
                    );
                    if attempts > self.policy.max_conflict_retries {
                        return Err(AdmitError::Conflict {
                            student_id: student_id.to_string(),
                            attempts,
                        });
                    }
                }
            }
        }
    }

    async fn acquire(&self, key: &AdmissionKey) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // Entries referenced only by the map have no holder or waiter.
            inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                inflight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        timeout(self.policy.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| AdmitError::LockTimeout {
                key: key.to_string(),
                elapsed: self.policy.lock_timeout,
            })
    }

    async fn bounded<T, F>(&self, operation: &str, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match timeout(self.policy.operation_timeout, op).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Record store call {} timed out", operation);
                Err(AdmitError::StoreTimeout {
                    operation: operation.to_string(),
                    elapsed: self.policy.operation_timeout,
                })
            }
        }
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;
    use crate::core::admission::DenialReason;
    use crate::domain::model::TokenBalance;
    use crate::domain::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    fn gate(store: Arc<MemoryStore>) -> AdmissionGate<MemoryStore, FixedClock> {
        let noon = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        AdmissionGate::with_clock(
            store,
            FixedClock(noon),
            MealSchedule::default(),
            GatePolicy::default(),
        )
    }

    fn seeded(tokens: TokenBalance) -> (Arc<MemoryStore>, StudentId) {
        let store = Arc::new(MemoryStore::new());
        let id = store.seed_student("Asha", "CS2021001", tokens);
        (store, id)
    }

    #[tokio::test]
    async fn test_slot_defaults_to_time_of_day() {
        let (store, id) = seeded(TokenBalance::new(2, 2, 2));
        let gate = gate(Arc::clone(&store));

        let outcome = gate.admit(&id, None).await.unwrap();
        match outcome {
            AdmissionOutcome::Admitted { student, .. } => {
                assert_eq!(student.tokens, TokenBalance::new(2, 1, 2));
            }
            other => panic!("expected admission, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_student_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store);

        let err = gate
            .admit(&StudentId::new("ghost"), Some(MealSlot::Lunch))
            .await
            .unwrap_err();
        assert!(matches!(err, AdmitError::StudentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_second_admission_is_denied_without_decrement() {
        let (store, id) = seeded(TokenBalance::uniform(5));
        let gate = gate(Arc::clone(&store));

        assert!(gate.admit(&id, Some(MealSlot::Dinner)).await.unwrap().is_admitted());
        let second = gate.admit(&id, Some(MealSlot::Dinner)).await.unwrap();

        assert_eq!(second.denial().map(|d| d.reason), Some(DenialReason::AlreadyMarked));
        let student = store.get_student(&id).await.unwrap().unwrap();
        assert_eq!(student.tokens.dinner, 4);
    }

    #[tokio::test]
    async fn test_lock_entries_are_pruned() {
        let (store, id) = seeded(TokenBalance::uniform(5));
        let gate = gate(store);

        for slot in MealSlot::ALL {
            gate.admit(&id, Some(slot)).await.unwrap();
        }
        // The last key's entry stays until the next acquisition prunes it.
        assert!(gate.tracked_keys().await <= 1);
    }
}
