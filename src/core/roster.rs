use crate::adapters::roster_csv::{read_roster, write_roster, RosterRow};
use crate::domain::model::{MealSlot, Student, StudentId, TokenBalance};
use crate::domain::ports::RecordStore;
use crate::utils::error::{AdmitError, Result};
use crate::utils::validation::validate_required_field;
use std::io::{Read, Write};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub name: String,
    pub roll_number: String,
    pub department: String,
    pub year: u32,
    pub email: String,
    pub phone_number: String,
    /// Falls back to the configured default allotment.
    pub tokens: Option<TokenBalance>,
}

/// Search term matches name, roll number or email (case-insensitive);
/// department and year must match exactly when set.
#[derive(Debug, Clone, Default)]
pub struct RosterFilter {
    pub search: Option<String>,
    pub department: Option<String>,
    pub year: Option<u32>,
}

impl RosterFilter {
    pub fn matches(&self, student: &Student) -> bool {
        if let Some(term) = self.search.as_deref().map(str::to_lowercase) {
            let hit = [&student.name, &student.roll_number, &student.email]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if &student.department != department {
                return false;
            }
        }
        if let Some(year) = self.year {
            if student.year != year {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// 1-based CSV rows that were incomplete or clashed with an existing roll number.
    pub skipped_rows: Vec<usize>,
}

pub struct RosterService<S: RecordStore> {
    store: Arc<S>,
    default_tokens: TokenBalance,
}

impl<S: RecordStore> RosterService<S> {
    pub fn new(store: Arc<S>, default_tokens: TokenBalance) -> Self {
        Self {
            store,
            default_tokens,
        }
    }

    pub async fn add_student(&self, draft: NewStudent) -> Result<Student> {
        validate_required_field("name", &draft.name)?;
        validate_required_field("roll_number", &draft.roll_number)?;
        validate_required_field("email", &draft.email)?;

        let student = Student {
            id: StudentId::generate(),
            name: draft.name,
            roll_number: draft.roll_number,
            department: draft.department,
            year: draft.year.max(1),
            email: draft.email,
            phone_number: draft.phone_number,
            tokens: draft.tokens.unwrap_or(self.default_tokens),
            version: 0,
        };
        let stored = self.store.put_student(student).await?;
        tracing::info!("Added student {} ({})", stored.name, stored.roll_number);
        Ok(stored)
    }

    pub async fn update_student(&self, student: Student) -> Result<Student> {
        if self.store.get_student(&student.id).await?.is_none() {
            return Err(AdmitError::StudentNotFound {
                student_id: student.id.to_string(),
            });
        }
        validate_required_field("name", &student.name)?;
        validate_required_field("roll_number", &student.roll_number)?;
        self.store.put_student(student).await
    }

    pub async fn remove_student(&self, id: &StudentId) -> Result<()> {
        if !self.store.delete_student(id).await? {
            return Err(AdmitError::StudentNotFound {
                student_id: id.to_string(),
            });
        }
        tracing::info!("Removed student {}", id);
        Ok(())
    }

    /// Students matching `filter`, ordered by roll number.
    pub async fn list(&self, filter: &RosterFilter) -> Result<Vec<Student>> {
        let mut students: Vec<Student> = self
            .store
            .list_students()
            .await?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        students.sort_by(|a, b| a.roll_number.cmp(&b.roll_number));
        Ok(students)
    }

    /// Overwrites one slot's balance, e.g. for a monthly top-up.
    pub async fn set_tokens(&self, id: &StudentId, slot: MealSlot, value: u32) -> Result<()> {
        self.store.update_student_tokens(id, slot, value).await?;
        tracing::info!("Set {} tokens for {} to {}", slot, id, value);
        Ok(())
    }

    pub async fn import_csv<R: Read>(&self, reader: R) -> Result<ImportSummary> {
        let report = read_roster(reader)?;
        if report.rows.is_empty() {
            return Err(AdmitError::ValidationError {
                message: "No valid student data found in the CSV file".to_string(),
            });
        }

        let mut summary = ImportSummary {
            imported: 0,
            skipped_rows: report.skipped_rows,
        };
        let existing = self.store.list_students().await?;
        for RosterRow { line, student } in report.rows {
            if existing.iter().any(|s| s.roll_number == student.roll_number) {
                tracing::warn!("Roll number {} already registered, skipping", student.roll_number);
                summary.skipped_rows.push(line);
                continue;
            }
            match self.store.put_student(student).await {
                Ok(_) => summary.imported += 1,
                Err(AdmitError::ValidationError { message }) => {
                    tracing::warn!("Skipping row {}: {}", line, message);
                    summary.skipped_rows.push(line);
                }
                Err(e) => return Err(e),
            }
        }

        summary.skipped_rows.sort_unstable();
        tracing::info!(
            "Imported {} students ({} rows skipped)",
            summary.imported,
            summary.skipped_rows.len()
        );
        Ok(summary)
    }

    pub async fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let students = self.list(&RosterFilter::default()).await?;
        write_roster(writer, &students)?;
        Ok(students.len())
    }
}
