use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdmitError {
    #[error("Student not found: {student_id}")]
    StudentNotFound { student_id: String },

    #[error("Notification not found: {notification_id}")]
    NotificationNotFound { notification_id: String },

    #[error("Record store unavailable during {operation}: {message}")]
    StoreUnavailable { operation: String, message: String },

    #[error("Record store timed out during {operation} after {elapsed:?}")]
    StoreTimeout { operation: String, elapsed: Duration },

    #[error("Timed out after {elapsed:?} waiting for admission lock on {key}")]
    LockTimeout { key: String, elapsed: Duration },

    #[error("Face recognition failed: {message}")]
    RecognitionFailed { message: String },

    #[error("Concurrent token updates for {student_id} kept conflicting after {attempts} attempts")]
    Conflict { student_id: String, attempts: u32 },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lookup,
    Recognition,
    Store,
    Concurrency,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AdmitError {
    pub fn store_unavailable(operation: &str, message: impl Into<String>) -> Self {
        AdmitError::StoreUnavailable {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AdmitError::StudentNotFound { .. } | AdmitError::NotificationNotFound { .. } => {
                ErrorCategory::Lookup
            }
            AdmitError::RecognitionFailed { .. } => ErrorCategory::Recognition,
            AdmitError::StoreUnavailable { .. } | AdmitError::StoreTimeout { .. } => {
                ErrorCategory::Store
            }
            AdmitError::LockTimeout { .. } | AdmitError::Conflict { .. } => {
                ErrorCategory::Concurrency
            }
            AdmitError::ConfigError { .. }
            | AdmitError::InvalidConfigValueError { .. }
            | AdmitError::TomlError(_) => ErrorCategory::Configuration,
            AdmitError::ValidationError { .. }
            | AdmitError::CsvError(_)
            | AdmitError::SerializationError(_) => ErrorCategory::Data,
            AdmitError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Recognition | ErrorCategory::Store | ErrorCategory::Concurrency => {
                ErrorSeverity::Medium
            }
            ErrorCategory::Lookup | ErrorCategory::Configuration | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Transient failures where repeating the whole admission may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.severity(), ErrorSeverity::Medium)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        if let AdmitError::NotificationNotFound { .. } = self {
            return "List notifications to find a valid id";
        }
        match self.category() {
            ErrorCategory::Lookup => "Check that the student is enrolled in the roster",
            ErrorCategory::Recognition => "Ask the student to face the camera and capture again",
            ErrorCategory::Store => "Check connectivity to the record store and retry the admission",
            ErrorCategory::Concurrency => "Another kiosk is admitting the same student; retry shortly",
            ErrorCategory::Configuration => "Review the configuration file and command line flags",
            ErrorCategory::Data => "Check the input data format",
            ErrorCategory::System => "Check file paths and permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AdmitError::StudentNotFound { student_id } => {
                format!("No student with id {} is registered", student_id)
            }
            AdmitError::StoreUnavailable { .. } | AdmitError::StoreTimeout { .. } => {
                "Attendance could not be recorded because the record store is unavailable".to_string()
            }
            AdmitError::LockTimeout { .. } | AdmitError::Conflict { .. } => {
                "Attendance is being recorded on another device, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdmitError>;
