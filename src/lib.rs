pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::CanteenConfig;

pub use crate::adapters::{identify::LabelIdentifier, memory_store::MemoryStore};
pub use crate::core::{
    admission::{decide, Decision, Denial, DenialReason},
    gate::{AdmissionGate, AdmissionOutcome, GatePolicy},
    kiosk::{CaptureOutcome, Kiosk},
    meal_clock::MealSchedule,
    notify::{NotificationDraft, NotificationService},
    roster::RosterService,
};
pub use crate::utils::error::{AdmitError, Result};
