pub mod admission;
pub mod gate;
pub mod kiosk;
pub mod meal_clock;
pub mod notify;
pub mod report;
pub mod roster;

pub use crate::domain::model::{AttendanceRecord, MealSlot, Student, StudentId, TokenBalance};
pub use crate::domain::ports::{Clock, Identifier, RecordStore};
pub use crate::utils::error::Result;
