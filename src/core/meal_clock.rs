use crate::domain::model::{DayWindow, MealSlot};
use crate::utils::error::{AdmitError, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Timelike, Utc};

/// Maps instants to the canteen's local meal slot and calendar day.
#[derive(Debug, Clone, Copy)]
pub struct MealSchedule {
    breakfast_start: u32,
    lunch_start: u32,
    dinner_start: u32,
    offset: FixedOffset,
}

impl MealSchedule {
    pub fn new(
        breakfast_start: u32,
        lunch_start: u32,
        dinner_start: u32,
        utc_offset_minutes: i32,
    ) -> Result<Self> {
        crate::utils::validation::validate_meal_hours(breakfast_start, lunch_start, dinner_start)?;
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            AdmitError::InvalidConfigValueError {
                field: "canteen.utc_offset_minutes".to_string(),
                value: utc_offset_minutes.to_string(),
                reason: "Offset is out of range".to_string(),
            }
        })?;

        Ok(Self {
            breakfast_start,
            lunch_start,
            dinner_start,
            offset,
        })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Early-morning hours before breakfast opens still count as dinner.
    pub fn slot_at(&self, instant: DateTime<Utc>) -> MealSlot {
        let hour = instant.with_timezone(&self.offset).hour();
        if hour >= self.breakfast_start && hour < self.lunch_start {
            MealSlot::Breakfast
        } else if hour >= self.lunch_start && hour < self.dinner_start {
            MealSlot::Lunch
        } else {
            MealSlot::Dinner
        }
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn day_window(&self, date: NaiveDate) -> DayWindow {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let start =
            (local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc();
        DayWindow {
            date,
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn window_containing(&self, instant: DateTime<Utc>) -> DayWindow {
        self.day_window(self.local_date(instant))
    }
}

impl Default for MealSchedule {
    fn default() -> Self {
        Self {
            breakfast_start: 6,
            lunch_start: 11,
            dinner_start: 16,
            offset: Utc.fix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn test_slot_boundaries_follow_start_hours() {
        let schedule = MealSchedule::default();
        assert_eq!(schedule.slot_at(utc(5, 59)), MealSlot::Dinner);
        assert_eq!(schedule.slot_at(utc(6, 0)), MealSlot::Breakfast);
        assert_eq!(schedule.slot_at(utc(10, 59)), MealSlot::Breakfast);
        assert_eq!(schedule.slot_at(utc(11, 0)), MealSlot::Lunch);
        assert_eq!(schedule.slot_at(utc(15, 59)), MealSlot::Lunch);
        assert_eq!(schedule.slot_at(utc(16, 0)), MealSlot::Dinner);
        assert_eq!(schedule.slot_at(utc(23, 30)), MealSlot::Dinner);
    }

    #[test]
    fn test_offset_shifts_slot_and_date() {
        // UTC+05:30
        let schedule = MealSchedule::new(6, 11, 16, 330).unwrap();
        // 02:00 UTC is 07:30 local
        assert_eq!(schedule.slot_at(utc(2, 0)), MealSlot::Breakfast);
        // 20:00 UTC is 01:30 local on the next day
        assert_eq!(
            schedule.local_date(utc(20, 0)),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_day_window_is_half_open() {
        let schedule = MealSchedule::new(6, 11, 16, 60).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let window = schedule.day_window(date);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 13, 23, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 14, 23, 0, 0).unwrap());
        assert!(window.contains(window.start));
        assert!(window.contains(window.end - Duration::nanoseconds(1)));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_rejects_unordered_hours() {
        assert!(MealSchedule::new(12, 11, 16, 0).is_err());
    }
}
