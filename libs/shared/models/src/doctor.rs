use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring weekly time window with a booking capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySlot {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub max_bookings: u32,
    pub bookings_made: u32,
}

impl WeeklySlot {
    pub fn has_capacity(&self) -> bool {
        self.bookings_made < self.max_bookings
    }
}

/// Doctor record as this core sees it: weekly slot definitions plus
/// the daily capacity counters. Owned by an external CRUD surface;
/// only the counters and `last_reset_date` are written here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialization: String,
    pub hospital_id: Uuid,
    pub hospital_name: String,
    pub weekly_slots: Vec<WeeklySlot>,
    pub emergency_slots_per_day: u32,
    pub emergency_bookings_today: u32,
    /// Day the counters were last zeroed.
    pub last_reset_date: NaiveDate,
}

impl Doctor {
    /// Index of the weekly slot for the given day, if the doctor
    /// practices that day.
    pub fn slot_index(&self, weekday: Weekday) -> Option<usize> {
        self.weekly_slots.iter().position(|s| s.weekday == weekday)
    }

    pub fn has_emergency_capacity(&self) -> bool {
        self.emergency_bookings_today < self.emergency_slots_per_day
    }
}
