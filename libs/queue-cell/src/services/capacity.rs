use chrono::{DateTime, Utc, Weekday};
use tracing::{debug, info};

use shared_models::Doctor;

use crate::error::QueueError;

/// Per-doctor, per-weekday slot capacity plus the daily emergency
/// quota. Counters live on the doctor record and are zeroed once per
/// calendar day; callers serialize access per (doctor, day), which is
/// what makes check-then-commit sound.
pub struct SlotCapacityTracker;

impl SlotCapacityTracker {
    pub fn new() -> Self {
        Self
    }

    /// Index of the doctor's weekly slot for the requested day.
    pub fn resolve_slot(&self, doctor: &Doctor, weekday: Weekday) -> Result<usize, QueueError> {
        doctor
            .slot_index(weekday)
            .ok_or(QueueError::SlotNotFound { weekday })
    }

    pub fn has_capacity(&self, doctor: &Doctor, slot_index: usize, emergency: bool) -> bool {
        self.ensure_capacity(doctor, slot_index, emergency).is_ok()
    }

    /// Typed capacity check. Emergency bookings are bounded by the
    /// daily quota on top of the slot capacity.
    pub fn ensure_capacity(
        &self,
        doctor: &Doctor,
        slot_index: usize,
        emergency: bool,
    ) -> Result<(), QueueError> {
        if emergency && !doctor.has_emergency_capacity() {
            return Err(QueueError::EmergencyCapacityExceeded);
        }
        let slot = &doctor.weekly_slots[slot_index];
        if !slot.has_capacity() {
            return Err(QueueError::SlotFull);
        }
        Ok(())
    }

    /// Increment the counters, re-validating first so a capacity fact
    /// that changed since the earlier check still fails typed.
    pub fn commit(
        &self,
        doctor: &mut Doctor,
        slot_index: usize,
        emergency: bool,
    ) -> Result<(), QueueError> {
        self.ensure_capacity(doctor, slot_index, emergency)?;

        if emergency {
            doctor.emergency_bookings_today += 1;
        }
        doctor.weekly_slots[slot_index].bookings_made += 1;

        debug!(
            "committed capacity for doctor {}: slot {}/{}, emergency {}/{}",
            doctor.id,
            doctor.weekly_slots[slot_index].bookings_made,
            doctor.weekly_slots[slot_index].max_bookings,
            doctor.emergency_bookings_today,
            doctor.emergency_slots_per_day,
        );
        Ok(())
    }

    /// Zero every counter once the calendar day changes. Returns true
    /// when a reset happened so the caller knows to persist the
    /// doctor. Running it again on the same day is a no-op.
    pub fn rollover_if_new_day(&self, doctor: &mut Doctor, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if doctor.last_reset_date == today {
            return false;
        }

        for slot in &mut doctor.weekly_slots {
            slot.bookings_made = 0;
        }
        doctor.emergency_bookings_today = 0;
        doctor.last_reset_date = today;

        info!("reset daily counters for doctor {} on {}", doctor.id, today);
        true
    }
}

impl Default for SlotCapacityTracker {
    fn default() -> Self {
        Self::new()
    }
}
