use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{BookingStore, DoctorStore, StoreError};
use shared_models::{Booking, BookingStatus, Doctor};
use shared_utils::{generate_token, Clock};

use crate::error::QueueError;
use crate::models::{BookingResult, CreateBookingRequest, QueuePolicy};
use crate::services::capacity::SlotCapacityTracker;

/// Keyed mutexes serializing booking creation per (doctor, day).
/// Two concurrent requests against the same doctor/day would otherwise
/// both read stale "last booking" state and double-book.
#[derive(Default)]
struct DayLocks {
    inner: Mutex<HashMap<(Uuid, NaiveDate), Arc<AsyncMutex<()>>>>,
}

impl DayLocks {
    fn lock_for(&self, doctor_id: Uuid, date: NaiveDate) -> Arc<AsyncMutex<()>> {
        let mut locks = self.inner.lock().expect("day lock registry poisoned");
        // Drop entries nobody holds or waits on, otherwise the
        // registry grows by one per (doctor, day) for the process
        // lifetime.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry((doctor_id, date)).or_default())
    }
}

/// Computes the estimated start time for a new booking and, for
/// emergencies, the cascade of +allowance shifts over the normal queue.
pub struct BookingTimeEstimator {
    doctors: Arc<dyn DoctorStore>,
    bookings: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    capacity: SlotCapacityTracker,
    policy: QueuePolicy,
    day_locks: DayLocks,
}

impl BookingTimeEstimator {
    pub fn new(
        doctors: Arc<dyn DoctorStore>,
        bookings: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        policy: QueuePolicy,
    ) -> Self {
        Self {
            doctors,
            bookings,
            clock,
            capacity: SlotCapacityTracker::new(),
            policy,
            day_locks: DayLocks::default(),
        }
    }

    /// Book a queue entry: resolve the slot, compute the estimated
    /// start, commit capacity and persist. Holds the per-(doctor, day)
    /// lock across the whole read-compute-write sequence.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<BookingResult, QueueError> {
        let booking_date = request
            .booking_date
            .unwrap_or_else(|| self.clock.now().date_naive());

        let lock = self.day_locks.lock_for(request.doctor_id, booking_date);
        let _guard = lock.lock().await;

        // Read phase, retried on transient store failures. Retrying
        // cannot change a capacity fact, so typed rejections surface
        // immediately.
        let mut attempt = 0u32;
        let (mut doctor, day_rows) = loop {
            match self.load_day_state(request.doctor_id, booking_date).await {
                Ok(state) => break state,
                Err(QueueError::Store(err)) if attempt + 1 < self.policy.max_store_attempts => {
                    attempt += 1;
                    warn!(
                        "store failure reading booking state (attempt {}): {}",
                        attempt, err
                    );
                    sleep(Duration::from_millis(self.policy.retry_backoff_ms << attempt)).await;
                }
                Err(err) => return Err(err),
            }
        };

        let slot_index = self
            .capacity
            .resolve_slot(&doctor, booking_date.weekday())?;
        self.capacity
            .ensure_capacity(&doctor, slot_index, request.emergency)?;

        let slot_start = booking_date
            .and_time(doctor.weekly_slots[slot_index].start_time)
            .and_utc();
        let now = self.clock.now();

        let (estimated_start_time, shifted) =
            self.plan_start_time(slot_start, now, &day_rows, request.emergency);

        // Write phase: cascade shifts first as one atomic batch, then
        // the new booking, then the capacity counters. Every write is
        // idempotent (absolute timestamps, id-keyed rows) so transient
        // failures retry in place.
        if !shifted.is_empty() {
            info!(
                "emergency insertion at {} shifts {} normal booking(s)",
                estimated_start_time,
                shifted.len()
            );
            self.retry_write("cascade shift batch", || {
                self.bookings.update_bookings(&shifted)
            })
            .await?;
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            token_number: generate_token(),
            patient_name: request.patient_name,
            contact: request.contact,
            doctor_id: doctor.id,
            hospital_id: request.hospital_id,
            booking_date,
            emergency: request.emergency,
            status: BookingStatus::Booked,
            estimated_start_time,
            actual_start_time: None,
            actual_end_time: None,
            reminder_sent: false,
            created_at: now,
        };
        self.retry_write("booking insert", || self.bookings.create_booking(&booking))
            .await?;

        self.capacity
            .commit(&mut doctor, slot_index, request.emergency)?;
        self.retry_write("capacity counters", || self.doctors.update_doctor(&doctor))
            .await?;

        info!(
            "booked token {} for doctor {} on {} at {} (emergency: {})",
            booking.token_number, doctor.id, booking_date, estimated_start_time, booking.emergency
        );

        Ok(BookingResult {
            booking_id: booking.id,
            token_number: booking.token_number,
            estimated_start_time,
            doctor_name: doctor.name,
            hospital_name: doctor.hospital_name,
            emergency: booking.emergency,
            status: booking.status,
        })
    }

    /// Bounded retry with doubling backoff for one idempotent store
    /// write. Capacity decisions are settled before the first attempt,
    /// never in here.
    async fn retry_write<T, Fut>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T, QueueError>
    where
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < self.policy.max_store_attempts => {
                    attempt += 1;
                    warn!(
                        "store failure during {} (attempt {}): {}",
                        what, attempt, err
                    );
                    sleep(Duration::from_millis(self.policy.retry_backoff_ms << attempt)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Fetch the doctor (rolling the daily counters over if the
    /// calendar day changed) and the day's bookings.
    async fn load_day_state(
        &self,
        doctor_id: Uuid,
        booking_date: NaiveDate,
    ) -> Result<(Doctor, Vec<Booking>), QueueError> {
        let mut doctor = self
            .doctors
            .doctor(doctor_id)
            .await?
            .ok_or(QueueError::DoctorNotFound)?;

        // Rollover must land before any capacity check on this record.
        if self.capacity.rollover_if_new_day(&mut doctor, self.clock.now()) {
            self.doctors.update_doctor(&doctor).await?;
        }

        let day_rows = self.bookings.bookings_for_day(doctor_id, booking_date).await?;
        Ok((doctor, day_rows))
    }

    /// Pure scheduling arithmetic over the day's rows (sorted
    /// ascending by estimated start).
    ///
    /// Emergencies append after the last emergency (or open at slot
    /// start) and push every normal booking at-or-after that instant
    /// back by the service allowance, in ascending order so shifts
    /// never overtake each other. Normals append after the latest of
    /// slot start, last emergency and last normal; the first booking
    /// of the day also gets a walk-in buffer of one allowance from
    /// now.
    fn plan_start_time(
        &self,
        slot_start: DateTime<Utc>,
        now: DateTime<Utc>,
        day_rows: &[Booking],
        emergency: bool,
    ) -> (DateTime<Utc>, Vec<Booking>) {
        let allowance = ChronoDuration::minutes(self.policy.service_allowance_minutes);
        // Cancelled and completed rows no longer hold a queue spot.
        let last_emergency = day_rows
            .iter()
            .filter(|b| b.emergency && !b.status.is_terminal())
            .last();
        let last_normal = day_rows
            .iter()
            .filter(|b| !b.emergency && !b.status.is_terminal())
            .last();

        if emergency {
            let estimated = match last_emergency {
                Some(prev) => prev.estimated_start_time + allowance,
                None => slot_start,
            };

            let shifted: Vec<Booking> = day_rows
                .iter()
                .filter(|b| {
                    !b.emergency && !b.status.is_terminal() && b.estimated_start_time >= estimated
                })
                .map(|b| {
                    let mut moved = b.clone();
                    moved.estimated_start_time += allowance;
                    debug!(
                        "shifting normal booking {} from {} to {}",
                        moved.token_number, b.estimated_start_time, moved.estimated_start_time
                    );
                    moved
                })
                .collect();

            return (estimated, shifted);
        }

        if last_emergency.is_none() && last_normal.is_none() {
            return (slot_start.max(now + allowance), Vec::new());
        }

        let mut estimated = slot_start;
        if let Some(prev) = last_emergency {
            estimated = estimated.max(prev.estimated_start_time + allowance);
        }
        if let Some(prev) = last_normal {
            estimated = estimated.max(prev.estimated_start_time + allowance);
        }
        (estimated, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_lock_registry_prunes_released_entries() {
        let locks = DayLocks::default();
        let doctor = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let held = locks.lock_for(doctor, day);
        // Dropped immediately, so the next call may reclaim it.
        locks.lock_for(doctor, day + ChronoDuration::days(1));
        locks.lock_for(doctor, day + ChronoDuration::days(2));

        let registry = locks.inner.lock().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains_key(&(doctor, day)));
        drop(registry);
        drop(held);
    }
}
