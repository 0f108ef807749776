use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::{Booking, BookingStatus, Doctor};

use crate::error::StoreError;
use crate::store::{BookingStore, DoctorStore};

/// In-memory store adapter. Backs the test suites and local runs;
/// a production deployment plugs a durable implementation into the
/// same traits.
#[derive(Default)]
pub struct MemoryStore {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a doctor record (test/local setup path).
    pub async fn insert_doctor(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }

    fn sorted(mut rows: Vec<Booking>) -> Vec<Booking> {
        rows.sort_by_key(|b| b.queue_key());
        rows
    }
}

#[async_trait]
impl DoctorStore for MemoryStore {
    async fn doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        Ok(self.doctors.read().await.get(&id).cloned())
    }

    async fn update_doctor(&self, doctor: &Doctor) -> Result<(), StoreError> {
        self.doctors.write().await.insert(doctor.id, doctor.clone());
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(StoreError::Conflict(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn booking_by_token(&self, token: &str) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .find(|b| b.token_number == token)
            .cloned())
    }

    async fn bookings_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.doctor_id == doctor_id && b.booking_date == date)
            .cloned()
            .collect();
        Ok(Self::sorted(rows))
    }

    async fn bookings_with_status(
        &self,
        doctor_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.doctor_id == doctor_id && statuses.contains(&b.status))
            .cloned()
            .collect();
        Ok(Self::sorted(rows))
    }

    async fn recent_completed(
        &self,
        doctor_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut rows: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| {
                b.doctor_id == doctor_id
                    && b.status == BookingStatus::Completed
                    && b.actual_start_time.is_some()
                    && b.actual_end_time.is_some()
            })
            .cloned()
            .collect();
        rows.sort_by_key(|b| std::cmp::Reverse(b.actual_end_time));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn due_before(
        &self,
        statuses: &[BookingStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| statuses.contains(&b.status) && b.estimated_start_time <= cutoff)
            .cloned()
            .collect();
        Ok(Self::sorted(rows))
    }

    async fn booked_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| {
                b.status == BookingStatus::Booked
                    && b.estimated_start_time >= from
                    && b.estimated_start_time <= to
            })
            .cloned()
            .collect();
        Ok(Self::sorted(rows))
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        if !bookings.contains_key(&booking.id) {
            return Err(StoreError::Conflict(format!(
                "booking {} does not exist",
                booking.id
            )));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn mark_reminder_sent(&self, id: Uuid) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(booking) => {
                booking.reminder_sent = true;
                Ok(())
            }
            None => Err(StoreError::Conflict(format!("booking {} does not exist", id))),
        }
    }

    async fn update_bookings(&self, updated: &[Booking]) -> Result<(), StoreError> {
        // Single write-lock hold makes the batch atomic with respect
        // to every other store operation.
        let mut bookings = self.bookings.write().await;
        for booking in updated {
            if !bookings.contains_key(&booking.id) {
                return Err(StoreError::Conflict(format!(
                    "booking {} does not exist",
                    booking.id
                )));
            }
        }
        for booking in updated {
            bookings.insert(booking.id, booking.clone());
        }
        Ok(())
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<bool, StoreError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(booking) if booking.status == expected => {
                booking.status = next;
                Ok(true)
            }
            Some(booking) => {
                debug!(
                    "status guard failed for booking {}: expected {}, found {}",
                    id, expected, booking.status
                );
                Ok(false)
            }
            None => Err(StoreError::Conflict(format!("booking {} does not exist", id))),
        }
    }
}
