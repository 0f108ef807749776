use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use shared_models::{Booking, BookingStatus, Doctor};

use crate::error::StoreError;

/// Read/write access to doctor records. The doctor CRUD surface lives
/// elsewhere; this core only reads slot definitions and writes the
/// capacity counters.
#[async_trait]
pub trait DoctorStore: Send + Sync {
    async fn doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError>;

    async fn update_doctor(&self, doctor: &Doctor) -> Result<(), StoreError>;
}

/// Query and mutation surface for bookings. All multi-row queries
/// return rows sorted ascending by (estimated start, created_at, id)
/// unless noted otherwise.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn booking_by_token(&self, token: &str) -> Result<Option<Booking>, StoreError>;

    /// Every booking for the doctor on the given calendar day,
    /// regardless of status.
    async fn bookings_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Bookings for the doctor whose status is one of `statuses`.
    async fn bookings_with_status(
        &self,
        doctor_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError>;

    /// Most recent completed visits with both actual timestamps set,
    /// newest first, at most `limit` rows. Feeds wait-time averaging.
    async fn recent_completed(
        &self,
        doctor_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Bookings in any of `statuses` (across all doctors) whose
    /// estimated start is at or before `cutoff`. Scheduler aging scan.
    async fn due_before(
        &self,
        statuses: &[BookingStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    /// `Booked` bookings (across all doctors) whose estimated start
    /// falls inside `[from, to]`. Scheduler reminder scan.
    async fn booked_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    /// Flip `reminder_sent` on, touching no other column. A full-row
    /// write here could revert a cascade shift or status change that
    /// landed after the caller's read.
    async fn mark_reminder_sent(&self, id: Uuid) -> Result<(), StoreError>;

    /// Apply a batch of updated bookings as one atomic write. Used for
    /// emergency cascades so shifts never interleave with other
    /// writers.
    async fn update_bookings(&self, bookings: &[Booking]) -> Result<(), StoreError>;

    /// Set `status = next` only if the stored status is still
    /// `expected`. Returns false when the optimistic check fails.
    async fn update_status_if(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<bool, StoreError>;
}
