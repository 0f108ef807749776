mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use common::{at, env_with_doctor, make_booking, monday_doctor};
use queue_cell::{QueuePolicy, StatusLifecycleScheduler};
use shared_database::{BookingStore, MemoryStore, StoreError};
use shared_models::{Booking, BookingStatus};

async fn seed(env: &common::TestEnv, booking: &Booking) {
    env.store.create_booking(booking).await.expect("seed booking");
}

async fn status_of(env: &common::TestEnv, booking: &Booking) -> BookingStatus {
    env.store
        .booking(booking.id)
        .await
        .expect("store read")
        .expect("booking present")
        .status
}

#[tokio::test]
async fn overdue_booked_entries_become_pending() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let overdue = make_booking(
        &doctor,
        "aaaa1111",
        false,
        BookingStatus::Booked,
        at(9, 0),
        at(8, 0),
    );
    let fresh = make_booking(
        &doctor,
        "bbbb2222",
        false,
        BookingStatus::Booked,
        at(9, 20),
        at(8, 1),
    );
    seed(&env, &overdue).await;
    seed(&env, &fresh).await;

    env.scheduler.tick(at(9, 6)).await;

    assert_eq!(status_of(&env, &overdue).await, BookingStatus::Pending);
    assert_eq!(status_of(&env, &fresh).await, BookingStatus::Booked);
}

#[tokio::test]
async fn aging_jumps_straight_to_the_stage_the_delay_warrants() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let late = make_booking(
        &doctor,
        "cccc3333",
        false,
        BookingStatus::Booked,
        at(9, 0),
        at(8, 0),
    );
    let very_late = make_booking(
        &doctor,
        "dddd4444",
        false,
        BookingStatus::Booked,
        at(8, 50),
        at(8, 0),
    );
    seed(&env, &late).await;
    seed(&env, &very_late).await;

    // 11 minutes past one estimate, 21 past the other.
    env.scheduler.tick(at(9, 11)).await;

    assert_eq!(status_of(&env, &late).await, BookingStatus::Skipped);
    assert_eq!(status_of(&env, &very_late).await, BookingStatus::Cancelled);
}

#[tokio::test]
async fn aging_walks_the_chain_across_ticks() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let booking = make_booking(
        &doctor,
        "eeee5555",
        false,
        BookingStatus::Booked,
        at(9, 0),
        at(8, 0),
    );
    seed(&env, &booking).await;

    env.scheduler.tick(at(9, 6)).await;
    assert_eq!(status_of(&env, &booking).await, BookingStatus::Pending);

    env.scheduler.tick(at(9, 11)).await;
    assert_eq!(status_of(&env, &booking).await, BookingStatus::Skipped);

    env.scheduler.tick(at(9, 16)).await;
    assert_eq!(status_of(&env, &booking).await, BookingStatus::Cancelled);

    // Terminal: a later sweep changes nothing.
    env.scheduler.tick(at(9, 30)).await;
    assert_eq!(status_of(&env, &booking).await, BookingStatus::Cancelled);
}

#[tokio::test]
async fn repeating_a_tick_is_a_no_op() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let booking = make_booking(
        &doctor,
        "ffff6666",
        false,
        BookingStatus::Booked,
        at(9, 0),
        at(8, 0),
    );
    seed(&env, &booking).await;

    env.scheduler.tick(at(9, 6)).await;
    env.scheduler.tick(at(9, 6)).await;

    assert_eq!(status_of(&env, &booking).await, BookingStatus::Pending);
}

#[tokio::test]
async fn operator_owned_statuses_never_age() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let confirmed = make_booking(
        &doctor,
        "gggg7777",
        false,
        BookingStatus::Confirmed,
        at(8, 30),
        at(8, 0),
    );
    let ongoing = make_booking(
        &doctor,
        "hhhh8888",
        false,
        BookingStatus::Ongoing,
        at(8, 30),
        at(8, 1),
    );
    seed(&env, &confirmed).await;
    seed(&env, &ongoing).await;

    env.scheduler.tick(at(9, 0)).await;

    assert_eq!(status_of(&env, &confirmed).await, BookingStatus::Confirmed);
    assert_eq!(status_of(&env, &ongoing).await, BookingStatus::Ongoing);
}

#[tokio::test]
async fn reminder_fires_once_inside_the_window() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let upcoming = make_booking(
        &doctor,
        "iiii9999",
        false,
        BookingStatus::Booked,
        at(9, 12),
        at(8, 0),
    );
    seed(&env, &upcoming).await;

    env.scheduler.tick(at(9, 0)).await;
    assert_eq!(env.notifier.sent_count(), 1);

    let (contact, message) = env.notifier.sent.lock().expect("notifier lock")[0].clone();
    assert_eq!(contact, upcoming.contact);
    assert!(message.contains(&upcoming.token_number));

    // Still inside the window two minutes later, but already notified.
    env.scheduler.tick(at(9, 2)).await;
    assert_eq!(env.notifier.sent_count(), 1);
}

#[tokio::test]
async fn no_reminder_outside_the_window() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let too_soon = make_booking(
        &doctor,
        "jjjj0000",
        false,
        BookingStatus::Booked,
        at(9, 5),
        at(8, 0),
    );
    let too_far = make_booking(
        &doctor,
        "kkkk1212",
        false,
        BookingStatus::Booked,
        at(9, 30),
        at(8, 1),
    );
    seed(&env, &too_soon).await;
    seed(&env, &too_far).await;

    env.scheduler.tick(at(9, 0)).await;
    assert_eq!(env.notifier.sent_count(), 0);
}

#[tokio::test]
async fn undelivered_reminder_is_retried_next_tick() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let upcoming = make_booking(
        &doctor,
        "llll3434",
        false,
        BookingStatus::Booked,
        at(9, 13),
        at(8, 0),
    );
    seed(&env, &upcoming).await;

    env.notifier
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);
    env.scheduler.tick(at(9, 0)).await;
    assert_eq!(env.notifier.sent_count(), 0);
    let stored = env
        .store
        .booking(upcoming.id)
        .await
        .expect("store read")
        .expect("booking present");
    assert!(!stored.reminder_sent);

    env.notifier
        .fail
        .store(false, std::sync::atomic::Ordering::SeqCst);
    env.scheduler.tick(at(9, 1)).await;
    assert_eq!(env.notifier.sent_count(), 1);
}

#[tokio::test]
async fn reminded_booking_still_ages_when_missed() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    let booking = make_booking(
        &doctor,
        "mmmm5656",
        false,
        BookingStatus::Booked,
        at(9, 10),
        at(8, 0),
    );
    seed(&env, &booking).await;

    env.scheduler.tick(at(9, 0)).await;
    assert_eq!(env.notifier.sent_count(), 1);

    // Patient never showed. Sixteen minutes past the estimate the
    // booking falls straight through to cancelled.
    env.scheduler.tick(at(9, 26)).await;
    assert_eq!(status_of(&env, &booking).await, BookingStatus::Cancelled);
}

/// Delegates to the in-memory store but reports the reminder window as
/// it looked before a 20 minute cascade shift landed, so the scan
/// always races a concurrent writer.
struct LaggedScanStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl BookingStore for LaggedScanStore {
    async fn create_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        self.inner.create_booking(booking).await
    }

    async fn booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.inner.booking(id).await
    }

    async fn booking_by_token(&self, token: &str) -> Result<Option<Booking>, StoreError> {
        self.inner.booking_by_token(token).await
    }

    async fn bookings_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        self.inner.bookings_for_day(doctor_id, date).await
    }

    async fn bookings_with_status(
        &self,
        doctor_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        self.inner.bookings_with_status(doctor_id, statuses).await
    }

    async fn recent_completed(
        &self,
        doctor_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Booking>, StoreError> {
        self.inner.recent_completed(doctor_id, limit).await
    }

    async fn due_before(
        &self,
        statuses: &[BookingStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        self.inner.due_before(statuses, cutoff).await
    }

    async fn booked_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let shift = Duration::minutes(20);
        let rows = self.inner.booked_in_window(from + shift, to + shift).await?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                row.estimated_start_time -= shift;
                row
            })
            .collect())
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        self.inner.update_booking(booking).await
    }

    async fn mark_reminder_sent(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.mark_reminder_sent(id).await
    }

    async fn update_bookings(&self, bookings: &[Booking]) -> Result<(), StoreError> {
        self.inner.update_bookings(bookings).await
    }

    async fn update_status_if(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<bool, StoreError> {
        self.inner.update_status_if(id, expected, next).await
    }
}

#[tokio::test]
async fn reminder_flag_write_preserves_a_concurrent_cascade_shift() {
    let doctor = monday_doctor(10);
    let env = env_with_doctor(doctor.clone(), at(9, 0)).await;

    // Stored row already carries the +20 min shift; the scan below
    // hands the scheduler the pre-shift snapshot.
    let booking = make_booking(
        &doctor,
        "nnnn7878",
        false,
        BookingStatus::Booked,
        at(9, 32),
        at(8, 0),
    );
    env.store.create_booking(&booking).await.expect("seed booking");

    let lagged = Arc::new(LaggedScanStore {
        inner: env.store.clone(),
    });
    let scheduler = StatusLifecycleScheduler::new(
        lagged,
        env.notifier.clone(),
        env.clock.clone(),
        QueuePolicy::default(),
    );

    scheduler.tick(at(9, 0)).await;
    assert_eq!(env.notifier.sent_count(), 1);

    let stored = env
        .store
        .booking(booking.id)
        .await
        .expect("store read")
        .expect("booking present");
    assert_eq!(stored.estimated_start_time, at(9, 32));
    assert!(stored.reminder_sent);

    // The next tick still sees the window but the flag holds.
    scheduler.tick(at(9, 1)).await;
    assert_eq!(env.notifier.sent_count(), 1);
}
