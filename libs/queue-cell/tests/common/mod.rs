#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use uuid::Uuid;

use queue_cell::{
    BookingTimeEstimator, CreateBookingRequest, QueuePolicy, QueuePositionCalculator,
    StatusLifecycleScheduler,
};
use shared_database::MemoryStore;
use shared_models::{Booking, BookingStatus, Doctor, WeeklySlot};
use shared_utils::{ManualClock, Notifier, NotifyError};

/// Monday, 2 June 2025 — every fixture books against this day.
pub fn test_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date")
}

/// Timestamp on the test day.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    test_day()
        .and_time(NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time"))
        .and_utc()
}

/// Doctor practicing Mondays 09:00-12:00 with the given slot capacity
/// and three emergency slots per day.
pub fn monday_doctor(max_bookings: u32) -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        name: "Asha Verma".to_string(),
        specialization: "Cardiology".to_string(),
        hospital_id: Uuid::new_v4(),
        hospital_name: "City Care".to_string(),
        weekly_slots: vec![WeeklySlot {
            weekday: Weekday::Mon,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).expect("valid time"),
            max_bookings,
            bookings_made: 0,
        }],
        emergency_slots_per_day: 3,
        emergency_bookings_today: 0,
        last_reset_date: test_day(),
    }
}

pub fn booking_request(doctor: &Doctor, emergency: bool) -> CreateBookingRequest {
    CreateBookingRequest {
        patient_name: "Ravi Kumar".to_string(),
        contact: "ravi@example.com".to_string(),
        doctor_id: doctor.id,
        hospital_id: doctor.hospital_id,
        booking_date: Some(test_day()),
        emergency,
    }
}

/// Hand-rolled booking row for seeding the store directly.
pub fn make_booking(
    doctor: &Doctor,
    token: &str,
    emergency: bool,
    status: BookingStatus,
    estimated_start_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        token_number: token.to_string(),
        patient_name: format!("patient-{}", token),
        contact: format!("{}@example.com", token),
        doctor_id: doctor.id,
        hospital_id: doctor.hospital_id,
        booking_date: estimated_start_time.date_naive(),
        emergency,
        status,
        estimated_start_time,
        actual_start_time: None,
        actual_end_time: None,
        reminder_sent: false,
        created_at,
    }
}

/// Notifier that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("notifier lock").len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError("gateway down".to_string()));
        }
        self.sent
            .lock()
            .expect("notifier lock")
            .push((contact.to_string(), message.to_string()));
        Ok(())
    }
}

/// Fully wired services over one in-memory store and a manual clock.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub estimator: BookingTimeEstimator,
    pub position: QueuePositionCalculator,
    pub scheduler: StatusLifecycleScheduler,
}

pub async fn env_with_doctor(doctor: Doctor, start: DateTime<Utc>) -> TestEnv {
    let store = Arc::new(MemoryStore::new());
    store.insert_doctor(doctor).await;

    let clock = Arc::new(ManualClock::new(start));
    let notifier = Arc::new(RecordingNotifier::default());
    let policy = QueuePolicy::default();

    let estimator = BookingTimeEstimator::new(
        store.clone(),
        store.clone(),
        clock.clone(),
        policy.clone(),
    );
    let position = QueuePositionCalculator::new(
        store.clone(),
        store.clone(),
        clock.clone(),
        policy.clone(),
    );
    let scheduler = StatusLifecycleScheduler::new(
        store.clone(),
        notifier.clone(),
        clock.clone(),
        policy,
    );

    TestEnv {
        store,
        clock,
        notifier,
        estimator,
        position,
        scheduler,
    }
}
