use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::BookingStatus;

// ==============================================================================
// TIMING POLICY
// ==============================================================================

/// Timing rules for the queue engine. The 20-minute service allowance
/// is the one constant behind estimated-start spacing, emergency
/// cascade shifts and the walk-in buffer; it must never be duplicated
/// at call sites.
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    pub service_allowance_minutes: i64,
    /// Fallback average service time when no completed-visit history
    /// exists for the doctor.
    pub default_service_minutes: i64,
    /// How many recent completed visits feed the average.
    pub completed_history_limit: usize,
    pub pending_after_minutes: i64,
    pub skip_after_minutes: i64,
    pub cancel_after_minutes: i64,
    /// Reminder window: bookings starting this many minutes from now...
    pub remind_from_minutes: i64,
    /// ...up to this many minutes from now.
    pub remind_until_minutes: i64,
    /// Bounded retries for transient store failures while reading
    /// booking state.
    pub max_store_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            service_allowance_minutes: 20,
            default_service_minutes: 15,
            completed_history_limit: 10,
            pending_after_minutes: 5,
            skip_after_minutes: 10,
            cancel_after_minutes: 15,
            remind_from_minutes: 10,
            remind_until_minutes: 15,
            max_store_attempts: 3,
            retry_backoff_ms: 50,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub patient_name: String,
    /// Email or phone number the notifier can reach.
    pub contact: String,
    pub doctor_id: Uuid,
    pub hospital_id: Uuid,
    /// Defaults to today when omitted.
    #[serde(default)]
    pub booking_date: Option<NaiveDate>,
    #[serde(default)]
    pub emergency: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResult {
    pub booking_id: Uuid,
    pub token_number: String,
    pub estimated_start_time: DateTime<Utc>,
    pub doctor_name: String,
    pub hospital_name: String,
    pub emergency: bool,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionInfo {
    pub token_number: String,
    pub status: BookingStatus,
    /// 1-indexed rank among the doctor's active bookings; 0 when the
    /// booking is no longer active.
    pub position: usize,
    pub people_ahead: usize,
    pub visit_time: DateTime<Utc>,
    /// Token of the patient currently with the doctor, if any.
    pub currently_serving: Option<String>,
    pub estimated_wait_minutes: i64,
    /// Patient-facing rendering, e.g. "1 hour 5 minutes".
    pub estimated_wait: String,
    pub doctor_name: String,
    pub specialization: String,
}
