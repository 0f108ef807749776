use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A patient's entry in a doctor's daily queue.
///
/// Created once at booking time; afterwards only `status`,
/// `estimated_start_time` (emergency cascades), the actual visit
/// timestamps and `reminder_sent` are mutated. Never deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    /// Patient-facing identifier, opaque and non-sequential.
    pub token_number: String,
    pub patient_name: String,
    /// Where the notifier reaches the patient (email or phone).
    pub contact: String,
    pub doctor_id: Uuid,
    pub hospital_id: Uuid,
    /// Calendar day the visit occurs on.
    pub booking_date: NaiveDate,
    pub emergency: bool,
    pub status: BookingStatus,
    pub estimated_start_time: DateTime<Utc>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    /// Set once the upcoming-visit reminder has fired for this booking.
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Active bookings count toward queue position.
    pub fn is_active(&self) -> bool {
        matches!(self.status, BookingStatus::Booked | BookingStatus::Confirmed)
    }

    /// Queue ordering: estimated start, then creation order for
    /// deterministic tie-breaking under concurrent inserts.
    pub fn queue_key(&self) -> (DateTime<Utc>, DateTime<Utc>, Uuid) {
        (self.estimated_start_time, self.created_at, self.id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Booked,
    Confirmed,
    Ongoing,
    Pending,
    Skipped,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Statuses set by the operator workflow. The scheduler never
    /// overwrites these.
    pub fn is_operator_owned(&self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed | BookingStatus::Ongoing | BookingStatus::Completed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Central transition table. Scheduler aging moves through
    /// Booked -> Pending -> Skipped -> Cancelled; the operator can pick
    /// a waiting patient back up until the booking is terminal.
    pub fn allowed_next(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Booked => &[Confirmed, Pending, Skipped, Cancelled],
            Pending => &[Confirmed, Skipped, Cancelled],
            Skipped => &[Confirmed, Cancelled],
            Confirmed => &[Ongoing, Cancelled],
            Ongoing => &[Completed, Cancelled],
            // Terminal states
            Cancelled => &[],
            Completed => &[],
        }
    }

    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        self.allowed_next().contains(&target)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Booked => write!(f, "booked"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Ongoing => write!(f, "ongoing"),
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Skipped => write!(f, "skipped"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Completed => write!(f, "completed"),
        }
    }
}
