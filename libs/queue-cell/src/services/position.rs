use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_database::{BookingStore, DoctorStore};
use shared_models::{Booking, BookingStatus};
use shared_utils::Clock;

use crate::error::QueueError;
use crate::models::{PositionInfo, QueuePolicy};

const ACTIVE: [BookingStatus; 2] = [BookingStatus::Booked, BookingStatus::Confirmed];
const SERVING: [BookingStatus; 2] = [BookingStatus::Confirmed, BookingStatus::Ongoing];

/// Read-only live position and wait estimate for a booking.
pub struct QueuePositionCalculator {
    doctors: Arc<dyn DoctorStore>,
    bookings: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    policy: QueuePolicy,
}

impl QueuePositionCalculator {
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
            policy,
        }
    }

    pub async fn position_of(&self, booking_id: Uuid) -> Result<PositionInfo, QueueError> {
        let booking = self
            .bookings
            .booking(booking_id)
            .await?
            .ok_or(QueueError::BookingNotFound)?;
        self.info_for(booking).await
    }

    /// Same lookup, keyed by the patient-facing token.
    pub async fn position_by_token(&self, token: &str) -> Result<PositionInfo, QueueError> {
        let booking = self
            .bookings
            .booking_by_token(token)
            .await?
            .ok_or(QueueError::BookingNotFound)?;
        self.info_for(booking).await
    }

    async fn info_for(&self, booking: Booking) -> Result<PositionInfo, QueueError> {
        let doctor = self
            .doctors
            .doctor(booking.doctor_id)
            .await?
            .ok_or(QueueError::DoctorNotFound)?;

        // Active set, already sorted by (estimated start, creation).
        let active = self
            .bookings
            .bookings_with_status(booking.doctor_id, &ACTIVE)
            .await?;
        let position = if booking.is_active() {
            active
                .iter()
                .position(|b| b.id == booking.id)
                .map(|idx| idx + 1)
                .unwrap_or(0)
        } else {
            0
        };
        let people_ahead = position.saturating_sub(1);

        let currently_serving = self
            .bookings
            .bookings_with_status(booking.doctor_id, &SERVING)
            .await?
            .into_iter()
            .next()
            .map(|b| b.token_number);

        let average_minutes = self.average_service_minutes(booking.doctor_id).await?;

        // The larger of a naive countdown to the estimated start and a
        // throughput-based estimate.
        let now = self.clock.now();
        let real_gap = minutes_until(booking.estimated_start_time, now);
        let position_based = people_ahead as i64 * average_minutes;
        let estimated_wait_minutes = real_gap.max(position_based);

        debug!(
            "position for token {}: rank {}, gap {}min, throughput {}min",
            booking.token_number, position, real_gap, position_based
        );

        Ok(PositionInfo {
            token_number: booking.token_number,
            status: booking.status,
            position,
            people_ahead,
            visit_time: booking.estimated_start_time,
            currently_serving,
            estimated_wait_minutes,
            estimated_wait: format_wait(estimated_wait_minutes),
            doctor_name: doctor.name,
            specialization: doctor.specialization,
        })
    }

    /// Mean visit length over the doctor's recent completed bookings,
    /// falling back to the policy default with no history.
    async fn average_service_minutes(&self, doctor_id: Uuid) -> Result<i64, QueueError> {
        let completed = self
            .bookings
            .recent_completed(doctor_id, self.policy.completed_history_limit)
            .await?;
        if completed.is_empty() {
            return Ok(self.policy.default_service_minutes);
        }

        let total: i64 = completed
            .iter()
            .filter_map(|b| match (b.actual_start_time, b.actual_end_time) {
                (Some(start), Some(end)) => Some((end - start).num_minutes()),
                _ => None,
            })
            .sum();
        Ok((total as f64 / completed.len() as f64).round() as i64)
    }
}

/// Whole minutes from `now` to `visit`, rounded up, never negative.
fn minutes_until(visit: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (visit - now).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + 59) / 60
    }
}

/// "2 hours 5 minutes" / "1 minute" style rendering.
fn format_wait(total_minutes: i64) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let minute_word = if minutes == 1 { "minute" } else { "minutes" };
    if hours > 0 {
        let hour_word = if hours == 1 { "hour" } else { "hours" };
        format!("{} {} {} {}", hours, hour_word, minutes, minute_word)
    } else {
        format!("{} {}", minutes, minute_word)
    }
}
