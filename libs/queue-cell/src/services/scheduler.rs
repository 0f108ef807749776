use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use shared_database::BookingStore;
use shared_models::BookingStatus;
use shared_utils::{Clock, Notifier};

use crate::error::QueueError;
use crate::models::QueuePolicy;

/// Statuses the scheduler owns. A booking in any other status was
/// touched by an operator and is left alone.
const AGEABLE: [BookingStatus; 3] = [
    BookingStatus::Booked,
    BookingStatus::Pending,
    BookingStatus::Skipped,
];

/// Periodic sweep that ages overdue bookings through
/// Pending -> Skipped -> Cancelled and fires upcoming-visit reminders.
pub struct StatusLifecycleScheduler {
    bookings: Arc<dyn BookingStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    policy: QueuePolicy,
    tick_guard: Mutex<()>,
}

impl StatusLifecycleScheduler {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: QueuePolicy,
    ) -> Self {
        Self {
            bookings,
            notifier,
            clock,
            policy,
            tick_guard: Mutex::new(()),
        }
    }

    /// Drive `tick` on a fixed cadence. Ticks that would overlap a
    /// still-running one are skipped, never run concurrently.
    pub async fn run(self: Arc<Self>, every: Duration) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("status lifecycle scheduler running every {:?}", every);

        loop {
            ticker.tick().await;
            let now = self.clock.now();
            self.tick(now).await;
        }
    }

    /// One sweep. Produces only side effects and logs; every failure
    /// is contained to the booking (or pass) it occurred in.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            warn!("previous tick still running, skipping this one");
            return;
        };

        if let Err(err) = self.age_overdue(now).await {
            error!("aging pass failed: {}", err);
        }
        if let Err(err) = self.send_reminders(now).await {
            error!("reminder pass failed: {}", err);
        }
    }

    /// Move overdue bookings down the aging chain based on how long
    /// past their estimated start they are. Only scheduler-owned
    /// statuses age; the conditional write ensures an operator action
    /// landing between read and write wins.
    async fn age_overdue(&self, now: DateTime<Utc>) -> Result<(), QueueError> {
        let cutoff = now - ChronoDuration::minutes(self.policy.pending_after_minutes);
        let overdue = self.bookings.due_before(&AGEABLE, cutoff).await?;

        for booking in overdue {
            let age = (now - booking.estimated_start_time).num_minutes();
            let target = if age >= self.policy.cancel_after_minutes {
                BookingStatus::Cancelled
            } else if age >= self.policy.skip_after_minutes {
                BookingStatus::Skipped
            } else {
                BookingStatus::Pending
            };

            if target == booking.status || !booking.status.can_transition_to(target) {
                continue;
            }

            match self
                .bookings
                .update_status_if(booking.id, booking.status, target)
                .await
            {
                Ok(true) => {
                    info!(
                        "queue {} aged from {} to {} ({}min overdue)",
                        booking.token_number, booking.status, target, age
                    );
                }
                Ok(false) => {
                    debug!(
                        "booking {} changed underneath the tick, leaving it alone",
                        booking.id
                    );
                }
                Err(err) => {
                    // Isolated: one bad row never aborts the sweep.
                    error!("failed to age booking {}: {}", booking.id, err);
                }
            }
        }

        Ok(())
    }

    /// Notify patients whose visit starts 10-15 minutes from now,
    /// once per booking. Delivery is best-effort; an undelivered
    /// reminder stays unsent and is retried on the next tick.
    async fn send_reminders(&self, now: DateTime<Utc>) -> Result<(), QueueError> {
        let from = now + ChronoDuration::minutes(self.policy.remind_from_minutes);
        let to = now + ChronoDuration::minutes(self.policy.remind_until_minutes);
        let upcoming = self.bookings.booked_in_window(from, to).await?;

        for booking in upcoming {
            if booking.reminder_sent {
                continue;
            }

            let message = format!(
                "Your turn is coming up. Token {}, estimated visit time {}.",
                booking.token_number,
                booking.estimated_start_time.format("%H:%M")
            );
            if let Err(err) = self.notifier.notify(&booking.contact, &message).await {
                warn!("reminder for booking {} failed: {}", booking.id, err);
                continue;
            }

            // Narrow flag write; the scanned row may be stale by now
            // and must not be written back whole.
            if let Err(err) = self.bookings.mark_reminder_sent(booking.id).await {
                error!(
                    "failed to record reminder for booking {}: {}",
                    booking.id, err
                );
            }
        }

        Ok(())
    }
}
