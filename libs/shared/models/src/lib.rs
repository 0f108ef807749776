pub mod booking;
pub mod doctor;

pub use booking::{Booking, BookingStatus};
pub use doctor::{Doctor, WeeklySlot};
