pub mod clock;
pub mod notify;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notify::{Notifier, NotifyError, TracingNotifier};
pub use token::generate_token;
