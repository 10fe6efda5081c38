pub mod payment;
pub mod attendee;
pub mod seat_lookup;

pub use payment::{Payment, PaymentWithEvent};
pub use attendee::{Attendee, SeatAssignment};
pub use seat_lookup::SeatLookupResult;
