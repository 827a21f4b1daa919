pub mod amount;
pub mod availability;
pub mod creator;
pub mod guard;
pub mod models;
pub mod service;

pub use models::{
    BookingOutcome, CheckoutRequest, RejectReason, ReserveOutcome, SlotAvailability, SlotRejection, VerifyOutcome,
};
pub use service::{Backends, ReservationRules, ReservationService};
