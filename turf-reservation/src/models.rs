use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use turf_core::slot::{self, Slot};
use turf_core::{Booking, Hold};
use uuid::Uuid;

/// One row of the availability view for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    #[serde(with = "slot::weekday_name")]
    pub day_of_week: Weekday,
    #[serde(flatten)]
    pub slot: Slot,
    pub is_booked: bool,
    /// Another customer is mid-payment on this slot.
    pub is_held: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyOutcome {
    pub available: bool,
    pub conflicts: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    Booked,
    Held { expires_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRejection {
    pub slot: Slot,
    #[serde(flatten)]
    pub reason: RejectReason,
}

impl SlotRejection {
    pub fn booked(slot: Slot) -> Self {
        Self { slot, reason: RejectReason::Booked }
    }

    pub fn held(hold: &Hold) -> Self {
        Self { slot: hold.slot, reason: RejectReason::Held { expires_at: hold.expires_at } }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Held { slots: Vec<Slot>, expires_at: DateTime<Utc> },
    /// Some slots are already booked; pick others.
    SlotConflict(Vec<SlotRejection>),
    /// Some slots are held by another customer; they may free up after the TTL.
    HoldContention(Vec<SlotRejection>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Created(Vec<Booking>),
    SlotConflict(Vec<Slot>),
    HoldContention(Vec<SlotRejection>),
}

impl BookingOutcome {
    pub fn booking_ids(&self) -> Vec<Uuid> {
        match self {
            BookingOutcome::Created(bookings) => bookings.iter().map(|b| b.id).collect(),
            _ => Vec::new(),
        }
    }
}

/// Everything the checkout hands over once payment has gone through.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub facility_id: Uuid,
    pub customer_id: Uuid,
    pub owner_id: Uuid,
    pub slots: Vec<Slot>,
    pub total_amount: i64,
    pub payment_ref: String,
}
