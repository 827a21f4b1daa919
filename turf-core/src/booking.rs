use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use turf_shared::pii::Masked;
use uuid::Uuid;

use crate::slot::{self, Slot};
use crate::ReservationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl BookingStatus {
    /// Active bookings occupy their slot; a rejected one frees it.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
        }
    }

    /// Only the owner's decision on a pending booking moves it.
    pub fn can_become(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed) | (BookingStatus::Pending, BookingStatus::Rejected)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "rejected" => Ok(BookingStatus::Rejected),
            other => Err(ReservationError::Validation(format!("unknown booking status '{}'", other))),
        }
    }
}

/// One ledger row: exactly one slot on one date, never an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub customer_id: Uuid,
    pub owner_id: Uuid,
    #[serde(with = "slot::weekday_name")]
    pub day_of_week: Weekday,
    pub slot: Slot,
    pub amount: i64,
    pub status: BookingStatus,
    pub payment_ref: Masked<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn pending(
        facility_id: Uuid,
        customer_id: Uuid,
        owner_id: Uuid,
        slot: Slot,
        amount: i64,
        payment_ref: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            facility_id,
            customer_id,
            owner_id,
            day_of_week: slot.weekday(),
            slot,
            amount,
            status: BookingStatus::Pending,
            payment_ref: Masked(payment_ref.to_string()),
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
