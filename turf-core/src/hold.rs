use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::slot::Slot;

/// A short-lived claim by one customer on one slot.
///
/// A hold is authoritative only while `now <= expires_at`. Past that instant it
/// is dead whether or not a sweep has physically removed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub facility_id: Uuid,
    pub customer_id: Uuid,
    pub slot: Slot,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }

    pub fn blocks(&self, customer_id: Uuid, now: DateTime<Utc>) -> bool {
        self.customer_id != customer_id && self.is_live(now)
    }
}
