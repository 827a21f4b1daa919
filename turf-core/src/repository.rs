use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};
use crate::catalog::Facility;
use crate::hold::Hold;
use crate::identity::Party;
use crate::slot::Slot;
use crate::StoreError;

/// Result of an atomic multi-row ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Nothing was written; these slots already carry an active booking.
    Conflict(Vec<Slot>),
}

/// Result of an all-or-nothing hold placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldAttempt {
    Placed(Vec<Hold>),
    /// Nothing was written; these live holds belong to other customers.
    Contended(Vec<Hold>),
}

/// Read access to the facility catalog owned by facility management.
#[async_trait]
pub trait SlotCatalog: Send + Sync {
    async fn facility(&self, facility_id: Uuid) -> Result<Option<Facility>, StoreError>;
}

/// The durable booking record.
///
/// Implementations must enforce, atomically, that at most one active
/// (`pending`/`confirmed`) booking exists per `(facility, date, start, end)`.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    /// The subset of `slots` that already carries an active booking.
    async fn active_among(&self, facility_id: Uuid, slots: &[Slot]) -> Result<Vec<Slot>, StoreError>;

    /// Every actively booked slot on `date`.
    async fn active_on(&self, facility_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, StoreError>;

    /// Writes all rows or none.
    async fn insert_batch(&self, bookings: &[Booking]) -> Result<InsertOutcome, StoreError>;

    /// Newest first.
    async fn for_customer(&self, customer_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Moves `booking_id` to `to` only if it is still in `from`. Returns whether it moved.
    async fn transition(&self, booking_id: Uuid, from: BookingStatus, to: BookingStatus) -> Result<bool, StoreError>;
}

/// Ephemeral per-customer slot holds. Every read filters on `expires_at`
/// against the caller's `now`.
#[async_trait]
pub trait HoldStore: Send + Sync {
    /// Upserts holds on every slot for `customer_id`, unless any slot carries a
    /// live hold by another customer, in which case nothing is written.
    async fn place(
        &self,
        facility_id: Uuid,
        customer_id: Uuid,
        slots: &[Slot],
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<HoldAttempt, StoreError>;

    async fn live_on(&self, facility_id: Uuid, date: NaiveDate, now: DateTime<Utc>) -> Result<Vec<Hold>, StoreError>;

    async fn live_among(&self, facility_id: Uuid, slots: &[Slot], now: DateTime<Utc>) -> Result<Vec<Hold>, StoreError>;

    /// Drops every hold `customer_id` has on `facility_id`. Returns how many went.
    async fn release(&self, facility_id: Uuid, customer_id: Uuid) -> Result<usize, StoreError>;

    /// Physically deletes dead holds. Housekeeping only.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Identity lookup for customers and owners.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn party(&self, party_id: Uuid) -> Result<Option<Party>, StoreError>;
}
