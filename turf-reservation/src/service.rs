use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, Utc};
use turf_core::notify::Notifier;
use turf_core::repository::{BookingLedger, Directory, HoldStore, SlotCatalog};
use turf_core::slot::{self, Slot};
use turf_core::{Booking, BookingStatus, CoreResult, Facility, Party, ReservationError, Role};
use uuid::Uuid;

/// Default payment window: how long a hold stays authoritative.
pub const DEFAULT_HOLD_TTL_SECONDS: i64 = 600;

#[derive(Debug, Clone)]
pub struct ReservationRules {
    pub hold_ttl: Duration,
    /// Offset of the facilities' wall clock from UTC; decides "today" and
    /// which slots have already started.
    pub utc_offset: FixedOffset,
}

impl ReservationRules {
    pub fn new(hold_ttl_seconds: u64, utc_offset_minutes: i32) -> Result<Self, ReservationError> {
        let utc_offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            ReservationError::Validation(format!("utc offset of {} minutes is out of range", utc_offset_minutes))
        })?;
        let hold_ttl = i64::try_from(hold_ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| ReservationError::Validation(format!("hold ttl of {}s is out of range", hold_ttl_seconds)))?;
        Ok(Self { hold_ttl, utc_offset })
    }
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::seconds(DEFAULT_HOLD_TTL_SECONDS),
            utc_offset: Utc.fix(),
        }
    }
}

/// The collaborators the service reads from and writes to.
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn SlotCatalog>,
    pub ledger: Arc<dyn BookingLedger>,
    pub holds: Arc<dyn HoldStore>,
    pub directory: Arc<dyn Directory>,
    pub notifier: Arc<dyn Notifier>,
}

/// Availability, holds and checkout for facility time slots.
///
/// Stateless between calls: every exclusion guarantee comes from the backends,
/// and every time-dependent decision takes `now` from the caller.
pub struct ReservationService {
    pub(crate) catalog: Arc<dyn SlotCatalog>,
    pub(crate) ledger: Arc<dyn BookingLedger>,
    pub(crate) holds: Arc<dyn HoldStore>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) rules: ReservationRules,
}

impl ReservationService {
    pub fn new(backends: Backends, rules: ReservationRules) -> Self {
        Self {
            catalog: backends.catalog,
            ledger: backends.ledger,
            holds: backends.holds,
            directory: backends.directory,
            notifier: backends.notifier,
            rules,
        }
    }

    /// "My bookings", newest first.
    pub async fn bookings_for(&self, customer_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(self.ledger.for_customer(customer_id).await?)
    }

    /// The owner's decision on a pending booking.
    pub async fn update_status(&self, booking_id: Uuid, owner_id: Uuid, status: BookingStatus) -> CoreResult<Booking> {
        let mut booking = self
            .ledger
            .get(booking_id)
            .await?
            .filter(|b| b.owner_id == owner_id)
            .ok_or_else(|| ReservationError::NotFound(format!("booking {}", booking_id)))?;

        if !booking.status.can_become(status) {
            return Err(ReservationError::Validation(format!(
                "booking {} cannot move from {} to {}",
                booking_id, booking.status, status
            )));
        }

        let moved = self.ledger.transition(booking_id, booking.status, status).await?;
        if !moved {
            return Err(ReservationError::Validation(format!(
                "booking {} changed while being updated",
                booking_id
            )));
        }

        tracing::info!(%booking_id, %owner_id, from = %booking.status, to = %status, "Booking status updated");
        booking.status = status;
        Ok(booking)
    }

    /// Deletes dead holds. Correctness never depends on this running.
    pub async fn purge_expired_holds(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        Ok(self.holds.purge_expired(now).await?)
    }

    pub(crate) async fn facility(&self, facility_id: Uuid) -> CoreResult<Facility> {
        self.catalog
            .facility(facility_id)
            .await?
            .ok_or_else(|| ReservationError::NotFound(format!("facility {}", facility_id)))
    }

    pub(crate) async fn party(&self, party_id: Uuid, role: Role) -> CoreResult<Party> {
        let party = self
            .directory
            .party(party_id)
            .await?
            .ok_or_else(|| ReservationError::NotFound(format!("{} {}", role.as_str(), party_id)))?;

        if party.role != role {
            return Err(ReservationError::Validation(format!(
                "{} is not a {}",
                party_id,
                role.as_str()
            )));
        }
        Ok(party)
    }

    /// Shape checks plus: every slot must be one the facility offers on its date.
    pub(crate) fn check_selection(facility: &Facility, slots: &[Slot]) -> CoreResult<()> {
        slot::validate_selection(slots)?;
        if let Some(missing) = slots.iter().find(|s| !facility.offers(s)) {
            return Err(ReservationError::Validation(format!(
                "slot {} is not offered by {}",
                missing, facility.name
            )));
        }
        Ok(())
    }

    /// Wall-clock time at the facilities.
    pub(crate) fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.rules.utc_offset).naive_local()
    }

    pub(crate) fn has_started(&self, slot: &Slot, now: DateTime<Utc>) -> bool {
        slot.date.and_time(slot.start_time) <= self.local_now(now)
    }
}
