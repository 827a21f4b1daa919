use chrono::{DateTime, Utc};
use turf_core::repository::HoldAttempt;
use turf_core::slot::Slot;
use turf_core::{CoreResult, ReservationError, Role};
use uuid::Uuid;

use crate::models::{ReserveOutcome, SlotRejection, VerifyOutcome};
use crate::service::ReservationService;

impl ReservationService {
    /// Read-only check of a selection against the ledger.
    pub async fn verify(&self, facility_id: Uuid, slots: &[Slot]) -> CoreResult<VerifyOutcome> {
        let facility = self.facility(facility_id).await?;
        Self::check_selection(&facility, slots)?;

        let conflicts = self.ledger.active_among(facility_id, slots).await?;
        if !conflicts.is_empty() {
            tracing::warn!(%facility_id, conflicts = conflicts.len(), "Selection overlaps booked slots");
        }

        Ok(VerifyOutcome { available: conflicts.is_empty(), conflicts })
    }

    /// Holds every slot in the selection for `customer_id`, or none of them.
    pub async fn reserve(
        &self,
        facility_id: Uuid,
        customer_id: Uuid,
        slots: &[Slot],
        now: DateTime<Utc>,
    ) -> CoreResult<ReserveOutcome> {
        let facility = self.facility(facility_id).await?;
        Self::check_selection(&facility, slots)?;
        self.party(customer_id, Role::Customer).await?;

        if let Some(started) = slots.iter().find(|s| self.has_started(s, now)) {
            return Err(ReservationError::Validation(format!("slot {} has already started", started)));
        }

        let booked = self.ledger.active_among(facility_id, slots).await?;
        if !booked.is_empty() {
            tracing::warn!(%facility_id, %customer_id, conflicts = booked.len(), "Hold refused, slots already booked");
            return Ok(ReserveOutcome::SlotConflict(
                booked.into_iter().map(SlotRejection::booked).collect(),
            ));
        }

        let expires_at = now + self.rules.hold_ttl;
        match self.holds.place(facility_id, customer_id, slots, now, expires_at).await? {
            HoldAttempt::Placed(holds) => {
                tracing::info!(%facility_id, %customer_id, slots = holds.len(), %expires_at, "Slots held");
                Ok(ReserveOutcome::Held { slots: holds.into_iter().map(|h| h.slot).collect(), expires_at })
            }
            HoldAttempt::Contended(others) => {
                tracing::warn!(%facility_id, %customer_id, contended = others.len(), "Hold refused, slots held by another customer");
                Ok(ReserveOutcome::HoldContention(others.iter().map(SlotRejection::held).collect()))
            }
        }
    }

    /// Drops the customer's holds on the facility. Releasing nothing is fine.
    pub async fn release(&self, facility_id: Uuid, customer_id: Uuid) -> CoreResult<usize> {
        let released = self.holds.release(facility_id, customer_id).await?;
        if released > 0 {
            tracing::info!(%facility_id, %customer_id, released, "Holds released");
        }
        Ok(released)
    }
}
