use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use turf_core::slot::Slot;
use turf_core::CoreResult;
use uuid::Uuid;

use crate::models::SlotAvailability;
use crate::service::ReservationService;

impl ReservationService {
    /// The facility's slots for `date`, each flagged against the ledger for
    /// that exact date.
    ///
    /// `is_held` marks slots another customer is paying for. It is advisory:
    /// if the hold store cannot be read the view is still served, without it.
    pub async fn availability(
        &self,
        facility_id: Uuid,
        date: NaiveDate,
        viewer: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<SlotAvailability>> {
        let facility = self.facility(facility_id).await?;

        let local_now = self.local_now(now);
        let today = local_now.date();
        if date < today {
            return Ok(Vec::new());
        }

        let mut slots = facility.slots_on(date);
        if date == today {
            slots.retain(|s| s.start_time > local_now.time());
        }
        if slots.is_empty() {
            return Ok(Vec::new());
        }

        let booked: HashSet<Slot> = self.ledger.active_on(facility_id, date).await?.into_iter().collect();

        let held: HashSet<Slot> = match self.holds.live_on(facility_id, date, now).await {
            Ok(holds) => holds
                .into_iter()
                .filter(|h| Some(h.customer_id) != viewer)
                .map(|h| h.slot)
                .collect(),
            Err(e) => {
                tracing::warn!(%facility_id, %date, "Hold store unreadable, serving availability without holds: {}", e);
                HashSet::new()
            }
        };

        Ok(slots
            .into_iter()
            .map(|slot| SlotAvailability {
                day_of_week: slot.weekday(),
                is_booked: booked.contains(&slot),
                is_held: held.contains(&slot),
                slot,
            })
            .collect())
    }
}
