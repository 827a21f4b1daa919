use std::sync::Arc;

use chrono::{DateTime, Utc};
use turf_core::repository::InsertOutcome;
use turf_core::{Booking, CoreResult, ReservationError, Role};
use turf_shared::models::events::{BookedSlotLine, BookingsCreatedEvent};

use crate::amount::split_amount;
use crate::models::{BookingOutcome, CheckoutRequest, SlotRejection};
use crate::service::ReservationService;

impl ReservationService {
    /// Commits a paid checkout: one pending booking per slot, all or none.
    ///
    /// The ledger is re-checked here because time has passed since the hold
    /// was taken; the ledger's own uniqueness enforcement is the final word
    /// for requests that race past this check.
    pub async fn create_booking(&self, req: CheckoutRequest, now: DateTime<Utc>) -> CoreResult<BookingOutcome> {
        if req.total_amount < 0 {
            return Err(ReservationError::Validation("total amount cannot be negative".to_string()));
        }
        if req.payment_ref.trim().is_empty() {
            return Err(ReservationError::Validation("payment reference is required".to_string()));
        }

        let facility = self.facility(req.facility_id).await?;
        Self::check_selection(&facility, &req.slots)?;
        if let Some(started) = req.slots.iter().find(|s| self.has_started(s, now)) {
            return Err(ReservationError::Validation(format!("slot {} has already started", started)));
        }
        self.party(req.customer_id, Role::Customer).await?;
        self.party(req.owner_id, Role::Owner).await?;
        if facility.owner_id != req.owner_id {
            return Err(ReservationError::Validation(format!(
                "{} does not manage {}",
                req.owner_id, facility.name
            )));
        }

        // Commit-time re-verify.
        let conflicts = self.ledger.active_among(req.facility_id, &req.slots).await?;
        if !conflicts.is_empty() {
            tracing::warn!(facility_id = %req.facility_id, customer_id = %req.customer_id, conflicts = conflicts.len(), "Checkout aborted, slots booked meanwhile");
            return Ok(BookingOutcome::SlotConflict(conflicts));
        }

        match self.holds.live_among(req.facility_id, &req.slots, now).await {
            Ok(holds) => {
                let foreign: Vec<SlotRejection> = holds
                    .iter()
                    .filter(|h| h.blocks(req.customer_id, now))
                    .map(SlotRejection::held)
                    .collect();
                if !foreign.is_empty() {
                    tracing::warn!(facility_id = %req.facility_id, customer_id = %req.customer_id, contended = foreign.len(), "Checkout aborted, slots held by another customer");
                    return Ok(BookingOutcome::HoldContention(foreign));
                }
            }
            Err(e) => {
                tracing::warn!(facility_id = %req.facility_id, "Hold store unreadable at checkout, relying on ledger: {}", e);
            }
        }

        let amounts = split_amount(req.total_amount, req.slots.len());
        let bookings: Vec<Booking> = req
            .slots
            .iter()
            .zip(amounts)
            .map(|(slot, amount)| {
                Booking::pending(req.facility_id, req.customer_id, req.owner_id, *slot, amount, &req.payment_ref, now)
            })
            .collect();

        match self.ledger.insert_batch(&bookings).await? {
            InsertOutcome::Inserted => {}
            InsertOutcome::Conflict(slots) => {
                tracing::warn!(facility_id = %req.facility_id, customer_id = %req.customer_id, conflicts = slots.len(), "Checkout lost the race at write time");
                return Ok(BookingOutcome::SlotConflict(slots));
            }
        }

        tracing::info!(
            facility_id = %req.facility_id,
            customer_id = %req.customer_id,
            bookings = bookings.len(),
            total_amount = req.total_amount,
            "Bookings created"
        );

        if let Err(e) = self.holds.release(req.facility_id, req.customer_id).await {
            tracing::warn!(facility_id = %req.facility_id, customer_id = %req.customer_id, "Could not clear holds after checkout, they will lapse: {}", e);
        }

        self.dispatch_owner_notice(&req, &bookings, now);

        Ok(BookingOutcome::Created(bookings))
    }

    /// Fire-and-forget: the customer's result never waits on or reflects this.
    fn dispatch_owner_notice(&self, req: &CheckoutRequest, bookings: &[Booking], now: DateTime<Utc>) {
        let event = BookingsCreatedEvent {
            facility_id: req.facility_id,
            owner_id: req.owner_id,
            customer_id: req.customer_id,
            total_amount: req.total_amount,
            lines: bookings
                .iter()
                .map(|b| BookedSlotLine { booking_id: b.id, slot: (&b.slot).into(), amount: b.amount })
                .collect(),
            timestamp: now.timestamp(),
        };

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.bookings_created(&event).await {
                tracing::error!(facility_id = %event.facility_id, owner_id = %event.owner_id, "Owner notification failed: {}", e);
            }
        });
    }
}
