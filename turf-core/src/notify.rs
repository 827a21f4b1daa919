use async_trait::async_trait;
use turf_shared::models::events::BookingsCreatedEvent;

use crate::NotifyError;

/// Best-effort delivery of booking summaries to facility owners.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn bookings_created(&self, event: &BookingsCreatedEvent) -> Result<(), NotifyError>;
}

/// Writes the summary to the log. Used when no message broker is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn bookings_created(&self, event: &BookingsCreatedEvent) -> Result<(), NotifyError> {
        tracing::info!(
            facility_id = %event.facility_id,
            owner_id = %event.owner_id,
            slots = event.lines.len(),
            total_amount = event.total_amount,
            "New bookings awaiting owner review"
        );
        Ok(())
    }
}
