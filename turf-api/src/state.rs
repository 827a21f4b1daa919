use std::sync::Arc;
use tokio::sync::broadcast;
use turf_reservation::ReservationService;
use turf_shared::models::events::SlotEvent;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationService>,
    pub sse_tx: broadcast::Sender<SlotEvent>,
    pub auth: AuthConfig,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(reservations: Arc<ReservationService>, jwt_secret: impl Into<String>) -> Result<Self, prometheus::Error> {
        let (sse_tx, _) = broadcast::channel(100);
        Ok(Self {
            reservations,
            sse_tx,
            auth: AuthConfig { secret: jwt_secret.into() },
            metrics: Arc::new(Metrics::new()?),
        })
    }

    /// Nobody listening is fine.
    pub fn publish(&self, event: SlotEvent) {
        let _ = self.sse_tx.send(event);
    }
}
