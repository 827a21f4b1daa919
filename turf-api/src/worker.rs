use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info};
use turf_reservation::ReservationService;

use crate::metrics::Metrics;

/// Periodically deletes dead holds. Reads never trust a hold past its
/// expiry, so this only keeps the store small. `every_seconds == 0` disables it.
pub fn start_hold_sweeper(
    reservations: Arc<ReservationService>,
    metrics: Arc<Metrics>,
    every_seconds: u64,
) -> Option<JoinHandle<()>> {
    if every_seconds == 0 {
        info!("Hold sweeper disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = time::interval(Duration::from_secs(every_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Hold sweeper started, every {}s", every_seconds);

        loop {
            ticker.tick().await;
            match reservations.purge_expired_holds(Utc::now()).await {
                Ok(0) => {}
                Ok(purged) => {
                    debug!("Purged {} expired holds", purged);
                    metrics.holds_purged(purged);
                }
                Err(e) => error!("Hold sweep failed: {}", e),
            }
        }
    }))
}
