use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use turf_core::slot::Slot;
use turf_reservation::ReserveOutcome;
use turf_shared::models::events::{SlotEvent, SlotEventKind};
use uuid::Uuid;

use crate::availability::SelectionRequest;
use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub status: &'static str,
    pub expires_at: DateTime<Utc>,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: usize,
}

pub async fn reserve_slots(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<SelectionRequest>, AppError>,
) -> Result<Json<HoldResponse>, AppError> {
    let now = Utc::now();
    let outcome = state
        .reservations
        .reserve(facility_id, claims.sub, &req.slots, now)
        .await?;

    match outcome {
        ReserveOutcome::Held { slots, expires_at } => {
            state.metrics.record("reserve", "held");
            state.publish(SlotEvent {
                facility_id,
                kind: SlotEventKind::Held,
                slots: slots.iter().map(Into::into).collect(),
                at: now.timestamp(),
            });
            Ok(Json(HoldResponse { status: "HELD", expires_at, slots }))
        }
        ReserveOutcome::SlotConflict(rejections) => {
            state.metrics.record("reserve", "slot_conflict");
            Err(AppError::conflict("SLOT_CONFLICT", "rejections", rejections))
        }
        ReserveOutcome::HoldContention(rejections) => {
            state.metrics.record("reserve", "hold_contention");
            Err(AppError::conflict("HOLD_CONTENTION", "rejections", rejections))
        }
    }
}

pub async fn release_holds(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ReleaseResponse>, AppError> {
    let released = state.reservations.release(facility_id, claims.sub).await?;
    if released > 0 {
        // Which slots freed up is not tracked; listeners refetch availability.
        state.publish(SlotEvent {
            facility_id,
            kind: SlotEventKind::Released,
            slots: Vec::new(),
            at: Utc::now().timestamp(),
        });
    }
    Ok(Json(ReleaseResponse { released }))
}

/// Live slot changes for one facility. Polling availability stays the
/// source of truth; this only tells a client when to poll.
pub async fn stream_slot_events(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sse_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.facility_id == facility_id => {
                let name = match event.kind {
                    SlotEventKind::Held => "slots_held",
                    SlotEventKind::Released => "slots_released",
                    SlotEventKind::Booked => "slots_booked",
                };
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(Event::default().event(name).data(data)))
            }
            // Lagged receivers just miss events.
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
