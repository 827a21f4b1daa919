use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use turf_core::slot::Slot;
use turf_core::{Booking, BookingStatus};
use turf_reservation::{BookingOutcome, CheckoutRequest};
use turf_shared::models::events::{SlotEvent, SlotEventKind};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub owner_id: Uuid,
    pub slots: Vec<Slot>,
    pub total_amount: i64,
    /// Reference to the uploaded payment proof.
    pub payment_ref: String,
}

#[derive(Debug, Serialize)]
pub struct BookingsCreatedResponse {
    pub booking_ids: Vec<Uuid>,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
}

pub async fn create_bookings(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateBookingRequest>, AppError>,
) -> Result<(StatusCode, Json<BookingsCreatedResponse>), AppError> {
    let now = Utc::now();
    let checkout = CheckoutRequest {
        facility_id,
        customer_id: claims.sub,
        owner_id: req.owner_id,
        slots: req.slots,
        total_amount: req.total_amount,
        payment_ref: req.payment_ref,
    };

    let outcome = state.reservations.create_booking(checkout, now).await?;
    let booking_ids = outcome.booking_ids();
    match outcome {
        BookingOutcome::Created(bookings) => {
            state.metrics.record("create_booking", "created");
            state.publish(SlotEvent {
                facility_id,
                kind: SlotEventKind::Booked,
                slots: bookings.iter().map(|b| (&b.slot).into()).collect(),
                at: now.timestamp(),
            });
            Ok((StatusCode::CREATED, Json(BookingsCreatedResponse { booking_ids, bookings })))
        }
        BookingOutcome::SlotConflict(slots) => {
            state.metrics.record("create_booking", "slot_conflict");
            Err(AppError::conflict("SLOT_CONFLICT", "conflicts", slots))
        }
        BookingOutcome::HoldContention(rejections) => {
            state.metrics.record("create_booking", "hold_contention");
            Err(AppError::conflict("HOLD_CONTENTION", "rejections", rejections))
        }
    }
}

pub async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.reservations.bookings_for(claims.sub).await?))
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<StatusUpdateRequest>, AppError>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .reservations
        .update_status(booking_id, claims.sub, req.status)
        .await?;

    info!("Owner {} set booking {} to {}", claims.sub, booking_id, booking.status);
    state.metrics.record("update_status", booking.status.as_str());
    Ok(Json(booking))
}
