use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use turf_core::slot::{self, Slot};
use turf_reservation::{SlotAvailability, VerifyOutcome};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::optional_viewer;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub facility_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<SlotAvailability>,
}

/// A customer's slot selection.
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub slots: Vec<Slot>,
}

pub async fn get_availability(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let date = slot::parse_date(&query.date)?;
    let viewer = optional_viewer(bearer.as_ref().map(|TypedHeader(auth)| auth.token()), &state.auth.secret);

    let slots = state
        .reservations
        .availability(facility_id, date, viewer, Utc::now())
        .await?;

    Ok(Json(AvailabilityResponse { facility_id, date, slots }))
}

pub async fn verify_slots(
    State(state): State<AppState>,
    Path(facility_id): Path<Uuid>,
    WithRejection(Json(req), _): WithRejection<Json<SelectionRequest>, AppError>,
) -> Result<Json<VerifyOutcome>, AppError> {
    let outcome = state.reservations.verify(facility_id, &req.slots).await?;
    state
        .metrics
        .record("verify", if outcome.available { "available" } else { "conflict" });
    Ok(Json(outcome))
}
