use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::AppError;
use crate::state::AppState;

pub struct Metrics {
    registry: Registry,
    outcomes: IntCounterVec,
    holds_purged: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let outcomes = IntCounterVec::new(
            Opts::new("turf_reservation_outcomes_total", "Reservation requests by operation and outcome"),
            &["operation", "outcome"],
        )?;
        let holds_purged = IntCounter::new("turf_holds_purged_total", "Dead holds removed by the sweeper")?;

        registry.register(Box::new(outcomes.clone()))?;
        registry.register(Box::new(holds_purged.clone()))?;

        Ok(Self { registry, outcomes, holds_purged })
    }

    pub fn record(&self, operation: &str, outcome: &str) {
        self.outcomes.with_label_values(&[operation, outcome]).inc();
    }

    pub fn holds_purged(&self, count: usize) {
        self.holds_purged.inc_by(count as u64);
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::InternalServerError(format!("metrics encoding failed: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
