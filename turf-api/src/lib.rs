use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod availability;
pub mod bookings;
pub mod error;
pub mod holds;
pub mod metrics;
pub mod middleware;
pub mod state;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics::export))
        .route("/v1/facilities/{id}/availability", get(availability::get_availability))
        .route("/v1/facilities/{id}/stream", get(holds::stream_slot_events));

    let customer = Router::new()
        .route("/v1/facilities/{id}/slots/verify", post(availability::verify_slots))
        .route(
            "/v1/facilities/{id}/holds",
            post(holds::reserve_slots).delete(holds::release_holds),
        )
        .route("/v1/facilities/{id}/bookings", post(bookings::create_bookings))
        .route("/v1/bookings/mine", get(bookings::list_my_bookings))
        .route_layer(from_fn_with_state(state.clone(), middleware::customer_auth_middleware));

    let owner = Router::new()
        .route("/v1/owner/bookings/{id}/status", post(bookings::update_booking_status))
        .route_layer(from_fn_with_state(state.clone(), middleware::owner_auth_middleware));

    Router::new()
        .merge(public)
        .merge(customer)
        .merge(owner)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
