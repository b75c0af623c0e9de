// libs/appointment-cell/src/router.rs
use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::AppointmentState;

/// Public slot views, nested under `/availability`.
pub fn availability_routes(state: AppointmentState) -> Router {
    Router::new()
        .route("/{professional_type}/{professional_id}", get(handlers::get_candidate_slots))
        .route("/{professional_type}/{professional_id}/occupied", get(handlers::get_occupied_slots))
        .route("/{professional_type}/{professional_id}/bookable", get(handlers::get_bookable_slots))
        .with_state(state)
}

/// Appointment operations, nested under `/appointments`. All require authentication.
pub fn appointment_routes(state: AppointmentState) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::list_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/history", get(handlers::get_status_history))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/checkout", post(handlers::start_checkout))
        .layer(middleware::from_fn_with_state(state.config().clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
