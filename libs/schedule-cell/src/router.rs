use axum::{
    Router,
    routing::{get, put},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::ScheduleState;

pub fn working_hours_routes(state: ScheduleState) -> Router {
    let public_routes = Router::new()
        .route("/{professional_id}", get(handlers::get_working_hours));

    let protected_routes = Router::new()
        .route("/", put(handlers::replace_working_hours))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
