use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use appointment_cell::router::{appointment_routes, availability_routes};
use appointment_cell::AppointmentState;
use schedule_cell::router::working_hours_routes;
use schedule_cell::ScheduleState;
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>, schedule: ScheduleState, appointments: AppointmentState) -> Router {
    Router::new()
        .route("/", get(|| async { "Desabafe API is running!" }))
        .nest("/working-hours", working_hours_routes(schedule))
        .nest("/availability", availability_routes(appointments.clone()))
        .nest("/appointments", appointment_routes(appointments))
        .layer(cors_layer(&config))
}

/// Only the configured frontend origin is allowed; an unparsable origin falls back to any.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match HeaderValue::from_str(config.frontend_url.trim_end_matches('/')) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            warn!("FRONTEND_URL is not a valid origin, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    async fn app() -> Router {
        let config = TestConfig::default().to_arc();
        let (schedule, appointments) = crate::state::build(config.clone()).await.unwrap();
        create_router(config, schedule, appointments)
    }

    #[tokio::test]
    async fn root_reports_liveness() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Desabafe API is running!");
    }

    #[tokio::test]
    async fn cells_are_mounted() {
        let app = app().await;
        let id = uuid::Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/working-hours/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/availability/psychiatrist/{}?date=2026-10-19", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/appointments").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn preflight_allows_the_frontend_origin() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/appointments")
                    .header("Origin", "http://localhost:3000")
                    .header("Access-Control-Request-Method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }
}
