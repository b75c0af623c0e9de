use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use schedule_cell::router::working_hours_routes;
use schedule_cell::services::{InMemoryProfessionalDirectory, InMemoryWorkingHoursStore};
use schedule_cell::ScheduleState;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app() -> (Router, TestConfig) {
    let config = TestConfig::default();
    let state = ScheduleState::in_memory(
        config.to_arc(),
        Arc::new(InMemoryProfessionalDirectory::new()),
        Arc::new(InMemoryWorkingHoursStore::new()),
    );
    (working_hours_routes(state), config)
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn put_week(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/")
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn professional_replaces_and_reads_back_week() {
    let (app, config) = create_test_app();
    let doctor = TestUser::psychologist("psi@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let response = app
        .clone()
        .oneshot(put_week(
            &token,
            json!({
                "entries": [
                    { "weekday": 0, "start_time": "09:00", "end_time": "12:00" },
                    { "weekday": 2, "start_time": "14:00", "end_time": "18:00", "active": false }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", doctor.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["configured"], true);
    assert_eq!(body["working_hours"][0]["start_time"], "09:00");
    assert_eq!(body["working_hours"][1]["active"], false);
}

#[tokio::test]
async fn unconfigured_professional_reads_empty_week() {
    let (app, _) = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["configured"], false);
    assert_eq!(body["working_hours"], json!([]));
}

#[tokio::test]
async fn patient_cannot_edit_working_hours() {
    let (app, config) = create_test_app();
    let patient = TestUser::patient("p@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let response = app
        .oneshot(put_week(&token, json!({ "entries": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(response).await["code"], "forbidden");
}

#[tokio::test]
async fn professional_cannot_edit_someone_else() {
    let (app, config) = create_test_app();
    let doctor = TestUser::psychiatrist("psq@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let response = app
        .oneshot(put_week(
            &token,
            json!({ "professional_id": uuid::Uuid::new_v4(), "entries": [] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_week_is_rejected() {
    let (app, config) = create_test_app();
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, None);

    let response = app
        .oneshot(put_week(
            &token,
            json!({
                "professional_id": uuid::Uuid::new_v4(),
                "entries": [{ "weekday": 1, "start_time": "12:00", "end_time": "09:00" }]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "validation_error");
}

#[tokio::test]
async fn editing_requires_a_token() {
    let (app, _) = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/")
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "entries": [] }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["code"], "authentication_required");
}
