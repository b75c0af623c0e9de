use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use tower::ServiceExt;

use shared_models::auth::Session;
use shared_utils::extractor::auth_middleware;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn protected_app() -> Router {
    let config = TestConfig::default().to_arc();
    Router::new()
        .route("/me", get(|Extension(session): Extension<Session>| async move {
            session.user_id.to_string()
        }))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
}

async fn status_for(authorization: Option<String>) -> StatusCode {
    let mut builder = Request::builder().uri("/me");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    let response = protected_app()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    response.status()
}

#[tokio::test]
async fn valid_bearer_token_reaches_handler() {
    let config = TestConfig::default();
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let response = protected_app()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(std::str::from_utf8(&body).unwrap(), user.id.to_string());
}

#[tokio::test]
async fn missing_or_bad_tokens_are_unauthorized() {
    let config = TestConfig::default();
    let user = TestUser::patient("patient@example.com");

    assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(status_for(Some("Token abc".to_string())).await, StatusCode::UNAUTHORIZED);

    let expired = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);
    assert_eq!(status_for(Some(format!("Bearer {}", expired))).await, StatusCode::UNAUTHORIZED);

    let forged = JwtTestUtils::create_invalid_signature_token(&user);
    assert_eq!(status_for(Some(format!("Bearer {}", forged))).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn supabase_session_token_is_accepted() {
    let config = TestConfig::default();
    let user = TestUser::psychologist("psi@example.com");
    let token = JwtTestUtils::create_supabase_token(&user, &config.jwt_secret);

    assert_eq!(status_for(Some(format!("Bearer {}", token))).await, StatusCode::OK);
}
