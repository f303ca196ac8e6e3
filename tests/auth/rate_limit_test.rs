use axum::http::{HeaderValue, StatusCode};
use serde_json::json;

use crate::common::{test_config, test_email, test_password, TestContext};

async fn create_test_user(ctx: &TestContext) -> String {
    let email = test_email();

    ctx.server
        .post("/auth/register")
        .json(&json!({
            "email": &email,
            "password": test_password(),
            "password_confirm": test_password()
        }))
        .await
        .assert_status(StatusCode::CREATED);

    email
}

async fn failed_login_from(ctx: &TestContext, email: &str, ip: &str) -> StatusCode {
    ctx.server
        .post("/auth/login")
        .add_header("x-forwarded-for", HeaderValue::from_str(ip).unwrap())
        .json(&json!({
            "email": email,
            "password": "WrongPassword123!"
        }))
        .await
        .status_code()
}

#[tokio::test]
async fn sixth_failed_attempt_is_rate_limited() {
    let ctx = TestContext::new().await;
    let email = create_test_user(&ctx).await;

    for _ in 0..5 {
        assert_eq!(
            failed_login_from(&ctx, &email, "10.0.0.5").await,
            StatusCode::UNAUTHORIZED
        );
    }

    // Sixth attempt is rejected before the password is even checked:
    // the correct password gets the same 429.
    let response = ctx
        .server
        .post("/auth/login")
        .add_header("x-forwarded-for", HeaderValue::from_static("10.0.0.5"))
        .json(&json!({
            "email": &email,
            "password": test_password()
        }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert!(body["retry_after"].is_string());

    // A different address is still admitted.
    let other = ctx
        .server
        .post("/auth/login")
        .add_header("x-forwarded-for", HeaderValue::from_static("10.0.0.6"))
        .json(&json!({
            "email": &email,
            "password": test_password()
        }))
        .await;
    other.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn successful_logins_do_not_count_toward_the_limit() {
    let ctx = TestContext::new().await;
    let email = create_test_user(&ctx).await;

    for _ in 0..6 {
        let response = ctx
            .server
            .post("/auth/login")
            .add_header("x-forwarded-for", HeaderValue::from_static("10.0.0.7"))
            .json(&json!({
                "email": &email,
                "password": test_password()
            }))
            .await;
        response.assert_status(StatusCode::OK);
    }
}

#[tokio::test]
async fn burst_limiter_rejects_requests_past_capacity() {
    let mut config = test_config();
    config.burst_limit = 3;
    let ctx = TestContext::with_config(config).await;

    for _ in 0..3 {
        ctx.server.get("/health").await.assert_status(StatusCode::OK);
    }

    // Capacity spent; refill is one request per minute, so the next
    // request is turned away at the outermost layer.
    ctx.server
        .get("/health")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn status_endpoint_reports_attempts_and_limited_flag() {
    let ctx = TestContext::new().await;
    let email = create_test_user(&ctx).await;

    for _ in 0..2 {
        failed_login_from(&ctx, &email, "10.0.0.8").await;
    }

    let response = ctx
        .server
        .get("/rate-limit/status")
        .add_header("x-forwarded-for", HeaderValue::from_static("10.0.0.8"))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["attempts"], 2);
    assert_eq!(body["data"]["limited"], false);
    assert!(body["data"]["window_start"].is_string());

    for _ in 0..3 {
        failed_login_from(&ctx, &email, "10.0.0.8").await;
    }

    let response = ctx
        .server
        .get("/rate-limit/status")
        .add_header("x-forwarded-for", HeaderValue::from_static("10.0.0.8"))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["attempts"], 5);
    assert_eq!(body["data"]["limited"], true);
}
