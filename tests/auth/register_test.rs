use axum::http::StatusCode;
use serde_json::json;

use crate::common::{test_email, test_password, TestContext};

#[tokio::test]
async fn register_returns_user_and_token_pair() {
    let ctx = TestContext::new().await;
    let email = test_email();

    let response = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "email": &email,
            "password": test_password(),
            "password_confirm": test_password()
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let body: serde_json::Value = response.json();
    assert_eq!(body["user"]["email"], email.as_str());
    assert_eq!(body["user"]["status"], "ACTIVE");
    assert_eq!(body["user"]["two_factor_status"], "DISABLED");
    assert!(body["tokens"]["access_token"].is_string());
    assert!(body["tokens"]["refresh_token"].is_string());
    assert_eq!(body["tokens"]["token_type"], "Bearer");
}

#[tokio::test]
async fn register_with_existing_email_conflicts() {
    let ctx = TestContext::new().await;
    let email = test_email();

    let payload = json!({
        "email": &email,
        "password": test_password(),
        "password_confirm": test_password()
    });

    ctx.server
        .post("/auth/register")
        .json(&payload)
        .await
        .assert_status(StatusCode::CREATED);

    ctx.server
        .post("/auth/register")
        .json(&payload)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_with_mismatched_passwords_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "email": test_email(),
            "password": test_password(),
            "password_confirm": "SomethingElse123!"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_with_short_password_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "email": test_email(),
            "password": "short",
            "password_confirm": "short"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
