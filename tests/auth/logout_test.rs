use axum::http::{header, HeaderValue, StatusCode};
use serde_json::json;

use crate::common::{cookie_pair, test_email, test_password, TestContext};

async fn login(ctx: &TestContext) -> (String, String) {
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

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "email": &email,
            "password": test_password()
        }))
        .await;
    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    (
        body["tokens"]["access_token"].as_str().unwrap().to_string(),
        body["tokens"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn logout_clears_cookies() {
    let ctx = TestContext::new().await;
    let (access, refresh) = login(&ctx).await;

    let response = ctx
        .server
        .post("/auth/logout")
        .add_header(
            header::COOKIE,
            HeaderValue::from_str(&cookie_pair(&access, &refresh)).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::OK);
    assert!(response.cookie("access_token").value().is_empty());
    assert!(response.cookie("refresh_token").value().is_empty());
}

#[tokio::test]
async fn logout_revokes_the_presented_pair() {
    let ctx = TestContext::new().await;
    let (access, refresh) = login(&ctx).await;

    ctx.server
        .post("/auth/logout")
        .add_header(
            header::COOKIE,
            HeaderValue::from_str(&cookie_pair(&access, &refresh)).unwrap(),
        )
        .await
        .assert_status(StatusCode::OK);

    // The access token is unexpired and correctly signed, but its jti is
    // now blacklisted.
    let response = ctx
        .server
        .get("/auth/me")
        .add_header(
            header::COOKIE,
            HeaderValue::from_str(&cookie_pair(&access, &refresh)).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_cookies_still_succeeds() {
    let ctx = TestContext::new().await;

    ctx.server
        .post("/auth/logout")
        .await
        .assert_status(StatusCode::OK);
}
