use axum::http::{header, HeaderValue, StatusCode};
use serde_json::json;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::common::{cookie_pair, test_email, test_password, TestContext};

struct AuthedUser {
    email: String,
    cookies: HeaderValue,
}

async fn login(ctx: &TestContext) -> AuthedUser {
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
    let cookies = cookie_pair(
        body["tokens"]["access_token"].as_str().unwrap(),
        body["tokens"]["refresh_token"].as_str().unwrap(),
    );

    AuthedUser {
        email,
        cookies: HeaderValue::from_str(&cookies).unwrap(),
    }
}

fn totp_code(secret: &str, account: &str) -> String {
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        Secret::Encoded(secret.to_string()).to_bytes().unwrap(),
        Some("test".to_string()),
        account.to_string(),
    )
    .unwrap()
    .generate_current()
    .unwrap()
}

#[tokio::test]
async fn setup_requires_authentication() {
    let ctx = TestContext::new().await;

    ctx.server
        .post("/auth/2fa/setup")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn setup_then_verify_activates_and_returns_recovery_codes() {
    let ctx = TestContext::new().await;
    let user = login(&ctx).await;

    let setup = ctx
        .server
        .post("/auth/2fa/setup")
        .add_header(header::COOKIE, user.cookies.clone())
        .await;
    setup.assert_status(StatusCode::OK);

    let setup_body: serde_json::Value = setup.json();
    let secret = setup_body["secret"].as_str().unwrap().to_string();
    assert!(setup_body["qr_code"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    // Identity now shows the pending enrollment.
    let me = ctx
        .server
        .get("/auth/me")
        .add_header(header::COOKIE, user.cookies.clone())
        .await;
    let me_body: serde_json::Value = me.json();
    assert_eq!(me_body["two_factor_status"], "PENDING");

    let verify = ctx
        .server
        .post("/auth/2fa/verify")
        .add_header(header::COOKIE, user.cookies.clone())
        .json(&json!({ "token": totp_code(&secret, &user.email) }))
        .await;
    verify.assert_status(StatusCode::OK);

    let verify_body: serde_json::Value = verify.json();
    assert_eq!(verify_body["success"], true);
    assert_eq!(verify_body["recovery_codes"].as_array().unwrap().len(), 10);

    let me = ctx
        .server
        .get("/auth/me")
        .add_header(header::COOKIE, user.cookies.clone())
        .await;
    let me_body: serde_json::Value = me.json();
    assert_eq!(me_body["two_factor_status"], "ACTIVE");
}

#[tokio::test]
async fn wrong_code_is_rejected() {
    let ctx = TestContext::new().await;
    let user = login(&ctx).await;

    ctx.server
        .post("/auth/2fa/setup")
        .add_header(header::COOKIE, user.cookies.clone())
        .await
        .assert_status(StatusCode::OK);

    let verify = ctx
        .server
        .post("/auth/2fa/verify")
        .add_header(header::COOKIE, user.cookies.clone())
        .json(&json!({ "token": "000000" }))
        .await;

    verify.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verify_before_setup_reports_not_configured() {
    let ctx = TestContext::new().await;
    let user = login(&ctx).await;

    let verify = ctx
        .server
        .post("/auth/2fa/verify")
        .add_header(header::COOKIE, user.cookies.clone())
        .json(&json!({ "token": "123456" }))
        .await;

    // Distinct from a wrong code, but only for the account owner.
    verify.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recovery_code_redeems_once() {
    let ctx = TestContext::new().await;
    let user = login(&ctx).await;

    let setup = ctx
        .server
        .post("/auth/2fa/setup")
        .add_header(header::COOKIE, user.cookies.clone())
        .await;
    let setup_body: serde_json::Value = setup.json();
    let secret = setup_body["secret"].as_str().unwrap().to_string();

    let verify = ctx
        .server
        .post("/auth/2fa/verify")
        .add_header(header::COOKIE, user.cookies.clone())
        .json(&json!({ "token": totp_code(&secret, &user.email) }))
        .await;
    let verify_body: serde_json::Value = verify.json();
    let code = verify_body["recovery_codes"][0].as_str().unwrap().to_string();

    ctx.server
        .post("/auth/2fa/recovery")
        .add_header(header::COOKIE, user.cookies.clone())
        .json(&json!({ "code": &code }))
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .post("/auth/2fa/recovery")
        .add_header(header::COOKIE, user.cookies.clone())
        .json(&json!({ "code": &code }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
