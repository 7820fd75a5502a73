use crate::fakes::email;
use assert_matches::assert_matches;
use serde_json::json;
use sk_portal_cli::api::{
    OtpApi, PortalClient, LOGIN_PATH, OTP_STATUS_PATH, RESEND_OTP_PATH, VERIFY_OTP_PATH,
};
use sk_portal_core::common::{LoginRequest, Purpose, ResendOtpRequest, VerifyOtpRequest};
use std::time::Duration;
use testresult::TestResult;
use url::Url;
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn client_for(server: &MockServer) -> TestResult<PortalClient> {
    Ok(PortalClient::new(
        Url::parse(&server.uri())?,
        Duration::from_secs(5),
    )?)
}

#[test_log::test(tokio::test)]
async fn test_status_sends_email_and_purpose() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OTP_STATUS_PATH))
        .and(query_param("email", "a@b.com"))
        .and(query_param("purpose", "twofactor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "hasActiveOtp": true,
            "remainingTime": 245
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = client_for(&server)
        .await?
        .otp_status(&email(), Purpose::TwoFactor)
        .await?;

    assert!(status.success);
    assert!(status.has_active_otp);
    assert_eq!(status.remaining_time, 245);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_rejected_code_is_decoded_from_client_error() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(VERIFY_OTP_PATH))
        .and(body_json(json!({
            "email": "a@b.com",
            "code": "123456",
            "purpose": "signup_verification"
        })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "OTP has expired",
            "isExpired": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .await?
        .verify(&VerifyOtpRequest {
            email: email(),
            code: "123456".to_string(),
            purpose: Purpose::SignupVerification,
        })
        .await?;

    assert!(!response.success);
    assert_eq!(response.is_expired, Some(true));
    assert_eq!(response.message.as_deref(), Some("OTP has expired"));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_server_error_is_an_error() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(VERIFY_OTP_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .await?
        .verify(&VerifyOtpRequest {
            email: email(),
            code: "123456".to_string(),
            purpose: Purpose::TwoFactor,
        })
        .await;

    assert_matches!(result, Err(_));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_resend_coerces_remaining_time() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RESEND_OTP_PATH))
        .and(body_json(json!({
            "email": "a@b.com",
            "purpose": "signup_verification",
            "force": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "OTP sent",
            "remainingTime": "300"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .await?
        .resend(&ResendOtpRequest {
            email: email(),
            purpose: Purpose::SignupVerification,
            force: false,
        })
        .await?;

    assert!(response.success);
    assert_eq!(response.remaining_time, 300);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_garbage_body_is_an_error() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OTP_STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .await?
        .otp_status(&email(), Purpose::SignupVerification)
        .await;

    assert_matches!(result, Err(_));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_login_reports_second_factor() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(body_json(json!({ "email": "a@b.com", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "requiresTwoFactor": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .await?
        .login(&LoginRequest {
            email: email(),
            password: "hunter2".to_string(),
        })
        .await?;

    assert!(response.success);
    assert!(response.requires_two_factor);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_hanging_server_times_out() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OTP_STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "hasActiveOtp": false }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = PortalClient::new(Url::parse(&server.uri())?, Duration::from_millis(200))?;
    let started = std::time::Instant::now();
    let result = client
        .otp_status(&email(), Purpose::SignupVerification)
        .await;

    assert_matches!(result, Err(_));
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}
