//! Client for the portal's authentication endpoints
use crate::logging::LogAndHandleErrorMiddleware;
use anyhow::{Context, Result};
use reqwest::{Client, Method};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use sk_portal_core::{
    common::{
        LoginRequest, LoginResponse, OtpStatusResponse, Purpose, ResendOtpRequest,
        ResendOtpResponse, VerifyOtpRequest, VerifyOtpResponse,
    },
    email::Email,
};
use std::{sync::Arc, time::Duration};
use url::Url;

pub const OTP_STATUS_PATH: &str = "/api/auth/otp-status";
pub const VERIFY_OTP_PATH: &str = "/api/auth/verify-otp";
pub const RESEND_OTP_PATH: &str = "/api/auth/resend-otp";
pub const LOGIN_PATH: &str = "/api/auth/login";

/// The three OTP operations the verification controller depends on.
///
/// The backend owns issuing and checking codes, this is only its client-side
/// face.
#[async_trait::async_trait]
pub trait OtpApi: Send + Sync {
    /// Whether a code is outstanding for `email`, and for how long
    async fn otp_status(&self, email: &Email, purpose: Purpose) -> Result<OtpStatusResponse>;

    /// Check a submitted code
    async fn verify(&self, request: &VerifyOtpRequest) -> Result<VerifyOtpResponse>;

    /// Ask for a (new) code to be sent
    async fn resend(&self, request: &ResendOtpRequest) -> Result<ResendOtpResponse>;
}

#[async_trait::async_trait]
impl<T: OtpApi + ?Sized> OtpApi for Arc<T> {
    async fn otp_status(&self, email: &Email, purpose: Purpose) -> Result<OtpStatusResponse> {
        (**self).otp_status(email, purpose).await
    }

    async fn verify(&self, request: &VerifyOtpRequest) -> Result<VerifyOtpResponse> {
        (**self).verify(request).await
    }

    async fn resend(&self, request: &ResendOtpRequest) -> Result<ResendOtpResponse> {
        (**self).resend(request).await
    }
}

/// HTTP implementation of [`OtpApi`], plus login.
#[derive(Debug, Clone)]
pub struct PortalClient {
    client: ClientWithMiddleware,
    api_endpoint: Url,
}

impl PortalClient {
    /// Requests that take longer than `timeout` fail, which the verification
    /// screen treats like any other network error.
    pub fn new(api_endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Building HTTP client")?;
        let client = ClientBuilder::new(client)
            .with(LogAndHandleErrorMiddleware)
            .build();

        Ok(Self {
            client,
            api_endpoint,
        })
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        tracing::info!(email = %request.email, "Logging in");

        self.server_request(Method::POST, LOGIN_PATH)
            .json(request)
            .send()
            .await?
            .json()
            .await
            .context("Decoding login response")
    }

    fn server_request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut url = self.api_endpoint.clone();
        url.set_path(path);
        self.client.request(method, url)
    }
}

#[async_trait::async_trait]
impl OtpApi for PortalClient {
    async fn otp_status(&self, email: &Email, purpose: Purpose) -> Result<OtpStatusResponse> {
        self.server_request(Method::GET, OTP_STATUS_PATH)
            .query(&[("email", email.as_str()), ("purpose", purpose.as_str())])
            .send()
            .await?
            .json()
            .await
            .context("Decoding OTP status response")
    }

    async fn verify(&self, request: &VerifyOtpRequest) -> Result<VerifyOtpResponse> {
        self.server_request(Method::POST, VERIFY_OTP_PATH)
            .json(request)
            .send()
            .await?
            .json()
            .await
            .context("Decoding verify response")
    }

    async fn resend(&self, request: &ResendOtpRequest) -> Result<ResendOtpResponse> {
        self.server_request(Method::POST, RESEND_OTP_PATH)
            .json(request)
            .send()
            .await?
            .json()
            .await
            .context("Decoding resend response")
    }
}
