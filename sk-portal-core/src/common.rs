//! Request and response data types that are common between the portal backend and its clients

use crate::email::Email;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Which flow an OTP challenge belongs to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// Verifying the email address of a freshly signed up account
    #[serde(rename = "signup_verification")]
    SignupVerification,
    /// Second factor during login
    #[serde(rename = "twofactor")]
    TwoFactor,
}

impl Purpose {
    /// The wire name of this purpose, as used in query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignupVerification => "signup_verification",
            Self::TwoFactor => "twofactor",
        }
    }

    /// Where the portal sends the user once the code was accepted.
    ///
    /// Relative to the portal's base URL.
    pub fn destination_path(&self) -> &'static str {
        match self {
            Self::SignupVerification => "/login?verified=true",
            Self::TwoFactor => "/dashboard",
        }
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of the OTP status endpoint
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OtpStatusResponse {
    /// Whether the request was handled
    #[serde(default)]
    pub success: bool,
    /// Whether an OTP is currently outstanding for this email and purpose
    #[serde(default)]
    pub has_active_otp: bool,
    /// Seconds until the outstanding OTP expires
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub remaining_time: u64,
}

/// Request for checking a submitted code
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VerifyOtpRequest {
    /// The email the code was sent to
    pub email: Email,
    /// The six digit code
    pub code: String,
    /// The flow this code belongs to
    pub purpose: Purpose,
}

/// Response of the verify endpoint
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    /// Whether the code was accepted
    #[serde(default)]
    pub success: bool,
    /// Human readable explanation, mostly set on failure
    #[serde(default)]
    pub message: Option<String>,
    /// Set when the code was right but has expired
    #[serde(default)]
    pub is_expired: Option<bool>,
}

/// Request for (re-)issuing a code
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResendOtpRequest {
    /// The email to send the code to
    pub email: Email,
    /// The flow the code belongs to
    pub purpose: Purpose,
    /// Whether this bypasses the client-side cooldown
    pub force: bool,
}

/// Response of the resend endpoint
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResendOtpResponse {
    /// Whether a code is (still) outstanding after this request
    #[serde(default)]
    pub success: bool,
    /// Human readable explanation
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds until the outstanding code expires
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub remaining_time: u64,
}

/// Login request struct
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoginRequest {
    /// Email of the account
    pub email: Email,
    /// Plaintext password, only ever sent over TLS
    pub password: String,
}

/// Response of the login endpoint
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Whether the credentials were accepted
    #[serde(default)]
    pub success: bool,
    /// Human readable explanation
    #[serde(default)]
    pub message: Option<String>,
    /// Set when the login can only complete after an OTP challenge
    #[serde(default)]
    pub requires_two_factor: bool,
}

/// The backend isn't consistent about how it encodes seconds.
/// Anything that doesn't look like a non-negative number counts as zero.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, seconds_from_value))
}

fn seconds_from_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map_or(0, |f| f as u64),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn test_purpose_wire_names() -> TestResult {
        assert_eq!(
            serde_json::to_value(Purpose::SignupVerification)?,
            json!("signup_verification")
        );
        assert_eq!(serde_json::to_value(Purpose::TwoFactor)?, json!("twofactor"));
        assert_eq!(Purpose::TwoFactor.to_string(), "twofactor");
        Ok(())
    }

    #[test]
    fn test_remaining_time_coercion() -> TestResult {
        let cases = [
            (json!({ "success": true, "hasActiveOtp": true, "remainingTime": 120 }), 120),
            (json!({ "success": true, "hasActiveOtp": true, "remainingTime": "75" }), 75),
            (json!({ "success": true, "hasActiveOtp": true, "remainingTime": 42.9 }), 42),
            (json!({ "success": true, "hasActiveOtp": true, "remainingTime": -5 }), 0),
            (json!({ "success": true, "hasActiveOtp": true, "remainingTime": "soon" }), 0),
            (json!({ "success": true, "hasActiveOtp": true, "remainingTime": null }), 0),
            (json!({ "success": true, "hasActiveOtp": false }), 0),
        ];

        for (body, expected) in cases {
            let response: OtpStatusResponse = serde_json::from_value(body.clone())?;
            assert_eq!(response.remaining_time, expected, "for {body}");
        }

        Ok(())
    }

    #[test]
    fn test_verify_response_defaults() -> TestResult {
        let response: VerifyOtpResponse =
            serde_json::from_value(json!({ "success": false, "isExpired": true }))?;
        assert!(!response.success);
        assert_eq!(response.is_expired, Some(true));
        assert_eq!(response.message, None);
        Ok(())
    }

    #[test]
    fn test_resend_request_shape() -> TestResult {
        let request = ResendOtpRequest {
            email: "a@b.com".parse()?,
            purpose: Purpose::SignupVerification,
            force: true,
        };
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({ "email": "a@b.com", "purpose": "signup_verification", "force": true })
        );
        Ok(())
    }
}
