//! Errors surfaced by the verification screens

/// Message shown when the backend gave no explanation of its own.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Why a submitted code didn't verify.
///
/// None of these are fatal: the user can always retry or ask for a new code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Fewer than six digits were entered. Never reaches the server.
    #[error("Please enter the complete 6-digit code.")]
    Incomplete,
    /// The code was issued but is no longer valid.
    #[error("This code has expired. Please request a new one.")]
    Expired,
    /// The server rejected the code.
    #[error("{0}")]
    InvalidCode(String),
    /// Transport failure or an unexpected response.
    #[error("{0}")]
    Network(String),
    /// Another submit or resend hasn't finished yet.
    #[error("Please wait for the current request to finish.")]
    Busy,
}

impl VerifyError {
    /// A server rejection, falling back to a generic message
    pub fn invalid_code(message: Option<String>) -> Self {
        Self::InvalidCode(non_empty(message).unwrap_or_else(|| "Invalid code.".to_string()))
    }

    /// A network failure with the generic message
    pub fn network() -> Self {
        Self::Network(GENERIC_FAILURE.to_string())
    }
}

/// Errors while mounting a verification screen
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// Neither the caller nor a pending login said which email to verify
    #[error("No email address to verify. Please log in again.")]
    NoEmail,
}

pub(crate) fn non_empty(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}
