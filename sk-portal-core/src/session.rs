//! The OTP verification state machine.
//!
//! [`VerificationSession`] holds everything a verification screen shows and
//! decides how server responses and clock ticks change it. It does no I/O:
//! callers pass in the current time and the decoded server responses, and
//! act on the returned outcomes (issue a resend, schedule a status check,
//! show a notice).

use crate::{
    code::{BoxEvent, DigitBoxes, CODE_LENGTH},
    common::{
        OtpStatusResponse, Purpose, ResendOtpRequest, ResendOtpResponse, VerifyOtpRequest,
        VerifyOtpResponse,
    },
    countdown::{format_mm_ss, Countdown},
    email::Email,
    error::{non_empty, VerifyError, GENERIC_FAILURE},
};
use std::time::Instant;

/// Lifetime of a freshly issued code, in seconds.
pub const OTP_VALIDITY_SECS: u64 = 300;

/// Something to tell the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A new code went out
    CodeSent,
    /// A resend found the previous code still valid
    StillValid {
        /// Seconds the previous code stays valid
        remaining_seconds: u64,
    },
    /// The code was accepted, a redirect follows
    Verified,
    /// The server refused to send a code
    ResendFailed(String),
    /// Submitting the code failed
    Error(VerifyError),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CodeSent => f.write_str("A new verification code has been sent to your email."),
            Self::StillValid { remaining_seconds } => write!(
                f,
                "Your current code is still valid for {}.",
                format_mm_ss(*remaining_seconds)
            ),
            Self::Verified => f.write_str("Verification successful! Redirecting..."),
            Self::ResendFailed(message) => f.write_str(message),
            Self::Error(e) => e.fmt(f),
        }
    }
}

/// Result of advancing the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No countdown is running
    Idle,
    /// Still within the same second
    Unchanged,
    /// The displayed seconds changed
    Changed,
    /// The countdown just hit zero. Confirm with the server.
    Expired,
}

/// Result of applying a status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The local state now mirrors the server
    Synced,
    /// First successful check and nothing is outstanding: issue a code
    AutoIssue,
    /// The check failed; resending was unlocked
    FailedOpen,
}

/// Everything a screen needs to draw itself.
///
/// Compared between updates so screens only redraw on actual changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Contents of the six boxes
    pub digits: [Option<char>; CODE_LENGTH],
    /// Index of the focused box
    pub focus: usize,
    /// Seconds until the current code expires
    pub remaining_seconds: u64,
    /// Whether the resend action is enabled
    pub can_resend: bool,
    /// A submit is in flight
    pub is_loading: bool,
    /// A resend is in flight
    pub is_resending: bool,
}

/// Client-side state of one OTP challenge.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    email: Email,
    purpose: Purpose,
    boxes: DigitBoxes,
    remaining_seconds: u64,
    can_resend: bool,
    is_loading: bool,
    is_resending: bool,
    countdown: Option<Countdown>,
    status_synced: bool,
}

impl VerificationSession {
    /// A fresh session. Nothing is known about the server yet, so resending
    /// is allowed until a status check says otherwise.
    pub fn new(email: Email, purpose: Purpose) -> Self {
        Self {
            email,
            purpose,
            boxes: DigitBoxes::new(),
            remaining_seconds: 0,
            can_resend: true,
            is_loading: false,
            is_resending: false,
            countdown: None,
            status_synced: false,
        }
    }

    /// The email being verified
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// The flow this session belongs to
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    /// Seconds until the current code expires, as last displayed
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    /// Whether the resend action is enabled
    pub fn can_resend(&self) -> bool {
        self.can_resend
    }

    /// Whether a submit is in flight
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether a resend is in flight
    pub fn is_resending(&self) -> bool {
        self.is_resending
    }

    /// Whether the local countdown is running
    pub fn countdown_running(&self) -> bool {
        self.countdown.is_some()
    }

    /// Snapshot for rendering
    pub fn view(&self) -> SessionView {
        SessionView {
            digits: *self.boxes.digits(),
            focus: self.boxes.focus(),
            remaining_seconds: self.remaining_seconds,
            can_resend: self.can_resend,
            is_loading: self.is_loading,
            is_resending: self.is_resending,
        }
    }

    /// Forward a key or paste event to the code boxes
    pub fn key(&mut self, event: BoxEvent) -> bool {
        self.boxes.apply(event)
    }

    /// Advance the countdown to `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let Some(countdown) = self.countdown else {
            return TickOutcome::Idle;
        };

        let remaining = countdown.remaining_seconds(now);
        if remaining == 0 {
            tracing::debug!(email = %self.email, "Local countdown reached zero");
            self.expire();
            TickOutcome::Expired
        } else if remaining != self.remaining_seconds {
            self.remaining_seconds = remaining;
            TickOutcome::Changed
        } else {
            TickOutcome::Unchanged
        }
    }

    /// Reconcile with a status response from the server.
    pub fn apply_status(&mut self, response: &OtpStatusResponse, now: Instant) -> StatusOutcome {
        if !response.success {
            return self.status_failed();
        }

        let first = !self.status_synced;
        self.status_synced = true;

        if response.has_active_otp && response.remaining_time > 0 {
            tracing::debug!(
                remaining = response.remaining_time,
                "Server reports an active code, re-anchoring countdown"
            );
            self.start_countdown(now, response.remaining_time);
            self.can_resend = false;
            StatusOutcome::Synced
        } else if first {
            tracing::info!(email = %self.email, purpose = %self.purpose, "No active code, issuing one");
            StatusOutcome::AutoIssue
        } else {
            self.expire();
            StatusOutcome::Synced
        }
    }

    /// A status check couldn't be completed. Unlock resending; the server
    /// still decides whether a resend is allowed.
    pub fn status_failed(&mut self) -> StatusOutcome {
        self.can_resend = true;
        StatusOutcome::FailedOpen
    }

    /// Start a resend. `None` means the request must not be sent: a forced
    /// resend during the cooldown, or another request still in flight.
    pub fn begin_resend(&mut self, force: bool) -> Option<ResendOtpRequest> {
        if force && !self.can_resend {
            tracing::debug!("Resend requested during cooldown, ignoring");
            return None;
        }
        if self.is_resending || self.is_loading {
            tracing::debug!("Resend requested while another request is in flight, ignoring");
            return None;
        }

        self.is_resending = true;
        Some(ResendOtpRequest {
            email: self.email.clone(),
            purpose: self.purpose,
            force,
        })
    }

    /// Apply the server's answer to a resend.
    pub fn finish_resend(&mut self, response: &ResendOtpResponse, now: Instant) -> Notice {
        self.is_resending = false;

        if !response.success {
            return Notice::ResendFailed(
                non_empty(response.message.clone()).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            );
        }

        let remaining = response.remaining_time;
        self.can_resend = false;
        if remaining == 0 {
            self.start_countdown(now, OTP_VALIDITY_SECS);
            return Notice::CodeSent;
        }

        self.start_countdown(now, remaining);
        if remaining < OTP_VALIDITY_SECS {
            Notice::StillValid {
                remaining_seconds: self.remaining_seconds,
            }
        } else {
            Notice::CodeSent
        }
    }

    /// The resend request didn't complete.
    pub fn resend_failed(&mut self) -> Notice {
        self.is_resending = false;
        Notice::ResendFailed(GENERIC_FAILURE.to_string())
    }

    /// Start a submit with whatever is in the boxes.
    pub fn begin_submit(&mut self) -> Result<VerifyOtpRequest, VerifyError> {
        if self.is_loading || self.is_resending {
            return Err(VerifyError::Busy);
        }
        let code = self.boxes.code().ok_or(VerifyError::Incomplete)?;

        self.is_loading = true;
        Ok(VerifyOtpRequest {
            email: self.email.clone(),
            code: code.into(),
            purpose: self.purpose,
        })
    }

    /// Apply the server's verdict on a submitted code.
    ///
    /// On success the session is reset; the caller is expected to tear it
    /// down and navigate away.
    pub fn finish_verify(&mut self, response: &VerifyOtpResponse) -> Result<(), VerifyError> {
        self.is_loading = false;

        if response.success {
            self.clear();
            Ok(())
        } else if response.is_expired == Some(true) {
            self.expire();
            Err(VerifyError::Expired)
        } else {
            Err(VerifyError::invalid_code(response.message.clone()))
        }
    }

    /// The verify request didn't complete.
    pub fn verify_failed(&mut self) -> VerifyError {
        self.is_loading = false;
        VerifyError::network()
    }

    /// Forget the entered code and any countdown
    pub fn clear(&mut self) {
        self.boxes.clear();
        self.countdown = None;
        self.remaining_seconds = 0;
        self.can_resend = true;
        self.is_loading = false;
        self.is_resending = false;
    }

    fn start_countdown(&mut self, now: Instant, seconds: u64) {
        let countdown = Countdown::start(now, seconds);
        self.remaining_seconds = countdown.remaining_seconds(now);
        self.countdown = Some(countdown);
    }

    fn expire(&mut self) {
        self.countdown = None;
        self.remaining_seconds = 0;
        self.can_resend = true;
    }
}
