//! One-time passcodes and the six-box entry form they are typed into

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of digits in a one-time passcode.
pub const CODE_LENGTH: usize = 6;

/// A complete one-time passcode: exactly six ASCII digits.
#[derive(Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode {
    inner: String,
}

/// Why a string isn't a passcode
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeError {
    /// Not exactly six characters long
    #[error("expected {CODE_LENGTH} digits, got {0}")]
    WrongLength(usize),
    /// Contains a character that isn't 0-9
    #[error("only digits are allowed in a code")]
    NotNumeric,
}

impl std::fmt::Debug for OtpCode {
    // Codes end up in logs via `?request`, don't leak them there.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

impl FromStr for OtpCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, CodeError> {
        let len = s.chars().count();
        if len != CODE_LENGTH {
            return Err(CodeError::WrongLength(len));
        }
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(CodeError::NotNumeric);
        }
        Ok(Self {
            inner: s.to_string(),
        })
    }
}

impl TryFrom<String> for OtpCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.inner
    }
}

impl OtpCode {
    /// The digits as a string
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

/// A key press or clipboard event on the code entry form.
///
/// Events apply to the box that currently has focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxEvent {
    /// A character was typed
    Type(char),
    /// Backspace was pressed
    Backspace,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Text was pasted
    Paste(String),
    /// A box was clicked
    Focus(usize),
}

/// Six single-digit input boxes with a focus cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitBoxes {
    digits: [Option<char>; CODE_LENGTH],
    focus: usize,
}

impl DigitBoxes {
    /// Empty boxes, focus on the first one
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event. Returns whether anything (content or focus) changed.
    pub fn apply(&mut self, event: BoxEvent) -> bool {
        let before = self.clone();
        match event {
            BoxEvent::Type(c) => {
                if !c.is_ascii_digit() {
                    tracing::debug!(%c, "Rejected non-digit input");
                    return false;
                }
                self.digits[self.focus] = Some(c);
                self.focus = (self.focus + 1).min(CODE_LENGTH - 1);
            }
            BoxEvent::Backspace => {
                if self.digits[self.focus].is_some() {
                    self.digits[self.focus] = None;
                } else if self.focus > 0 {
                    self.focus -= 1;
                }
            }
            BoxEvent::Left => self.focus = self.focus.saturating_sub(1),
            BoxEvent::Right => self.focus = (self.focus + 1).min(CODE_LENGTH - 1),
            BoxEvent::Paste(text) => {
                let Ok(code) = text.trim().parse::<OtpCode>() else {
                    tracing::debug!("Ignored paste that isn't a {CODE_LENGTH} digit code");
                    return false;
                };
                for (slot, c) in self.digits.iter_mut().zip(code.as_str().chars()) {
                    *slot = Some(c);
                }
                self.focus = CODE_LENGTH - 1;
            }
            BoxEvent::Focus(index) => {
                if index < CODE_LENGTH {
                    self.focus = index;
                }
            }
        }
        *self != before
    }

    /// The box that has focus, zero-based
    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Contents of every box
    pub fn digits(&self) -> &[Option<char>; CODE_LENGTH] {
        &self.digits
    }

    /// The entered code, if every box is filled
    pub fn code(&self) -> Option<OtpCode> {
        let code: Option<String> = self.digits.iter().copied().collect();
        code.and_then(|c| c.parse().ok())
    }

    /// Empty all boxes and focus the first one
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
