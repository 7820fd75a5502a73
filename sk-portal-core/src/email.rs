//! Email addresses

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationErrors};

/// A syntactically valid email address.
///
/// Surrounding whitespace is stripped before validation.
#[derive(Clone, Serialize, Deserialize, Validate, Eq, PartialEq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email {
    #[validate(email)]
    inner: String,
}

impl std::fmt::Debug for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Email").field(&self.inner).finish()
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Email {
    type Err = ValidationErrors;

    fn from_str(s: &str) -> Result<Self, ValidationErrors> {
        let email = Self {
            inner: s.trim().to_string(),
        };
        email.validate()?;
        Ok(email)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationErrors;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.inner
    }
}

impl Email {
    /// Get a string reference of this email address
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }
}
