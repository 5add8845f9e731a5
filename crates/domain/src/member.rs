//! Organization member identity.

use std::fmt::{Display, Formatter};

use orgsync_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Maximum accepted email length (RFC 5321 path limit).
const EMAIL_MAX_LENGTH: usize = 254;

/// Validated, lower-cased email address.
///
/// Members and invitations are matched by this value, so comparisons are
/// case-insensitive and ignore surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs structural validation only: exactly one `@`, non-empty local
    /// part and a domain containing at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let trimmed = value.into().trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        };

        if domain.contains('@') {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > EMAIL_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "email address must not exceed {EMAIL_MAX_LENGTH} characters"
            )));
        }

        Ok(Self(trimmed))
    }

    /// Returns the normalized email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns whether a raw email from the API denotes this address.
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case(self.0.as_str())
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl Display for EmailAddress {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}
