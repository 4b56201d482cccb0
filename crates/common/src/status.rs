//! Status codes returned to the host process.
//!
//! The integer values are a contract with the host (the Kafka proxy plugin
//! interface) and must never be renumbered.

use std::fmt;

/// Closed set of outcomes reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AuthStatus {
    /// Credential accepted or token issued.
    Ok = 0,

    /// No credential was presented.
    EmptyCredential = 1,

    /// Credential is malformed, has a bad signature, or names an unknown key.
    InvalidCredential = 2,

    /// Credential was well-formed and signed but has expired.
    ExpiredCredential = 3,

    /// Credential is valid but fails issuer, audience, or scope policy.
    Unauthorized = 4,

    /// The component could not reach a decision (e.g. upstream unavailable).
    InternalError = 5,
}

impl AuthStatus {
    /// Integer value sent over the host contract.
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a status by its integer value.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::EmptyCredential),
            2 => Some(Self::InvalidCredential),
            3 => Some(Self::ExpiredCredential),
            4 => Some(Self::Unauthorized),
            5 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Bounded label for metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::EmptyCredential => "empty_credential",
            Self::InvalidCredential => "invalid_credential",
            Self::ExpiredCredential => "expired_credential",
            Self::Unauthorized => "unauthorized",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}
