//! JWT header utilities shared by the verifier and its host adapter.
//!
//! This module provides:
//! - Size limits for DoS prevention
//! - Header decoding (algorithm and key ID) without signature verification
//! - The credential shape check used to route between JWT and password modes
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing here verifies a signature; decoded header values are only
//!   hints for key lookup and algorithm gating
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_header, looks_like_jwt};
//!
//! if looks_like_jwt(secret) {
//!     let header = decode_header(secret)?;
//!     let kid = header.kid()?;
//! }
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Entra ID access tokens with group claims are
/// typically 1-3KB, so 8KB leaves headroom without inviting abuse.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Prefix every compact-serialized JWT starts with.
///
/// `eyJ` is the base64url encoding of `{"`, the start of the JOSE header.
pub const JWT_HEADER_PREFIX: &str = "eyJ";

/// Number of `.` delimiters in a compact-serialized JWS.
const JWT_DELIMITER_COUNT: usize = 2;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a JWT header.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,
}

// =============================================================================
// Header Types
// =============================================================================

/// Unverified JOSE header of a compact JWT.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Declared signature algorithm (e.g. `RS256`).
    pub alg: String,

    /// Key ID used to select the verification key.
    #[serde(default)]
    pub kid: Option<String>,

    /// Token type, usually `JWT`.
    #[serde(default)]
    pub typ: Option<String>,
}

impl TokenHeader {
    /// Return the key ID, rejecting missing or empty values.
    ///
    /// # Errors
    ///
    /// Returns `JwtValidationError::MissingKid` when the header carries no
    /// usable `kid`.
    pub fn kid(&self) -> Result<&str, JwtValidationError> {
        self.kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(JwtValidationError::MissingKid)
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Decide whether a credential has the shape of a compact JWT.
///
/// A credential is routed to JWT verification only when it starts with
/// [`JWT_HEADER_PREFIX`] AND contains exactly two `.` delimiters. The prefix
/// alone is not enough: `eyJ` followed by zero or one delimiter is treated as
/// a plain password.
#[must_use]
pub fn looks_like_jwt(credential: &str) -> bool {
    credential.starts_with(JWT_HEADER_PREFIX)
        && credential.matches('.').count() == JWT_DELIMITER_COUNT
}

/// Decode the JOSE header of a JWT without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The returned values must only be used to select a key from a trusted key set
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Wrong number of segments, bad base64, or invalid header JSON
pub fn decode_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != JWT_DELIMITER_COUNT + 1 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })
}

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// # Errors
///
/// Returns the errors of [`decode_header`], plus `MissingKid` when the header
/// has no non-empty string `kid`.
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    let header = decode_header(token)?;
    header.kid().map(ToString::to_string)
}

// =============================================================================
// Tests
// =============================================================================
