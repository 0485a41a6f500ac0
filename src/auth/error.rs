// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Every rejection produced by the trust layer is an [`AuthError`]. Each
//! variant belongs to exactly one [`ErrorClass`]: `Unauthorized` (401) when
//! identity could not be established, `Forbidden` (403) when identity is known
//! but the action or request is not allowed.
//!
//! The HTTP representation is a [`Rejection`], which decides how much of the
//! cause to reveal. In production every rejection in a class renders the
//! same fixed message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Generic message for every token failure in production.
pub const GENERIC_UNAUTHORIZED: &str = "Invalid token";
/// Generic message for permission failures.
pub const GENERIC_PERMISSION_DENIED: &str = "Permission denied";
/// Generic message for every signed-channel failure in production.
pub const GENERIC_SIGNATURE_REJECTED: &str = "invalid request signature";

/// The two rejection classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Unauthorized,
    Forbidden,
}

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token could not be decoded; carries the decoder's message
    MalformedToken(String),
    /// Token was signed with an algorithm other than the configured one
    InvalidAlgorithm,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token issuer is invalid
    InvalidIssuer,
    /// Token audience is invalid
    InvalidAudience,
    /// Token is not yet valid
    TokenNotYetValid,
    /// Subject is no longer known to the directory
    UnknownSubject,
    /// Subject's tenant no longer matches the token
    TenantMismatch,
    /// Role lacks the required permission
    InsufficientPermissions { permission: String },
    /// One of `X-Nonce`, `X-Timestamp`, `X-Signature` is absent
    MissingIntegrityHeaders,
    /// `X-Timestamp` is not an integer
    InvalidTimestamp,
    /// `X-Timestamp` is further than the replay window from now
    TimestampOutsideWindow,
    /// Supplied signature does not match the computed one
    SignatureMismatch,
    /// Nonce already used inside the replay window
    ReplayedNonce,
    /// Signed body could not be read or exceeds the configured limit
    UnreadableBody,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Which of the two rejection classes this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken(_)
            | AuthError::InvalidAlgorithm
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::InvalidIssuer
            | AuthError::InvalidAudience
            | AuthError::TokenNotYetValid
            | AuthError::UnknownSubject
            | AuthError::TenantMismatch => ErrorClass::Unauthorized,
            AuthError::InsufficientPermissions { .. }
            | AuthError::MissingIntegrityHeaders
            | AuthError::InvalidTimestamp
            | AuthError::TimestampOutsideWindow
            | AuthError::SignatureMismatch
            | AuthError::ReplayedNonce
            | AuthError::UnreadableBody => ErrorClass::Forbidden,
        }
    }

    /// Whether this error comes from the signed channel.
    pub fn is_signature_failure(&self) -> bool {
        matches!(
            self,
            AuthError::MissingIntegrityHeaders
                | AuthError::InvalidTimestamp
                | AuthError::TimestampOutsideWindow
                | AuthError::SignatureMismatch
                | AuthError::ReplayedNonce
                | AuthError::UnreadableBody
        )
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::InvalidAlgorithm => "invalid_algorithm",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::UnknownSubject => "unknown_subject",
            AuthError::TenantMismatch => "tenant_mismatch",
            AuthError::InsufficientPermissions { .. } => "insufficient_permissions",
            AuthError::MissingIntegrityHeaders => "missing_integrity_headers",
            AuthError::InvalidTimestamp => "invalid_timestamp",
            AuthError::TimestampOutsideWindow => "timestamp_outside_window",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::ReplayedNonce => "replayed_nonce",
            AuthError::UnreadableBody => "unreadable_body",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.class() {
            ErrorClass::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorClass::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// The fixed message shown for this error outside development.
    pub fn generic_message(&self) -> &'static str {
        match self.class() {
            ErrorClass::Unauthorized => GENERIC_UNAUTHORIZED,
            ErrorClass::Forbidden if self.is_signature_failure() => GENERIC_SIGNATURE_REJECTED,
            ErrorClass::Forbidden => GENERIC_PERMISSION_DENIED,
        }
    }

    /// The error code shown outside development.
    pub fn generic_code(&self) -> &'static str {
        match self.class() {
            ErrorClass::Unauthorized => "unauthorized",
            ErrorClass::Forbidden if self.is_signature_failure() => "invalid_request_signature",
            ErrorClass::Forbidden => "forbidden",
        }
    }

    /// Wrap into an HTTP rejection, revealing detail only when `verbose`.
    pub fn into_rejection(self, verbose: bool) -> Rejection {
        Rejection {
            error: self,
            verbose,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken(cause) => write!(f, "Token is malformed: {cause}"),
            AuthError::InvalidAlgorithm => write!(f, "Token algorithm is not accepted"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "Token audience is invalid"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::UnknownSubject => write!(f, "Token subject is no longer known"),
            AuthError::TenantMismatch => write!(f, "Token tenant does not match the subject"),
            AuthError::InsufficientPermissions { permission } => {
                write!(f, "Insufficient permissions: '{permission}' is required")
            }
            AuthError::MissingIntegrityHeaders => write!(f, "missing required integrity headers"),
            AuthError::InvalidTimestamp => write!(f, "timestamp is not a valid integer"),
            AuthError::TimestampOutsideWindow => write!(f, "timestamp outside window"),
            AuthError::SignatureMismatch => write!(f, "signature mismatch"),
            AuthError::ReplayedNonce => write!(f, "nonce has already been used"),
            AuthError::UnreadableBody => write!(f, "request body could not be read for verification"),
        }
    }
}

impl std::error::Error for AuthError {}

/// HTTP rejection produced by the extractors and middleware.
#[derive(Debug)]
pub struct Rejection {
    pub error: AuthError,
    pub verbose: bool,
}

impl Rejection {
    /// Message that will be sent to the client.
    pub fn message(&self) -> String {
        if self.verbose {
            self.error.to_string()
        } else {
            self.error.generic_message().to_string()
        }
    }

    /// Error code that will be sent to the client.
    pub fn code(&self) -> &'static str {
        if self.verbose {
            self.error.error_code()
        } else {
            self.error.generic_code()
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = Json(AuthErrorBody {
            error: self.message(),
            error_code: self.code().to_string(),
        });
        (status, body).into_response()
    }
}
