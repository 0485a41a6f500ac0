// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token authority: issues and verifies signed identity tokens.
//!
//! Tokens are compact JWTs signed with a shared HMAC key. Verification checks,
//! in order, the algorithm and signature, the issuer, the audience and finally
//! the validity window `[iat, exp)` against the caller's clock with no
//! leeway.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::{AuthError, Claims};
use crate::config::TrustConfig;

/// Fixed token lifetime.
pub const TOKEN_TTL: Duration = Duration::hours(1);

/// Errors raised while issuing a token.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("subject must not be empty")]
    EmptySubject,

    #[error("tenant_id must not be empty")]
    EmptyTenant,

    #[error("failed to sign token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies identity tokens.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    validation: Validation,
}

impl TokenAuthority {
    pub fn new(config: &TrustConfig) -> Self {
        let key = config.signing_key.as_bytes();

        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        // The window is checked in `verify_at` so it can run against an
        // explicit clock and treat `exp` as exclusive.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            algorithm: config.algorithm,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            validation,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Issue a token valid for [`TOKEN_TTL`] from now.
    pub fn issue(&self, subject: &str, tenant_id: &str, role: &str) -> Result<String, IssueError> {
        self.issue_at(subject, tenant_id, role, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        subject: &str,
        tenant_id: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<String, IssueError> {
        if subject.trim().is_empty() {
            return Err(IssueError::EmptySubject);
        }
        if tenant_id.trim().is_empty() {
            return Err(IssueError::EmptyTenant);
        }

        let issued_at = now.timestamp();
        let claims = Claims {
            subject: subject.to_string(),
            tenant_id: tenant_id.to_string(),
            role: role.to_string(),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            issued_at,
            expires_at: issued_at + TOKEN_TTL.num_seconds(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;

        tracing::debug!(
            subject = %claims.subject,
            tenant_id = %claims.tenant_id,
            role = %claims.role,
            expires_at = claims.expires_at,
            "Issued identity token"
        );

        Ok(token)
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(map_decode_error)?;

        let claims = token_data.claims;
        let now = now.timestamp();

        if now < claims.issued_at {
            return Err(AuthError::TokenNotYetValid);
        }
        if now >= claims.expires_at {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm => AuthError::InvalidAlgorithm,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::MalformedToken(err.to_string()),
    }
}
