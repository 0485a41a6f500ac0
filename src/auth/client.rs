// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller-side helpers for agents and services talking to a gated endpoint.
//!
//! ```rust,ignore
//! let signer = RequestSigner::new(config.hmac_key.as_bytes());
//! let integrity = signer.sign(&body);
//! integrity.apply_to(request.headers_mut())?;
//! ```

use axum::http::{header::InvalidHeaderValue, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use hmac::Mac;
use serde::Deserialize;
use uuid::Uuid;

use super::signed::{
    keyed_mac, request_mac, HmacSha256, IntegrityHeaders, NONCE_HEADER, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};

/// Produces the integrity header triplet for outgoing requests.
#[derive(Clone)]
pub struct RequestSigner {
    key: HmacSha256,
}

impl RequestSigner {
    pub fn new(hmac_key: &[u8]) -> Self {
        Self {
            key: keyed_mac(hmac_key),
        }
    }

    /// Sign `body` with a fresh random nonce and the current time.
    pub fn sign(&self, body: &[u8]) -> IntegrityHeaders {
        let nonce = Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().timestamp().to_string();
        self.sign_with(body, &nonce, &timestamp)
    }

    /// Sign `body` with an explicit nonce and timestamp.
    pub fn sign_with(&self, body: &[u8], nonce: &str, timestamp: &str) -> IntegrityHeaders {
        let signature = hex::encode(
            request_mac(&self.key, body, nonce, timestamp)
                .finalize()
                .into_bytes(),
        );

        IntegrityHeaders {
            nonce: nonce.to_string(),
            timestamp: timestamp.to_string(),
            signature,
        }
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}

impl IntegrityHeaders {
    /// Write the triplet into a header map.
    pub fn apply_to(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        headers.insert(NONCE_HEADER, HeaderValue::from_str(&self.nonce)?);
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(&self.timestamp)?);
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&self.signature)?);
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ExpiryOnly {
    exp: i64,
}

/// Read `exp` from a token WITHOUT verifying it.
///
/// Only for deciding when to fetch a new token; never for trust decisions.
pub fn unverified_expiry(token: &str) -> Option<DateTime<Utc>> {
    let data = jsonwebtoken::dangerous::insecure_decode::<ExpiryOnly>(token).ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}

/// Whether a held token should be replaced: it is unreadable or expires
/// within `leeway` of `now`.
pub fn needs_refresh(token: &str, leeway: Duration, now: DateTime<Utc>) -> bool {
    match unverified_expiry(token) {
        Some(expires_at) => expires_at - now <= leeway,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SignedChannelAuthenticator, TokenAuthority};
    use crate::config::TrustConfig;

    const SIGNING: &str = "0123456789abcdef0123456789abcdef";
    const HMAC_KEY: &str = "fedcba9876543210fedcba9876543210";

    fn config() -> TrustConfig {
        TrustConfig::new(SIGNING, HMAC_KEY).unwrap()
    }

    #[test]
    fn signed_headers_pass_the_authenticator() {
        let signer = RequestSigner::new(HMAC_KEY.as_bytes());
        let body = br#"{"hostname":"lab-01"}"#;

        let mut headers = HeaderMap::new();
        signer.sign(body).apply_to(&mut headers).unwrap();

        let authenticator = SignedChannelAuthenticator::new(&config());
        assert!(authenticator.authenticate(&headers, body).is_ok());
    }

    #[test]
    fn explicit_parts_match_the_server_signature() {
        let signer = RequestSigner::new(HMAC_KEY.as_bytes());
        let authenticator = SignedChannelAuthenticator::new(&config());

        let integrity = signer.sign_with(b"{}", "n1", "1700000000");
        assert_eq!(integrity.signature, authenticator.sign(b"{}", "n1", "1700000000"));
    }

    #[test]
    fn every_signature_gets_a_new_nonce() {
        let signer = RequestSigner::new(HMAC_KEY.as_bytes());
        let a = signer.sign(b"{}");
        let b = signer.sign(b"{}");
        assert_ne!(a.nonce, b.nonce);
        assert_eq!(a.nonce.len(), 32);
    }

    #[test]
    fn refresh_is_due_near_expiry() {
        let authority = TokenAuthority::new(&config());
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = authority.issue_at("device-1", "t1", "technician", t0).unwrap();

        assert_eq!(
            unverified_expiry(&token),
            DateTime::from_timestamp(1_700_003_600, 0)
        );
        assert!(!needs_refresh(&token, Duration::minutes(5), t0));
        assert!(needs_refresh(&token, Duration::minutes(5), t0 + Duration::minutes(56)));
    }

    #[test]
    fn unreadable_token_needs_refresh() {
        assert!(unverified_expiry("garbage").is_none());
        assert!(needs_refresh("garbage", Duration::zero(), Utc::now()));
    }
}
