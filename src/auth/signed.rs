// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed-channel authentication for device agents.
//!
//! Agents do not carry bearer tokens. Each request instead carries three
//! headers:
//!
//! - `X-Nonce`: opaque value, unique per request
//! - `X-Timestamp`: Unix seconds at signing time
//! - `X-Signature`: `hex(HMAC-SHA256(key, body || nonce || timestamp))`
//!
//! `body` is the raw payload exactly as received and the three parts are
//! concatenated without any delimiter. Requests more than
//! [`REPLAY_WINDOW_SECS`] away from the server clock are rejected even with a
//! valid signature. With nonce de-duplication enabled, a nonce can be used
//! once per window.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::nonce_cache::{NonceCache, NonceStatus};
use super::AuthError;
use crate::config::TrustConfig;

pub(crate) type HmacSha256 = Hmac<Sha256>;

pub const NONCE_HEADER: &str = "x-nonce";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Maximum allowed distance between the request timestamp and now.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Keyed MAC over `body || nonce || timestamp`.
pub(crate) fn request_mac(
    key: &HmacSha256,
    body: &[u8],
    nonce: &str,
    timestamp: &str,
) -> HmacSha256 {
    let mut mac = key.clone();
    mac.update(body);
    mac.update(nonce.as_bytes());
    mac.update(timestamp.as_bytes());
    mac
}

pub(crate) fn keyed_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

/// The integrity header triplet of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityHeaders {
    pub nonce: String,
    pub timestamp: String,
    pub signature: String,
}

impl IntegrityHeaders {
    /// Extract all three headers. An absent, empty or non-ASCII value counts
    /// as missing.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        match (get(NONCE_HEADER), get(TIMESTAMP_HEADER), get(SIGNATURE_HEADER)) {
            (Some(nonce), Some(timestamp), Some(signature)) => Ok(Self {
                nonce,
                timestamp,
                signature,
            }),
            _ => Err(AuthError::MissingIntegrityHeaders),
        }
    }
}

/// Facts about a request that passed the signed-channel check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRequest {
    pub nonce: String,
    pub timestamp: i64,
}

/// Verifies HMAC-signed agent requests.
pub struct SignedChannelAuthenticator {
    key: HmacSha256,
    nonces: Option<NonceCache>,
}

impl SignedChannelAuthenticator {
    pub fn new(config: &TrustConfig) -> Self {
        let nonces = config
            .nonce_dedup
            .then(|| NonceCache::new(config.nonce_cache_capacity, REPLAY_WINDOW_SECS));

        Self {
            key: keyed_mac(config.hmac_key.as_bytes()),
            nonces,
        }
    }

    /// Nonce cache, when de-duplication is enabled.
    pub fn nonce_cache(&self) -> Option<&NonceCache> {
        self.nonces.as_ref()
    }

    /// Hex signature for the given request parts.
    pub fn sign(&self, body: &[u8], nonce: &str, timestamp: &str) -> String {
        hex::encode(request_mac(&self.key, body, nonce, timestamp).finalize().into_bytes())
    }

    /// Authenticate a request against the current time.
    pub fn authenticate(&self, headers: &HeaderMap, body: &[u8]) -> Result<VerifiedRequest, AuthError> {
        self.authenticate_at(headers, body, Utc::now())
    }

    /// Authenticate a request as if the current time were `now`.
    pub fn authenticate_at(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<VerifiedRequest, AuthError> {
        let integrity = IntegrityHeaders::from_headers(headers)?;

        let timestamp: i64 = integrity
            .timestamp
            .parse()
            .map_err(|_| AuthError::InvalidTimestamp)?;

        let now = now.timestamp();
        if now.abs_diff(timestamp) > REPLAY_WINDOW_SECS as u64 {
            return Err(AuthError::TimestampOutsideWindow);
        }

        let supplied = hex::decode(&integrity.signature).map_err(|_| AuthError::SignatureMismatch)?;
        request_mac(&self.key, body, &integrity.nonce, &integrity.timestamp)
            .verify_slice(&supplied)
            .map_err(|_| AuthError::SignatureMismatch)?;

        // Only authentic requests reach the cache, so forged traffic cannot
        // burn nonces.
        if let Some(nonces) = &self.nonces {
            if nonces.check_and_insert(&integrity.nonce, timestamp, now) == NonceStatus::Replayed {
                return Err(AuthError::ReplayedNonce);
            }
        }

        Ok(VerifiedRequest {
            nonce: integrity.nonce,
            timestamp,
        })
    }
}

impl std::fmt::Debug for SignedChannelAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedChannelAuthenticator")
            .field("nonce_dedup", &self.nonces.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const SIGNING: &str = "0123456789abcdef0123456789abcdef";
    const HMAC_KEY: &str = "fedcba9876543210fedcba9876543210";
    const OTHER_HMAC_KEY: &str = "00000000000000000000000000000000";
    const T0: i64 = 1_700_000_000;

    fn authenticator(dedup: bool) -> SignedChannelAuthenticator {
        let config = TrustConfig::new(SIGNING, HMAC_KEY)
            .unwrap()
            .with_nonce_dedup(dedup);
        SignedChannelAuthenticator::new(&config)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn headers(nonce: &str, timestamp: &str, signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(NONCE_HEADER, HeaderValue::from_str(nonce).unwrap());
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(timestamp).unwrap());
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers
    }

    fn signed(auth: &SignedChannelAuthenticator, body: &[u8], nonce: &str, ts: &str) -> HeaderMap {
        headers(nonce, ts, &auth.sign(body, nonce, ts))
    }

    #[test]
    fn signature_matches_the_documented_construction() {
        let auth = authenticator(false);
        let mut mac = HmacSha256::new_from_slice(HMAC_KEY.as_bytes()).unwrap();
        mac.update(b"{}n11700000000");
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(auth.sign(b"{}", "n1", "1700000000"), expected);
    }

    #[test]
    fn correctly_signed_request_is_accepted() {
        let auth = authenticator(false);
        let headers = signed(&auth, b"{}", "n1", "1700000000");

        let verified = auth.authenticate_at(&headers, b"{}", at(T0)).unwrap();
        assert_eq!(verified.nonce, "n1");
        assert_eq!(verified.timestamp, T0);
    }

    #[test]
    fn drift_of_301_seconds_is_rejected() {
        let auth = authenticator(false);
        let headers = signed(&auth, b"{}", "n1", "1700000301");

        assert_eq!(
            auth.authenticate_at(&headers, b"{}", at(T0)),
            Err(AuthError::TimestampOutsideWindow)
        );
    }

    #[test]
    fn window_edges_are_inclusive_in_both_directions() {
        let auth = authenticator(false);

        let future = signed(&auth, b"{}", "n1", "1700000300");
        assert!(auth.authenticate_at(&future, b"{}", at(T0)).is_ok());

        let past = signed(&auth, b"{}", "n2", "1699999700");
        assert!(auth.authenticate_at(&past, b"{}", at(T0)).is_ok());

        let stale = signed(&auth, b"{}", "n3", "1699999699");
        assert_eq!(
            auth.authenticate_at(&stale, b"{}", at(T0)),
            Err(AuthError::TimestampOutsideWindow)
        );
    }

    #[test]
    fn tampered_body_is_rejected() {
        let auth = authenticator(false);
        let headers = signed(&auth, br#"{"cpu":"x86"}"#, "n1", "1700000000");

        assert_eq!(
            auth.authenticate_at(&headers, br#"{"cpu":"arm"}"#, at(T0)),
            Err(AuthError::SignatureMismatch)
        );
    }

    #[test]
    fn signature_from_another_key_is_rejected() {
        let other = SignedChannelAuthenticator::new(&TrustConfig::new(SIGNING, OTHER_HMAC_KEY).unwrap());
        let headers = signed(&other, b"{}", "n1", "1700000000");

        assert_eq!(
            authenticator(false).authenticate_at(&headers, b"{}", at(T0)),
            Err(AuthError::SignatureMismatch)
        );
    }

    #[test]
    fn delimited_signing_input_is_rejected() {
        let auth = authenticator(false);
        let mut mac = HmacSha256::new_from_slice(HMAC_KEY.as_bytes()).unwrap();
        mac.update(b"{}|n1|1700000000");
        let delimited = hex::encode(mac.finalize().into_bytes());

        assert_eq!(
            auth.authenticate_at(&headers("n1", "1700000000", &delimited), b"{}", at(T0)),
            Err(AuthError::SignatureMismatch)
        );
    }

    #[test]
    fn missing_or_empty_headers_are_rejected() {
        let auth = authenticator(false);
        let complete = signed(&auth, b"{}", "n1", "1700000000");

        for name in [NONCE_HEADER, TIMESTAMP_HEADER, SIGNATURE_HEADER] {
            let mut missing = complete.clone();
            missing.remove(name);
            assert_eq!(
                auth.authenticate_at(&missing, b"{}", at(T0)),
                Err(AuthError::MissingIntegrityHeaders),
                "{name}"
            );

            let mut empty = complete.clone();
            empty.insert(name, HeaderValue::from_static(""));
            assert_eq!(
                auth.authenticate_at(&empty, b"{}", at(T0)),
                Err(AuthError::MissingIntegrityHeaders),
                "{name}"
            );
        }
    }

    #[test]
    fn non_numeric_timestamp_is_rejected() {
        let auth = authenticator(false);
        for ts in ["soon", "1700000000.5", " 1700000000", "0x10"] {
            let headers = signed(&auth, b"{}", "n1", ts);
            assert_eq!(
                auth.authenticate_at(&headers, b"{}", at(T0)),
                Err(AuthError::InvalidTimestamp),
                "{ts}"
            );
        }
    }

    #[test]
    fn malformed_signature_is_a_mismatch() {
        let auth = authenticator(false);
        for sig in ["zz", "abc", "deadbeef"] {
            assert_eq!(
                auth.authenticate_at(&headers("n1", "1700000000", sig), b"{}", at(T0)),
                Err(AuthError::SignatureMismatch),
                "{sig}"
            );
        }
    }

    #[test]
    fn uppercase_hex_signature_is_accepted() {
        let auth = authenticator(false);
        let sig = auth.sign(b"{}", "n1", "1700000000").to_uppercase();

        assert!(auth
            .authenticate_at(&headers("n1", "1700000000", &sig), b"{}", at(T0))
            .is_ok());
    }

    #[test]
    fn authentication_is_deterministic_without_dedup() {
        let auth = authenticator(false);
        let headers = signed(&auth, b"payload", "n1", "1700000000");

        assert_eq!(auth.sign(b"payload", "n1", "1700000000"), auth.sign(b"payload", "n1", "1700000000"));
        for _ in 0..3 {
            assert!(auth.authenticate_at(&headers, b"payload", at(T0)).is_ok());
        }
    }

    #[test]
    fn replayed_nonce_is_rejected_with_dedup() {
        let auth = authenticator(true);
        let headers = signed(&auth, b"{}", "n1", "1700000000");

        assert!(auth.authenticate_at(&headers, b"{}", at(T0)).is_ok());
        assert_eq!(
            auth.authenticate_at(&headers, b"{}", at(T0 + 5)),
            Err(AuthError::ReplayedNonce)
        );
    }

    #[test]
    fn forged_requests_do_not_consume_nonces() {
        let auth = authenticator(true);
        let forged = headers("n1", "1700000000", &"00".repeat(32));
        assert_eq!(
            auth.authenticate_at(&forged, b"{}", at(T0)),
            Err(AuthError::SignatureMismatch)
        );

        let genuine = signed(&auth, b"{}", "n1", "1700000000");
        assert!(auth.authenticate_at(&genuine, b"{}", at(T0)).is_ok());
    }

    #[test]
    fn nonce_cache_follows_configuration() {
        assert!(authenticator(true).nonce_cache().is_some());
        assert!(authenticator(false).nonce_cache().is_none());
    }
}
