// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment exactly once at startup and
//! turned into immutable values that are handed to the components that need
//! them. Nothing in the request path reads the environment.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SHARED_SECRET` | Token signing key (at least 32 bytes) | Required |
//! | `HMAC_SHARED_SECRET` | Signed-channel key (at least 32 bytes) | Required |
//! | `JWT_ISSUER` | Issued and expected `iss` claim | `uem-identity` |
//! | `JWT_AUDIENCE` | Issued and expected `aud` claim | `uem-api` |
//! | `JWT_ALGORITHM` | `HS256`, `HS384` or `HS512` | `HS256` |
//! | `ENV` | `development` enables detailed rejection messages | production |
//! | `NONCE_DEDUP` | Reject nonces already seen inside the replay window | `true` |
//! | `NONCE_CACHE_CAPACITY` | Maximum number of remembered nonces | `100000` |
//! | `MAX_SIGNED_BODY_BYTES` | Largest body buffered for signature checks | `1048576` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate and key; both enable HTTPS | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use jsonwebtoken::Algorithm;

pub const JWT_SHARED_SECRET_ENV: &str = "JWT_SHARED_SECRET";
pub const HMAC_SHARED_SECRET_ENV: &str = "HMAC_SHARED_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_AUDIENCE_ENV: &str = "JWT_AUDIENCE";
pub const JWT_ALGORITHM_ENV: &str = "JWT_ALGORITHM";
pub const DEPLOYMENT_MODE_ENV: &str = "ENV";
pub const NONCE_DEDUP_ENV: &str = "NONCE_DEDUP";
pub const NONCE_CACHE_CAPACITY_ENV: &str = "NONCE_CACHE_CAPACITY";
pub const MAX_SIGNED_BODY_BYTES_ENV: &str = "MAX_SIGNED_BODY_BYTES";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Minimum length, in bytes, of both shared secrets.
pub const MIN_KEY_LEN: usize = 32;

pub const DEFAULT_ISSUER: &str = "uem-identity";
pub const DEFAULT_AUDIENCE: &str = "uem-api";
pub const DEFAULT_NONCE_CACHE_CAPACITY: usize = 100_000;
pub const DEFAULT_MAX_SIGNED_BODY_BYTES: usize = 1024 * 1024;

/// Configuration errors. Any of these stops the process before it serves
/// traffic.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} must be at least {min} bytes (got {actual})")]
    KeyTooShort {
        name: &'static str,
        min: usize,
        actual: usize,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("unsupported token algorithm '{0}' (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),

    #[error("{name} has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Deployment mode. Only governs how much detail rejections expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    Development,
    #[default]
    Production,
}

impl DeploymentMode {
    /// `development` (case-insensitive) is development; every other value is
    /// production.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            DeploymentMode::Development
        } else {
            DeploymentMode::Production
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, DeploymentMode::Development)
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Development => write!(f, "development"),
            DeploymentMode::Production => write!(f, "production"),
        }
    }
}

/// Shared secret bytes. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    /// Wrap a key, enforcing [`MIN_KEY_LEN`].
    pub fn new(name: &'static str, bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_KEY_LEN {
            return Err(ConfigError::KeyTooShort {
                name,
                min: MIN_KEY_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes redacted>)", self.0.len())
    }
}

/// Immutable trust-layer configuration shared by every component.
#[derive(Debug, Clone)]
pub struct TrustConfig {
    /// Key used to sign and verify identity tokens.
    pub signing_key: SecretKey,
    /// Pre-shared key for the signed channel.
    pub hmac_key: SecretKey,
    /// Issuer written into and required from tokens.
    pub issuer: String,
    /// Audience written into and required from tokens.
    pub audience: String,
    /// Token signing algorithm (HMAC family only).
    pub algorithm: Algorithm,
    /// Deployment mode, controls rejection verbosity.
    pub mode: DeploymentMode,
    /// Whether signed requests are de-duplicated by nonce.
    pub nonce_dedup: bool,
    /// Capacity of the nonce cache.
    pub nonce_cache_capacity: usize,
    /// Largest request body buffered for signature verification.
    pub max_signed_body_bytes: usize,
}

impl TrustConfig {
    /// Build a configuration from two keys, using defaults for everything
    /// else.
    pub fn new(
        signing_key: impl Into<Vec<u8>>,
        hmac_key: impl Into<Vec<u8>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            signing_key: SecretKey::new(JWT_SHARED_SECRET_ENV, signing_key)?,
            hmac_key: SecretKey::new(HMAC_SHARED_SECRET_ENV, hmac_key)?,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            algorithm: Algorithm::HS256,
            mode: DeploymentMode::Production,
            nonce_dedup: true,
            nonce_cache_capacity: DEFAULT_NONCE_CACHE_CAPACITY,
            max_signed_body_bytes: DEFAULT_MAX_SIGNED_BODY_BYTES,
        })
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_key = lookup(JWT_SHARED_SECRET_ENV)
            .ok_or(ConfigError::Missing(JWT_SHARED_SECRET_ENV))?;
        let hmac_key =
            lookup(HMAC_SHARED_SECRET_ENV).ok_or(ConfigError::Missing(HMAC_SHARED_SECRET_ENV))?;

        let mut config = Self::new(signing_key, hmac_key)?;

        if let Some(issuer) = lookup(JWT_ISSUER_ENV) {
            config = config.with_issuer(issuer)?;
        }
        if let Some(audience) = lookup(JWT_AUDIENCE_ENV) {
            config = config.with_audience(audience)?;
        }
        if let Some(algorithm) = lookup(JWT_ALGORITHM_ENV) {
            config.algorithm = parse_algorithm(&algorithm)?;
        }
        if let Some(mode) = lookup(DEPLOYMENT_MODE_ENV) {
            config.mode = DeploymentMode::parse(&mode);
        }
        if let Some(value) = lookup(NONCE_DEDUP_ENV) {
            config.nonce_dedup = parse_bool(NONCE_DEDUP_ENV, &value)?;
        }
        if let Some(value) = lookup(NONCE_CACHE_CAPACITY_ENV) {
            config.nonce_cache_capacity = parse_positive(NONCE_CACHE_CAPACITY_ENV, &value)?;
        }
        if let Some(value) = lookup(MAX_SIGNED_BODY_BYTES_ENV) {
            config.max_signed_body_bytes = parse_positive(MAX_SIGNED_BODY_BYTES_ENV, &value)?;
        }

        Ok(config)
    }

    /// Set the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Result<Self, ConfigError> {
        let issuer = issuer.into();
        if issuer.trim().is_empty() {
            return Err(ConfigError::Empty(JWT_ISSUER_ENV));
        }
        self.issuer = issuer;
        Ok(self)
    }

    /// Set the audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Result<Self, ConfigError> {
        let audience = audience.into();
        if audience.trim().is_empty() {
            return Err(ConfigError::Empty(JWT_AUDIENCE_ENV));
        }
        self.audience = audience;
        Ok(self)
    }

    /// Set the deployment mode.
    pub fn with_mode(mut self, mode: DeploymentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable nonce de-duplication.
    pub fn with_nonce_dedup(mut self, enabled: bool) -> Self {
        self.nonce_dedup = enabled;
        self
    }
}

/// Parse a token algorithm name, accepting only the HMAC family.
pub fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(ConfigError::UnsupportedAlgorithm(value.to_string())),
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Listener settings for the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Certificate and key paths; HTTPS when present.
    pub tls: Option<(PathBuf, PathBuf)>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup(PORT_ENV) {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: PORT_ENV,
                value,
            })?,
            None => 8080,
        };

        let addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: HOST_ENV,
                    value: host.clone(),
                })?;

        let tls = match (lookup(TLS_CERT_PATH_ENV), lookup(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            addr,
            tls,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SIGNING: &str = "0123456789abcdef0123456789abcdef";
    const HMAC: &str = "fedcba9876543210fedcba9876543210";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let config = TrustConfig::from_lookup(lookup_from(&[
            (JWT_SHARED_SECRET_ENV, SIGNING),
            (HMAC_SHARED_SECRET_ENV, HMAC),
        ]))
        .unwrap();

        assert_eq!(config.issuer, DEFAULT_ISSUER);
        assert_eq!(config.audience, DEFAULT_AUDIENCE);
        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.mode, DeploymentMode::Production);
        assert!(config.nonce_dedup);
        assert_eq!(config.nonce_cache_capacity, DEFAULT_NONCE_CACHE_CAPACITY);
    }

    #[test]
    fn missing_signing_key_is_fatal() {
        let err = TrustConfig::from_lookup(lookup_from(&[(HMAC_SHARED_SECRET_ENV, HMAC)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(JWT_SHARED_SECRET_ENV)));
    }

    #[test]
    fn missing_hmac_key_is_fatal() {
        let err = TrustConfig::from_lookup(lookup_from(&[(JWT_SHARED_SECRET_ENV, SIGNING)]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(HMAC_SHARED_SECRET_ENV)));
    }

    #[test]
    fn short_keys_are_rejected() {
        let err = TrustConfig::new("too-short", HMAC).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::KeyTooShort {
                name: JWT_SHARED_SECRET_ENV,
                actual: 9,
                ..
            }
        ));

        let err = TrustConfig::new(SIGNING, "").unwrap_err();
        assert!(matches!(err, ConfigError::KeyTooShort { actual: 0, .. }));
    }

    #[test]
    fn asymmetric_algorithms_are_rejected() {
        assert!(matches!(
            parse_algorithm("RS256"),
            Err(ConfigError::UnsupportedAlgorithm(_))
        ));
        assert_eq!(parse_algorithm("hs512").unwrap(), Algorithm::HS512);
    }

    #[test]
    fn only_development_enables_verbose_mode() {
        assert_eq!(DeploymentMode::parse("development"), DeploymentMode::Development);
        assert_eq!(DeploymentMode::parse("Development"), DeploymentMode::Development);
        assert_eq!(DeploymentMode::parse("staging"), DeploymentMode::Production);
        assert_eq!(DeploymentMode::parse(""), DeploymentMode::Production);
    }

    #[test]
    fn overrides_are_applied() {
        let config = TrustConfig::from_lookup(lookup_from(&[
            (JWT_SHARED_SECRET_ENV, SIGNING),
            (HMAC_SHARED_SECRET_ENV, HMAC),
            (JWT_ISSUER_ENV, "issuer-x"),
            (JWT_AUDIENCE_ENV, "aud-y"),
            (JWT_ALGORITHM_ENV, "HS384"),
            (DEPLOYMENT_MODE_ENV, "development"),
            (NONCE_DEDUP_ENV, "false"),
            (NONCE_CACHE_CAPACITY_ENV, "64"),
        ]))
        .unwrap();

        assert_eq!(config.issuer, "issuer-x");
        assert_eq!(config.audience, "aud-y");
        assert_eq!(config.algorithm, Algorithm::HS384);
        assert!(config.mode.is_development());
        assert!(!config.nonce_dedup);
        assert_eq!(config.nonce_cache_capacity, 64);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = TrustConfig::from_lookup(lookup_from(&[
            (JWT_SHARED_SECRET_ENV, SIGNING),
            (HMAC_SHARED_SECRET_ENV, HMAC),
            (NONCE_CACHE_CAPACITY_ENV, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn empty_issuer_is_rejected() {
        let err = TrustConfig::new(SIGNING, HMAC)
            .unwrap()
            .with_issuer("  ")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Empty(JWT_ISSUER_ENV)));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let config = TrustConfig::new(SIGNING, HMAC).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(SIGNING));
        assert!(!rendered.contains(HMAC));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn server_config_defaults_to_plain_http() {
        let server = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(server.addr.port(), 8080);
        assert!(server.tls.is_none());
        assert_eq!(server.log_format, LogFormat::Pretty);
    }

    #[test]
    fn server_config_requires_both_tls_paths() {
        let err = ServerConfig::from_lookup(lookup_from(&[(TLS_CERT_PATH_ENV, "/tmp/cert.pem")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(TLS_KEY_PATH_ENV)));
    }
}
