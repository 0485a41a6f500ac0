// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Nonce Janitor
//!
//! Background task that drops expired entries from the signed-channel nonce
//! cache. Expired entries are harmless but occupy capacity, so sweeping them
//! keeps LRU eviction reserved for genuine overflow.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::SignedChannelAuthenticator;

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically purges expired nonces.
pub struct NonceJanitor {
    signed_channel: Arc<SignedChannelAuthenticator>,
    sweep_interval: Duration,
}

impl NonceJanitor {
    pub fn new(signed_channel: Arc<SignedChannelAuthenticator>) -> Self {
        Self {
            signed_channel,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Run until the cancellation token is triggered. Returns at once when
    /// nonce de-duplication is disabled.
    ///
    /// ```rust,ignore
    /// tokio::spawn(janitor.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        if self.signed_channel.nonce_cache().is_none() {
            debug!("Nonce de-duplication disabled, janitor not started");
            return;
        }

        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Nonce janitor starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Nonce janitor shutting down");
                    return;
                }
            }

            self.sweep();
        }
    }

    /// Purge once; returns the number of entries dropped.
    pub fn sweep(&self) -> usize {
        let Some(cache) = self.signed_channel.nonce_cache() else {
            return 0;
        };

        let purged = cache.purge_expired(Utc::now().timestamp());
        if purged > 0 {
            debug!(purged, remaining = cache.len(), "Purged expired nonces");
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrustConfig;

    fn authenticator(dedup: bool) -> Arc<SignedChannelAuthenticator> {
        let config = TrustConfig::new(
            "0123456789abcdef0123456789abcdef",
            "fedcba9876543210fedcba9876543210",
        )
        .unwrap()
        .with_nonce_dedup(dedup);
        Arc::new(SignedChannelAuthenticator::new(&config))
    }

    #[test]
    fn sweep_drops_only_expired_nonces() {
        let signed_channel = authenticator(true);
        let cache = signed_channel.nonce_cache().unwrap();
        let now = Utc::now().timestamp();
        cache.check_and_insert("stale", now - 1_000, now - 1_000);
        cache.check_and_insert("live", now, now);

        let janitor = NonceJanitor::new(Arc::clone(&signed_channel));
        assert_eq!(janitor.sweep(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sweep_without_cache_is_a_no_op() {
        let janitor = NonceJanitor::new(authenticator(false));
        assert_eq!(janitor.sweep(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let shutdown = CancellationToken::new();
        let janitor = NonceJanitor::new(authenticator(true)).with_interval(Duration::from_millis(10));
        let handle = tokio::spawn(janitor.run(shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
