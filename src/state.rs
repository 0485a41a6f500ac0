// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::auth::{AuthError, Rejection, SignedChannelAuthenticator, SubjectDirectory, TokenAuthority};
use crate::config::TrustConfig;

/// Shared, read-only trust components handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TrustConfig>,
    pub token_authority: Arc<TokenAuthority>,
    pub signed_channel: Arc<SignedChannelAuthenticator>,
    pub audit: Arc<dyn AuditSink>,
    /// Subject re-validation, when installed.
    pub directory: Option<Arc<dyn SubjectDirectory>>,
}

impl AppState {
    pub fn new(config: TrustConfig) -> Self {
        Self {
            token_authority: Arc::new(TokenAuthority::new(&config)),
            signed_channel: Arc::new(SignedChannelAuthenticator::new(&config)),
            config: Arc::new(config),
            audit: Arc::new(TracingAuditSink),
            directory: None,
        }
    }

    /// Replace the audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Re-validate every verified token against `directory`.
    pub fn with_directory(mut self, directory: Arc<dyn SubjectDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Whether rejections may reveal the specific cause.
    pub fn verbose(&self) -> bool {
        self.config.mode.is_development()
    }

    pub fn reject(&self, error: AuthError) -> Rejection {
        error.into_rejection(self.verbose())
    }

    pub fn publish(&self, event: AuditEvent) {
        self.audit.publish(event);
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("signed_channel", &self.signed_channel)
            .field("directory", &self.directory.is_some())
            .finish_non_exhaustive()
    }
}
