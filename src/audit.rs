// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit events for authentication and authorization outcomes.
//!
//! Publishing is fire-and-forget: a sink must never block or fail the
//! request it describes, and no trust decision depends on it.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tracing target used by [`TracingAuditSink`].
pub const AUDIT_TARGET: &str = "uem_trust::audit";

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    TokenIssued,
    AuthSuccess,
    AuthFailure,
    PermissionDenied,
    SignatureVerified,
    SignatureRejected,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::TokenIssued => "token_issued",
            AuditEventType::AuthSuccess => "auth_success",
            AuditEventType::AuthFailure => "auth_failure",
            AuditEventType::PermissionDenied => "permission_denied",
            AuditEventType::SignatureVerified => "signature_verified",
            AuditEventType::SignatureRejected => "signature_rejected",
        }
    }
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Subject the event concerns (if known).
    pub subject: Option<String>,
    /// Tenant the event concerns (if known).
    pub tenant_id: Option<String>,
    /// Request path.
    pub path: Option<String>,
    /// Machine-readable cause, e.g. an error code or a permission.
    pub detail: Option<String>,
    /// Whether the operation succeeded.
    pub success: bool,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        let success = matches!(
            event_type,
            AuditEventType::TokenIssued
                | AuditEventType::AuthSuccess
                | AuditEventType::SignatureVerified
        );

        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            subject: None,
            tenant_id: None,
            path: None,
            detail: None,
            success,
        }
    }

    /// Set subject and tenant.
    pub fn with_identity(mut self, subject: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Set the request path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn publish(&self, event: AuditEvent);
}

/// Writes audit events as structured tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn publish(&self, event: AuditEvent) {
        let event_type = event.event_type.as_str();

        if event.success {
            tracing::info!(
                target: AUDIT_TARGET,
                event_id = %event.event_id,
                event_type,
                subject = event.subject.as_deref(),
                tenant_id = event.tenant_id.as_deref(),
                path = event.path.as_deref(),
                detail = event.detail.as_deref(),
                "audit"
            );
        } else {
            tracing::warn!(
                target: AUDIT_TARGET,
                event_id = %event.event_id,
                event_type,
                subject = event.subject.as_deref(),
                tenant_id = event.tenant_id.as_deref(),
                path = event.path.as_deref(),
                detail = event.detail.as_deref(),
                "audit"
            );
        }
    }
}

/// Keeps events in memory for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

#[cfg(test)]
impl MemoryAuditSink {
    pub(crate) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn types(&self) -> Vec<AuditEventType> {
        self.events().into_iter().map(|e| e.event_type).collect()
    }
}

#[cfg(test)]
impl AuditSink for MemoryAuditSink {
    fn publish(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}
