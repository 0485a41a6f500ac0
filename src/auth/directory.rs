// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Re-validation of token claims against the current subject records.
//!
//! Tokens are self-contained, so a role change or a removed user would
//! otherwise only take effect after the token expires. When a directory is
//! installed, every verified token is checked against it: unknown subjects
//! and tenant mismatches are rejected and the directory's current role
//! replaces the role in the token.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{AuthError, Claims};

/// Current state of a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRecord {
    pub tenant_id: String,
    pub role: String,
}

/// Keyed lookup of subjects by ID.
pub trait SubjectDirectory: Send + Sync {
    fn lookup_subject(&self, subject: &str) -> Option<SubjectRecord>;
}

/// Directory kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    subjects: RwLock<HashMap<String, SubjectRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, subject: impl Into<String>, tenant_id: impl Into<String>, role: impl Into<String>) {
        let record = SubjectRecord {
            tenant_id: tenant_id.into(),
            role: role.into(),
        };
        if let Ok(mut subjects) = self.subjects.write() {
            subjects.insert(subject.into(), record);
        }
    }

    pub fn remove(&self, subject: &str) -> Option<SubjectRecord> {
        self.subjects.write().ok()?.remove(subject)
    }
}

impl SubjectDirectory for InMemoryDirectory {
    fn lookup_subject(&self, subject: &str) -> Option<SubjectRecord> {
        self.subjects.read().ok()?.get(subject).cloned()
    }
}

/// Check claims against the directory and refresh the role.
pub fn revalidate(mut claims: Claims, directory: &dyn SubjectDirectory) -> Result<Claims, AuthError> {
    let record = directory
        .lookup_subject(&claims.subject)
        .ok_or(AuthError::UnknownSubject)?;

    if record.tenant_id != claims.tenant_id {
        return Err(AuthError::TenantMismatch);
    }

    if record.role != claims.role {
        tracing::debug!(
            subject = %claims.subject,
            token_role = %claims.role,
            current_role = %record.role,
            "Replacing token role with current directory role"
        );
        claims.role = record.role;
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims {
            subject: "u1".into(),
            tenant_id: "t1".into(),
            role: role.into(),
            issuer: "uem-identity".into(),
            audience: "uem-api".into(),
            issued_at: 1_700_000_000,
            expires_at: 1_700_003_600,
        }
    }

    #[test]
    fn unchanged_subject_passes_through() {
        let directory = InMemoryDirectory::new();
        directory.upsert("u1", "t1", "org_admin");

        assert_eq!(revalidate(claims("org_admin"), &directory).unwrap(), claims("org_admin"));
    }

    #[test]
    fn demotion_applies_immediately() {
        let directory = InMemoryDirectory::new();
        directory.upsert("u1", "t1", "viewer");

        let refreshed = revalidate(claims("org_admin"), &directory).unwrap();
        assert_eq!(refreshed.role, "viewer");
    }

    #[test]
    fn removed_subject_is_rejected() {
        let directory = InMemoryDirectory::new();
        directory.upsert("u1", "t1", "viewer");
        directory.remove("u1");

        assert_eq!(
            revalidate(claims("viewer"), &directory),
            Err(AuthError::UnknownSubject)
        );
    }

    #[test]
    fn tenant_move_is_rejected() {
        let directory = InMemoryDirectory::new();
        directory.upsert("u1", "t2", "viewer");

        assert_eq!(
            revalidate(claims("viewer"), &directory),
            Err(AuthError::TenantMismatch)
        );
    }
}
