// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{grant_for, Claims, Permission};

/// The verified identity of the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SessionResponse {
    pub subject: String,
    pub tenant_id: String,
    pub role: String,
    /// Permissions granted by `role`; empty for unknown roles.
    pub permissions: Vec<Permission>,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds, exclusive.
    pub expires_at: i64,
}

impl From<Claims> for SessionResponse {
    fn from(claims: Claims) -> Self {
        let grant = grant_for(&claims.role);
        let permissions = Permission::ALL
            .into_iter()
            .filter(|p| grant.allows(*p))
            .collect();

        Self {
            subject: claims.subject,
            tenant_id: claims.tenant_id,
            role: claims.role,
            permissions,
            issued_at: claims.issued_at,
            expires_at: claims.expires_at,
        }
    }
}

/// Periodic check-in from a device agent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeartbeatRequest {
    pub device_id: String,
    pub hostname: String,
    #[serde(default)]
    pub agent_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollDeviceRequest {
    pub hostname: String,
    pub os: String,
    #[serde(default)]
    pub serial_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollDeviceResponse {
    pub device_id: Uuid,
    /// Tenant taken from the caller's token, never from the body.
    pub tenant_id: String,
    pub enrolled_by: String,
    pub hostname: String,
}

/// Development-only token request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DevTokenRequest {
    pub subject: String,
    pub tenant_id: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}
