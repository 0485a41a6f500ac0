// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified identity claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Role assumed when a token carries no `role` claim.
pub const DEFAULT_ROLE: &str = "viewer";

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// Claims carried by an identity token.
///
/// Produced by the token authority and consumed by the permission gate for
/// the duration of a single request. `tenant_id` scopes every downstream
/// query; `role` may name a role outside the permission table, in which case
/// the token is valid but grants nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Subject (user or enrolled device ID)
    #[serde(rename = "sub")]
    pub subject: String,

    /// Tenant scope
    pub tenant_id: String,

    /// Role name
    #[serde(default = "default_role")]
    pub role: String,

    /// Issuer
    #[serde(rename = "iss")]
    pub issuer: String,

    /// Audience
    #[serde(rename = "aud")]
    pub audience: String,

    /// Issued at (Unix timestamp)
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Expiration (Unix timestamp, exclusive)
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl Claims {
    /// Typed role, if the role is in the permission table.
    pub fn known_role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    /// Whether `now` (Unix seconds) falls inside `[iat, exp)`.
    pub fn is_within_window(&self, now: i64) -> bool {
        self.issued_at <= now && now < self.expires_at
    }

    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.issued_at, 0)
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}
