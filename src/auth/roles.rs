// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Roles, permissions and the permission gate.
//!
//! The role table is fixed at compile time and never mutated. A role that is
//! not in the table has no permissions at all. Permissions are coarse
//! capability classes; which rows an action may touch is decided separately
//! by scoping every query with the tenant carried in the claims.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AuthError, Claims};

/// A coarse capability gating a class of actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Permission {
    #[serde(rename = "device:read")]
    DeviceRead,
    #[serde(rename = "device:write")]
    DeviceWrite,
    #[serde(rename = "task:run")]
    TaskRun,
    #[serde(rename = "report:read")]
    ReportRead,
    #[serde(rename = "patch:approve")]
    PatchApprove,
    #[serde(rename = "patch:deploy")]
    PatchDeploy,
    #[serde(rename = "audit:read")]
    AuditRead,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::DeviceRead,
        Permission::DeviceWrite,
        Permission::TaskRun,
        Permission::ReportRead,
        Permission::PatchApprove,
        Permission::PatchDeploy,
        Permission::AuditRead,
    ];

    /// Wire name, e.g. `device:write`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::DeviceRead => "device:read",
            Permission::DeviceWrite => "device:write",
            Permission::TaskRun => "task:run",
            Permission::ReportRead => "report:read",
            Permission::PatchApprove => "patch:approve",
            Permission::PatchDeploy => "patch:deploy",
            Permission::AuditRead => "audit:read",
        }
    }
}

impl FromStr for Permission {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles present in the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    Technician,
    Auditor,
    Viewer,
}

/// What a role is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Wildcard: every permission, including ones not listed in [`Permission`].
    All,
    Only(&'static [Permission]),
}

const NO_PERMISSIONS: Grant = Grant::Only(&[]);

impl Grant {
    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Grant::All => true,
            Grant::Only(set) => set.contains(&permission),
        }
    }

    /// String form of [`Grant::allows`]. Names outside the closed permission
    /// set are only allowed by the wildcard.
    pub fn allows_named(&self, permission: &str) -> bool {
        match self {
            Grant::All => true,
            Grant::Only(set) => set.iter().any(|p| p.as_str() == permission),
        }
    }
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::OrgAdmin,
        Role::Technician,
        Role::Auditor,
        Role::Viewer,
    ];

    /// Parse a role name exactly as it appears in tokens.
    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::OrgAdmin => "org_admin",
            Role::Technician => "technician",
            Role::Auditor => "auditor",
            Role::Viewer => "viewer",
        }
    }

    /// Entry of the permission table for this role.
    pub fn grant(&self) -> Grant {
        match self {
            Role::SuperAdmin => Grant::All,
            Role::OrgAdmin => Grant::Only(&[
                Permission::DeviceRead,
                Permission::DeviceWrite,
                Permission::TaskRun,
                Permission::ReportRead,
                Permission::PatchApprove,
            ]),
            Role::Technician => Grant::Only(&[
                Permission::DeviceRead,
                Permission::TaskRun,
                Permission::PatchDeploy,
            ]),
            Role::Auditor => Grant::Only(&[
                Permission::DeviceRead,
                Permission::ReportRead,
                Permission::AuditRead,
            ]),
            Role::Viewer => Grant::Only(&[Permission::DeviceRead, Permission::ReportRead]),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table lookup by role name; unknown names get nothing.
pub fn grant_for(role: &str) -> Grant {
    Role::parse(role).map(|r| r.grant()).unwrap_or(NO_PERMISSIONS)
}

/// Allow or deny a single permission for the verified claims.
pub fn check_permission(claims: &Claims, required: Permission) -> Result<(), AuthError> {
    if grant_for(&claims.role).allows(required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions {
            permission: required.as_str().to_string(),
        })
    }
}

/// Allow or deny a permission given by name.
pub fn check_named(claims: &Claims, required: &str) -> Result<(), AuthError> {
    if grant_for(&claims.role).allows_named(required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions {
            permission: required.to_string(),
        })
    }
}

/// Every permission must be granted. Stops at the first denial.
pub fn check_all(claims: &Claims, required: &[Permission]) -> Result<(), AuthError> {
    required
        .iter()
        .try_for_each(|permission| check_permission(claims, *permission))
}
