// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for bearer-token callers.
//!
//! Use [`Auth`] to require a valid token and [`Require`] to also require a
//! permission:
//!
//! ```rust,ignore
//! async fn enroll(Require(claims, ..): Require<perm::DeviceWrite>) -> impl IntoResponse {
//!     // claims.tenant_id scopes every query
//! }
//! ```

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{check_permission, revalidate, AuthError, Claims, Permission, Rejection};
use crate::audit::{AuditEvent, AuditEventType};
use crate::state::AppState;

/// Token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Verify the bearer token and, when a directory is installed, re-validate
/// the subject.
pub(crate) fn authenticate_bearer(headers: &HeaderMap, state: &AppState) -> Result<Claims, AuthError> {
    let token = bearer_token(headers)?;
    let claims = state.token_authority.verify(token)?;

    match &state.directory {
        Some(directory) => revalidate(claims, directory.as_ref()),
        None => Ok(claims),
    }
}

/// Authenticate, publish the outcome and map failures to a rejection.
pub(crate) fn authenticate_and_audit(
    headers: &HeaderMap,
    path: &str,
    state: &AppState,
) -> Result<Claims, Rejection> {
    match authenticate_bearer(headers, state) {
        Ok(claims) => {
            state.publish(
                AuditEvent::new(AuditEventType::AuthSuccess)
                    .with_identity(&claims.subject, &claims.tenant_id)
                    .with_path(path),
            );
            Ok(claims)
        }
        Err(err) => {
            tracing::debug!(path, error = %err, "Bearer authentication failed");
            state.publish(
                AuditEvent::new(AuditEventType::AuthFailure)
                    .with_path(path)
                    .with_detail(err.error_code()),
            );
            Err(state.reject(err))
        }
    }
}

/// Extractor for verified token claims.
///
/// Claims already placed in the request extensions by
/// [`require_bearer`](super::require_bearer) are reused; otherwise the
/// `Authorization` header is verified here and the claims are cached in the
/// extensions for later extractors.
#[derive(Debug, Clone)]
pub struct Auth(pub Claims);

impl FromRequestParts<AppState> for Auth {
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already verified the token
        if let Some(claims) = parts.extensions.get::<Claims>().cloned() {
            return Ok(Auth(claims));
        }

        let claims = authenticate_and_audit(&parts.headers, parts.uri.path(), state)?;
        parts.extensions.insert(claims.clone());

        Ok(Auth(claims))
    }
}

/// A permission that can be demanded at the type level.
pub trait RequiredPermission {
    const PERMISSION: Permission;
}

macro_rules! permission_markers {
    ($($name:ident => $permission:ident),* $(,)?) => {
        $(
            #[doc = concat!("Requires `", stringify!($permission), "`.")]
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl super::RequiredPermission for $name {
                const PERMISSION: Permission = Permission::$permission;
            }
        )*
    };
}

/// Marker types for [`Require`].
pub mod perm {
    use super::Permission;

    permission_markers! {
        DeviceRead => DeviceRead,
        DeviceWrite => DeviceWrite,
        TaskRun => TaskRun,
        ReportRead => ReportRead,
        PatchApprove => PatchApprove,
        PatchDeploy => PatchDeploy,
        AuditRead => AuditRead,
    }
}

/// Extractor that requires a valid token whose role grants `P`.
pub struct Require<P>(pub Claims, pub PhantomData<P>);

impl<P> Require<P> {
    pub fn into_claims(self) -> Claims {
        self.0
    }
}

impl<P> std::fmt::Debug for Require<P>
where
    P: RequiredPermission,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Require")
            .field("permission", &P::PERMISSION)
            .field("claims", &self.0)
            .finish()
    }
}

impl<P> FromRequestParts<AppState> for Require<P>
where
    P: RequiredPermission + Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(claims) = Auth::from_request_parts(parts, state).await?;

        if let Err(err) = check_permission(&claims, P::PERMISSION) {
            state.publish(
                AuditEvent::new(AuditEventType::PermissionDenied)
                    .with_identity(&claims.subject, &claims.tenant_id)
                    .with_path(parts.uri.path())
                    .with_detail(P::PERMISSION.as_str()),
            );
            return Err(state.reject(err));
        }

        Ok(Require(claims, PhantomData))
    }
}
