// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Apply to a router subtree with `from_fn_with_state`:
//!
//! ```rust,ignore
//! let agent_routes = Router::new()
//!     .route("/agent/heartbeat", post(heartbeat))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         require_signed_request,
//!     ));
//! ```
//!
//! [`require_bearer`] verifies the token and stores [`Claims`] in the request
//! extensions. [`require_signed_request`] buffers the body, verifies the
//! integrity headers over it, then hands the same bytes to the handler and
//! stores a [`VerifiedRequest`] in the extensions.

use axum::{
    body::{self, Body},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::authenticate_and_audit;
use super::{AuthError, Claims, VerifiedRequest};
use crate::audit::{AuditEvent, AuditEventType};
use crate::state::AppState;

/// Reject the request unless it carries a valid bearer token.
pub async fn require_bearer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if request.extensions().get::<Claims>().is_some() {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    match authenticate_and_audit(request.headers(), &path, &state) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Reject the request unless its body is signed with the channel key.
///
/// Bodies larger than the configured limit cannot be verified and are
/// rejected.
pub async fn require_signed_request(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let bytes = match body::to_bytes(body, state.config.max_signed_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "Failed to buffer signed request body");
            return reject_signature(&state, &path, AuthError::UnreadableBody);
        }
    };

    match state.signed_channel.authenticate(&parts.headers, &bytes) {
        Ok(verified) => {
            state.publish(
                AuditEvent::new(AuditEventType::SignatureVerified)
                    .with_path(&path)
                    .with_detail(&verified.nonce),
            );
            parts.extensions.insert(verified);
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Err(err) => reject_signature(&state, &path, err),
    }
}

fn reject_signature(state: &AppState, path: &str, err: AuthError) -> Response {
    tracing::debug!(path, error = %err, "Signed request rejected");
    state.publish(
        AuditEvent::new(AuditEventType::SignatureRejected)
            .with_path(path)
            .with_detail(err.error_code()),
    );
    state.reject(err).into_response()
}
