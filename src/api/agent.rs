// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{http::StatusCode, Extension, Json};

use crate::auth::VerifiedRequest;
use crate::models::HeartbeatRequest;

/// Agent check-in over the signed channel.
///
/// Reached only through `require_signed_request`, so the body has already
/// been authenticated.
#[utoipa::path(
    post,
    path = "/v1/agent/heartbeat",
    tag = "Agent",
    request_body = HeartbeatRequest,
    params(
        ("X-Nonce" = String, Header, description = "Unique per request"),
        ("X-Timestamp" = String, Header, description = "Unix seconds at signing time"),
        ("X-Signature" = String, Header, description = "hex(HMAC-SHA256(body || nonce || timestamp))")
    ),
    responses(
        (status = 204, description = "Heartbeat accepted"),
        (status = 403, description = "Missing, stale, replayed or invalid signature")
    )
)]
pub async fn heartbeat(
    Extension(verified): Extension<VerifiedRequest>,
    Json(request): Json<HeartbeatRequest>,
) -> StatusCode {
    tracing::info!(
        device_id = %request.device_id,
        hostname = %request.hostname,
        agent_version = request.agent_version.as_deref(),
        nonce = %verified.nonce,
        "Agent heartbeat"
    );

    StatusCode::NO_CONTENT
}
