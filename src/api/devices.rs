// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{http::StatusCode, Extension, Json};
use uuid::Uuid;

use crate::auth::{perm, Require, VerifiedRequest};
use crate::models::{EnrollDeviceRequest, EnrollDeviceResponse};

/// Enroll a device into the caller's tenant.
///
/// Needs a bearer token granting `device:write` AND a valid body signature.
#[utoipa::path(
    post,
    path = "/v1/devices/enroll",
    tag = "Devices",
    request_body = EnrollDeviceRequest,
    params(
        ("X-Nonce" = String, Header, description = "Unique per request"),
        ("X-Timestamp" = String, Header, description = "Unix seconds at signing time"),
        ("X-Signature" = String, Header, description = "hex(HMAC-SHA256(body || nonce || timestamp))")
    ),
    responses(
        (status = 202, description = "Enrollment accepted", body = EnrollDeviceResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Permission denied or invalid signature")
    ),
    security(("bearer_auth" = []))
)]
pub async fn enroll(
    Require(claims, _): Require<perm::DeviceWrite>,
    Extension(verified): Extension<VerifiedRequest>,
    Json(request): Json<EnrollDeviceRequest>,
) -> (StatusCode, Json<EnrollDeviceResponse>) {
    let device_id = Uuid::new_v4();

    tracing::info!(
        device_id = %device_id,
        tenant_id = %claims.tenant_id,
        enrolled_by = %claims.subject,
        hostname = %request.hostname,
        os = %request.os,
        nonce = %verified.nonce,
        "Device enrollment accepted"
    );

    (
        StatusCode::ACCEPTED,
        Json(EnrollDeviceResponse {
            device_id,
            tenant_id: claims.tenant_id,
            enrolled_by: claims.subject,
            hostname: request.hostname,
        }),
    )
}
