// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::audit::{AuditEvent, AuditEventType};
use crate::auth::{claims::DEFAULT_ROLE, token::TOKEN_TTL, Auth};
use crate::error::ApiError;
use crate::models::{DevTokenRequest, SessionResponse, TokenResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/v1/session",
    tag = "Session",
    responses(
        (status = 200, description = "Verified identity of the caller", body = SessionResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn current_session(Auth(claims): Auth) -> Json<SessionResponse> {
    Json(claims.into())
}

/// Issue a token for any subject. Routed only in development.
#[utoipa::path(
    post,
    path = "/v1/auth/dev-token",
    tag = "Session",
    request_body = DevTokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Empty subject or tenant")
    )
)]
pub async fn issue_dev_token(
    State(state): State<AppState>,
    Json(request): Json<DevTokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let role = request.role.as_deref().unwrap_or(DEFAULT_ROLE);
    let access_token = state
        .token_authority
        .issue(&request.subject, &request.tenant_id, role)?;

    tracing::warn!(
        subject = %request.subject,
        tenant_id = %request.tenant_id,
        role,
        "Issued development token"
    );
    state.publish(
        AuditEvent::new(AuditEventType::TokenIssued)
            .with_identity(&request.subject, &request.tenant_id)
            .with_path("/v1/auth/dev-token")
            .with_detail(role),
    );

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: TOKEN_TTL.num_seconds(),
    }))
}
