// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Nonce replay cache status ("ok" or "saturated").
    /// Only present when nonce de-duplication is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce_cache: Option<NonceCacheStatus>,
}

/// Occupancy of the nonce replay cache.
#[derive(Debug, Serialize, ToSchema)]
pub struct NonceCacheStatus {
    pub status: String,
    pub entries: usize,
    pub capacity: usize,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// A full cache still works but evicts live nonces, so it is reported
/// without failing the probe.
fn check_nonce_cache(state: &AppState) -> Option<NonceCacheStatus> {
    let cache = state.signed_channel.nonce_cache()?;
    let entries = cache.len();
    let capacity = cache.capacity();

    Some(NonceCacheStatus {
        status: if entries >= capacity { "saturated" } else { "ok" }.to_string(),
        entries,
        capacity,
    })
}

/// Health check endpoint handler.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let nonce_cache = check_nonce_cache(&state);
    let saturated = nonce_cache
        .as_ref()
        .map(|c| c.status != "ok")
        .unwrap_or(false);

    let response = ReadyResponse {
        status: if saturated { "degraded" } else { "ok" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            nonce_cache,
        },
    };

    (StatusCode::OK, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Configuration is validated before the listener binds, so a running
/// process is ready.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
