// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_signed_request, Permission},
    models::{
        DevTokenRequest, EnrollDeviceRequest, EnrollDeviceResponse, HeartbeatRequest,
        SessionResponse, TokenResponse,
    },
    state::AppState,
};

pub mod agent;
pub mod devices;
pub mod health;
pub mod session;

pub fn router(state: AppState) -> Router {
    let signed_routes = Router::new()
        .route("/agent/heartbeat", post(agent::heartbeat))
        .route("/devices/enroll", post(devices::enroll))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_signed_request,
        ));

    let mut v1_routes = Router::new()
        .route("/session", get(session::current_session))
        .merge(signed_routes);

    if state.config.mode.is_development() {
        tracing::warn!("Development mode: /v1/auth/dev-token is enabled");
        v1_routes = v1_routes.route("/auth/dev-token", post(session::issue_dev_token));
    }

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        session::current_session,
        session::issue_dev_token,
        agent::heartbeat,
        devices::enroll
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::NonceCacheStatus,
            health::HealthResponse,
            Permission,
            SessionResponse,
            HeartbeatRequest,
            EnrollDeviceRequest,
            EnrollDeviceResponse,
            DevTokenRequest,
            TokenResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Session", description = "Bearer token identity"),
        (name = "Agent", description = "Signed-channel agent endpoints"),
        (name = "Devices", description = "Device lifecycle")
    )
)]
struct ApiDoc;
