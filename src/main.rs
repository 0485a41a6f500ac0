// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uem_trust::{
    api::router,
    config::{LogFormat, ServerConfig, TrustConfig},
    janitor::NonceJanitor,
    state::AppState,
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    // Bind nothing until the configuration is known to be valid
    let server_config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            tracing::error!(error = %e, "Invalid server configuration");
            std::process::exit(1);
        }
    };
    init_tracing(server_config.log_format);

    let trust_config = match TrustConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid trust configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(
        issuer = %trust_config.issuer,
        audience = %trust_config.audience,
        algorithm = ?trust_config.algorithm,
        mode = ?trust_config.mode,
        nonce_dedup = trust_config.nonce_dedup,
        "Trust configuration loaded"
    );

    let state = AppState::new(trust_config);
    let shutdown = CancellationToken::new();
    let janitor = tokio::spawn(
        NonceJanitor::new(Arc::clone(&state.signed_channel)).run(shutdown.clone()),
    );

    let app = router(state);
    let addr = server_config.addr;

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    let shutdown_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_token.cancel();
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    let served = match &server_config.tls {
        Some((cert_path, key_path)) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            if rustls::crypto::ring::default_provider().install_default().is_err() {
                tracing::debug!("rustls crypto provider already installed");
            }

            let tls_config = match RustlsConfig::from_pem_file(cert_path, key_path).await {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        cert_path = %cert_path.display(),
                        key_path = %key_path.display(),
                        "Failed to load TLS certificates"
                    );
                    std::process::exit(1);
                }
            };

            tracing::info!(%addr, "UEM trust server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            tracing::info!(%addr, "UEM trust server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    shutdown.cancel();
    if let Err(e) = janitor.await {
        tracing::warn!(error = %e, "Nonce janitor task failed");
    }

    if let Err(e) = served {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}
