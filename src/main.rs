// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use attestation_oracle::{
    api::router,
    config::{OracleConfig, LOG_FORMAT_ENV},
    state::AppState,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn watch_signals(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match OracleConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(config = ?config, "Configuration loaded");

    let state = match AppState::bootstrap(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    if state.degraded.is_empty() {
        tracing::info!("All components ready");
    } else {
        for reason in state.degraded.iter() {
            tracing::warn!(reason = %reason, "Running degraded");
        }
    }

    let app = router(state);

    let addr = config.bind_address();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %addr, "Attestation oracle listening (docs at /docs)");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Attestation oracle stopped");
    ExitCode::SUCCESS
}
