// crates/datumplan-api/src/main.rs
// ============================================================================
// Module: Datum API Server
// Description: Development server binary for the Datum HTTP surface.
// Purpose: Load configuration, build state, and serve the router.
// Dependencies: axum, tokio, datumplan-api
// ============================================================================

//! ## Overview
//! Loads the TOML server configuration (path from the first argument,
//! defaulting to `datumplan.toml`), builds in-memory state, and serves the
//! API router. Production deployments are expected to wire durable stores
//! behind the same router.

#![allow(
    clippy::print_stderr,
    reason = "Startup diagnostics go to stderr before any sink exists."
)]

use std::process::ExitCode;

use datumplan_api::AppState;
use datumplan_api::ServerConfig;
use datumplan_api::router;

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "datumplan.toml".to_string());
    let text = match std::fs::read_to_string(&config_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("failed to read {config_path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let config = match ServerConfig::from_toml(&text) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("failed to bind {}: {err}", config.bind_addr);
            return ExitCode::FAILURE;
        }
    };

    let app = router(AppState::new(&config));
    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
