//! `seccd` — run the SECC session engine against a single network
//! interface.
//!
//! Usage: `seccd [interface]`, defaulting to
//! [`StationConfig::DEFAULT_INTERFACE`].

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::error;

use secc_core::config::StationConfig;
use secc_core::server;

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let interface = std::env::args()
        .nth(1)
        .unwrap_or_else(|| StationConfig::DEFAULT_INTERFACE.to_string());
    let config = StationConfig::new(interface);

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_handler.store(true, Ordering::Relaxed);
    }) {
        error!(error = %e, "failed to install SIGINT handler");
        return ExitCode::FAILURE;
    }

    match server::run(config, shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "seccd exiting on startup-fatal error");
            ExitCode::FAILURE
        }
    }
}
