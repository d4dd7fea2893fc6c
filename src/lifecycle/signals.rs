//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGTERM and SIGINT
//! - Translate the first one into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Repeated signals while shutting down are logged and ignored; the
//!   registration is withdrawn exactly once

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Resolve when the process receives SIGINT or SIGTERM.
pub async fn termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Signal received"),
    }
}

/// Trigger `shutdown` on the first termination signal.
///
/// The task keeps listening afterwards so later signals do not fall through
/// to the default handler and kill the process mid-unpublish.
pub fn forward_signals(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        termination().await;
        shutdown.trigger();

        loop {
            termination().await;
            tracing::warn!("Shutdown already in progress, ignoring signal");
        }
    })
}
