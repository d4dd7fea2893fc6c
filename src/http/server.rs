//! HTTP listener.
//!
//! # Responsibilities
//! - Bind the configured address and report the bound port
//! - Serve the route table on a background task
//! - Stop accepting on request and drain in-flight requests
//!
//! # Draining
//! `stop` closes the accept loop immediately. Requests already in flight may
//! finish for up to `drain_timeout`. When the deadline passes the serve task
//! is aborted and [`ServerError::DrainTimeout`] is returned; requests still
//! running are then bounded only by the per-request timeout layer and end at
//! the latest when the runtime shuts down on process exit.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::ListenerConfig;
use crate::lifecycle::Shutdown;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The server loop failed.
    #[error("Server error: {0}")]
    Serve(#[from] io::Error),

    /// Connections were still open when the drain deadline passed.
    #[error("Connections still open after {}ms drain", .0.as_millis())]
    DrainTimeout(Duration),
}

/// A bound, not yet serving, HTTP listener.
pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    drain_timeout: Duration,
}

impl HttpServer {
    /// Bind to the configured address. Port zero picks an ephemeral port.
    pub async fn bind(config: &ListenerConfig, drain_timeout: Duration) -> Result<Self, ServerError> {
        let address = format!("{}:{}", config.bind_address, config.port);
        let bind_err = |source| ServerError::Bind {
            address: address.clone(),
            source,
        };

        let listener = TcpListener::bind((config.bind_address.as_str(), config.port))
            .await
            .map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self {
            listener,
            local_addr,
            drain_timeout,
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start serving `routes` in the background.
    pub fn serve(self, routes: Router) -> RunningServer {
        let shutdown = Shutdown::new();
        let mut stop_rx = shutdown.subscribe();
        let local_addr = self.local_addr;

        let handle = tokio::spawn(async move {
            tracing::info!(address = %local_addr, "HTTP server starting");
            axum::serve(self.listener, routes)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.recv().await;
                })
                .await?;
            tracing::info!("HTTP server stopped");
            Ok::<(), io::Error>(())
        });

        RunningServer {
            local_addr,
            shutdown,
            handle,
            drain_timeout: self.drain_timeout,
        }
    }
}

/// Handle on a serving listener.
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<io::Result<()>>,
    drain_timeout: Duration,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn bound_port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn stop(self) -> Result<(), ServerError> {
        let mut handle = self.handle;
        self.shutdown.trigger();

        match time::timeout(self.drain_timeout, &mut handle).await {
            Ok(Ok(result)) => result.map_err(ServerError::Serve),
            Ok(Err(join_err)) => Err(ServerError::Serve(io::Error::new(
                io::ErrorKind::Other,
                join_err,
            ))),
            Err(_) => {
                handle.abort();
                Err(ServerError::DrainTimeout(self.drain_timeout))
            }
        }
    }
}
