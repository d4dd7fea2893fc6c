//! Registration lifecycle.
//!
//! # Phases
//! ```text
//! Created → ServerStarting → ServerListening → Publishing → Published
//!                 │                                 │            │
//!                 ▼                                 ▼            │
//!           ServerFailed                      PublishFailed      │
//!           (terminal)                   (serving, unregistered) │
//!                                                   │            │
//!                                                   ▼            ▼
//!                                      [Unpublishing, if registered] → Stopped
//! ```
//!
//! # Failure Policy
//! - Bind failure is fatal
//! - Exactly one publish attempt; failure leaves the service serving
//! - Unpublish failure is logged; the listener is stopped regardless
//! - Listener stop failure is logged; `Stopped` is reached regardless

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{broadcast, watch};

use crate::config::ServiceConfig;
use crate::discovery::{DiscoveryBackend, RecordFilter, RegistrationId, ServiceRecord};
use crate::http::{build_router, AppState, HttpServer, RunningServer, ServerError, ServiceInfo};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Orchestrator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Created,
    ServerStarting,
    ServerListening,
    ServerFailed,
    Publishing,
    Published,
    PublishFailed,
    Unpublishing,
    Stopped,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::ServerStarting => "server_starting",
            Phase::ServerListening => "server_listening",
            Phase::ServerFailed => "server_failed",
            Phase::Publishing => "publishing",
            Phase::Published => "published",
            Phase::PublishFailed => "publish_failed",
            Phase::Unpublishing => "unpublishing",
            Phase::Stopped => "stopped",
        }
    }

    /// Serving requests, registered or not.
    pub fn is_serving(&self) -> bool {
        matches!(
            self,
            Phase::ServerListening | Phase::Publishing | Phase::Published | Phase::PublishFailed
        )
    }

    fn gauge_value(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleStatus {
    pub phase: Phase,
    /// Bound listener address once listening.
    pub local_addr: Option<SocketAddr>,
    /// Whether a registration is currently held.
    pub registered: bool,
}

/// Errors that abort the lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("HTTP listener failed to start: {0}")]
    Server(#[from] ServerError),

    #[error("Start requested while {0}")]
    AlreadyStarted(Phase),
}

/// Sequences listener startup, publication, and orderly withdrawal.
///
/// Owns the backend client and the registration id; request handlers only
/// receive a read-only [`ServiceInfo`].
pub struct Orchestrator {
    config: ServiceConfig,
    record: ServiceRecord,
    backend: Arc<dyn DiscoveryBackend>,
    registration: Option<RegistrationId>,
    server: Option<RunningServer>,
    status: watch::Sender<LifecycleStatus>,
    shutdown: Shutdown,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Orchestrator {
    pub fn new(config: ServiceConfig, backend: Arc<dyn DiscoveryBackend>) -> Self {
        let record = ServiceRecord::from_config(&config.record);
        let (status, _) = watch::channel(LifecycleStatus {
            phase: Phase::Created,
            local_addr: None,
            registered: false,
        });
        let shutdown = Shutdown::new();
        let shutdown_rx = shutdown.subscribe();

        Self {
            config,
            record,
            backend,
            registration: None,
            server: None,
            status,
            shutdown,
            shutdown_rx,
        }
    }

    pub fn phase(&self) -> Phase {
        self.status.borrow().phase
    }

    /// Watch phase transitions.
    pub fn status(&self) -> watch::Receiver<LifecycleStatus> {
        self.status.subscribe()
    }

    /// Handle that triggers [`run`](Self::run)'s shutdown sequence.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Record as configured (before any bound-port substitution).
    pub fn record(&self) -> &ServiceRecord {
        &self.record
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    fn transition(&self, phase: Phase) {
        self.status.send_modify(|status| status.phase = phase);
        metrics::record_phase(phase.gauge_value());
        tracing::info!(phase = %phase, "Lifecycle transition");
    }

    fn set_registration(&mut self, registration: Option<RegistrationId>) {
        let registered = registration.is_some();
        self.registration = registration;
        self.status.send_modify(|status| status.registered = registered);
    }

    /// Record that goes to the backend.
    fn advertised_record(&self, bound_port: u16) -> ServiceRecord {
        if self.config.record.advertise_bound_port {
            self.record.with_port(bound_port)
        } else {
            self.record.clone()
        }
    }

    /// Bind and serve, then make the single publish attempt.
    ///
    /// Returns the bound address. Only a listener failure is an error; a
    /// failed publish leaves the orchestrator in [`Phase::PublishFailed`].
    pub async fn start(&mut self) -> Result<SocketAddr, LifecycleError> {
        let phase = self.phase();
        if phase != Phase::Created {
            return Err(LifecycleError::AlreadyStarted(phase));
        }

        self.transition(Phase::ServerStarting);
        let drain = Duration::from_secs(self.config.shutdown.drain_timeout_secs);
        let server = match HttpServer::bind(&self.config.listener, drain).await {
            Ok(server) => server,
            Err(e) => {
                tracing::error!(phase = %Phase::ServerStarting, error = %e, "Listener failed to start");
                self.transition(Phase::ServerFailed);
                return Err(e.into());
            }
        };

        let local_addr = server.local_addr();
        let advertised = self.advertised_record(local_addr.port());
        let state = AppState {
            service: Arc::new(ServiceInfo::new(&advertised, local_addr.port())),
        };
        let routes = build_router(state, &self.config.listener, &self.config.timeouts);
        self.server = Some(server.serve(routes));
        self.status.send_modify(|status| status.local_addr = Some(local_addr));
        tracing::info!(
            address = %local_addr,
            advertised_port = advertised.port(),
            root = %advertised.root(),
            "Listening"
        );
        self.transition(Phase::ServerListening);

        self.publish(&advertised).await;

        if self.config.discovery.scan_on_startup {
            self.scan().await;
        }

        Ok(local_addr)
    }

    async fn publish(&mut self, record: &ServiceRecord) {
        self.transition(Phase::Publishing);
        let backend = self.backend.kind();
        let started = Instant::now();

        match self.backend.publish(record).await {
            Ok(registration) => {
                metrics::record_discovery_operation(backend, "publish", "ok", started);
                tracing::info!(
                    registration = %registration,
                    name = %record.name(),
                    endpoint = %record.endpoint(),
                    backend,
                    "Service published"
                );
                self.set_registration(Some(registration));
                self.transition(Phase::Published);
            }
            Err(e) => {
                metrics::record_discovery_operation(backend, "publish", e.kind(), started);
                tracing::error!(
                    phase = %Phase::Publishing,
                    error = %e,
                    backend,
                    "Not able to publish the service, serving unregistered"
                );
                self.transition(Phase::PublishFailed);
            }
        }
    }

    /// Log every record the backend knows about.
    async fn scan(&self) {
        let backend = self.backend.kind();
        let started = Instant::now();

        match self.backend.query(&RecordFilter::All).await {
            Ok(records) => {
                metrics::record_discovery_operation(backend, "query", "ok", started);
                tracing::info!(count = records.len(), backend, "Discovered services");
                for found in &records {
                    tracing::debug!(
                        name = %found.record.name(),
                        endpoint = %found.record.endpoint(),
                        registration = %found.registration,
                        "Discovered service"
                    );
                }
            }
            Err(e) => {
                metrics::record_discovery_operation(backend, "query", e.kind(), started);
                tracing::warn!(error = %e, backend, "Unable to discover services");
            }
        }
    }

    /// Withdraw the registration if one is held, then stop the listener.
    ///
    /// Always ends in [`Phase::Stopped`]. Calling it again afterwards is a
    /// no-op.
    pub async fn shutdown(&mut self) -> Phase {
        let phase = self.phase();
        if matches!(phase, Phase::Unpublishing | Phase::Stopped) {
            tracing::debug!(phase = %phase, "Shutdown already in progress");
            return phase;
        }

        if let Some(registration) = self.registration.clone() {
            self.transition(Phase::Unpublishing);
            let backend = self.backend.kind();
            let started = Instant::now();

            match self.backend.unpublish(&registration).await {
                Ok(()) => {
                    metrics::record_discovery_operation(backend, "unpublish", "ok", started);
                    tracing::info!(registration = %registration, "Service unpublished");
                    self.set_registration(None);
                }
                Err(e) => {
                    metrics::record_discovery_operation(backend, "unpublish", e.kind(), started);
                    tracing::error!(
                        phase = %Phase::Unpublishing,
                        registration = %registration,
                        error = %e,
                        "Not able to unpublish the service"
                    );
                }
            }
        }

        if let Some(server) = self.server.take() {
            if let Err(e) = server.stop().await {
                tracing::warn!(error = %e, "Listener did not stop cleanly");
            }
        }

        self.transition(Phase::Stopped);
        Phase::Stopped
    }

    /// Start, serve until the shutdown handle fires, then shut down.
    pub async fn run(mut self) -> Result<(), LifecycleError> {
        self.start().await?;

        // Lagged still means a trigger happened; Closed cannot occur while
        // `self.shutdown` is alive.
        let _ = self.shutdown_rx.recv().await;
        tracing::info!(phase = %self.phase(), "Shutdown requested");

        self.shutdown().await;
        Ok(())
    }
}
