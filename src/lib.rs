//! Self-registering HTTP service.
//!
//! Serves a small ping API and advertises itself in a service discovery
//! store (Redis hash or REST registry) for as long as it is listening.

pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ServiceConfig;
pub use discovery::{DiscoveryBackend, ServiceRecord};
pub use http::HttpServer;
pub use lifecycle::{Orchestrator, Phase, Shutdown};
