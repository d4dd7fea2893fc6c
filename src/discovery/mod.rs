//! Service discovery subsystem (registrant side).
//!
//! # Data Flow
//! ```text
//! ServiceRecord (record.rs)
//!     → DiscoveryBackend::publish   → RegistrationId
//!     → DiscoveryBackend::query     → Vec<DiscoveredRecord> (filter.rs)
//!     → DiscoveryBackend::unpublish (RegistrationId)
//!
//! Backends:
//!     redis.rs  (records in one Redis hash)
//!     rest.rs   (HTTP registry with register/remove/update/records paths)
//!     memory.rs (process-local map)
//! ```
//!
//! # Design Decisions
//! - One trait; the variant is chosen once by `connect`, call sites never
//!   know which backend is active
//! - "Not found" on unpublish counts as success so shutdown stays robust
//! - Every remote call is bounded by `discovery.timeout_ms`

pub mod error;
pub mod filter;
pub mod memory;
pub mod record;
pub mod redis;
pub mod rest;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{BackendKind, DiscoveryConfig};

pub use error::{BackendError, BackendResult, Operation};
pub use filter::RecordFilter;
pub use memory::InMemoryBackend;
pub use record::{DiscoveredRecord, RecordStatus, RegistrationId, ServiceRecord};
pub use self::redis::RedisBackend;
pub use rest::RestBackend;

/// Client side of a discovery store.
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// Backend label for logs and metrics.
    fn kind(&self) -> &'static str;

    /// Make `record` visible; the returned id addresses it from now on.
    async fn publish(&self, record: &ServiceRecord) -> BackendResult<RegistrationId>;

    /// Withdraw a record. Unknown ids succeed.
    async fn unpublish(&self, registration: &RegistrationId) -> BackendResult<()>;

    /// Replace the record stored under `registration`.
    async fn update(&self, registration: &RegistrationId, record: &ServiceRecord) -> BackendResult<()>;

    /// All stored records accepted by `filter`.
    async fn query(&self, filter: &RecordFilter) -> BackendResult<Vec<DiscoveredRecord>>;
}

/// Build the backend selected by configuration.
///
/// No network traffic happens here; an unreachable backend surfaces on the
/// first operation instead.
pub fn connect(config: &DiscoveryConfig) -> BackendResult<Arc<dyn DiscoveryBackend>> {
    let timeout = Duration::from_millis(config.timeout_ms);

    let backend: Arc<dyn DiscoveryBackend> = match config.backend {
        BackendKind::Redis => Arc::new(RedisBackend::new(&config.redis, timeout)?),
        BackendKind::Rest => Arc::new(RestBackend::new(&config.rest, timeout)?),
        BackendKind::Memory => Arc::new(InMemoryBackend::new()),
    };

    tracing::info!(
        backend = backend.kind(),
        timeout_ms = config.timeout_ms,
        "Discovery backend configured"
    );

    Ok(backend)
}
