//! Process-local discovery backend.
//!
//! Records only live as long as the process; useful for development and for
//! exercising the lifecycle without an external store.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::discovery::error::{BackendError, BackendResult, Operation};
use crate::discovery::filter::RecordFilter;
use crate::discovery::record::{DiscoveredRecord, RecordStatus, RegistrationId, ServiceRecord};
use crate::discovery::DiscoveryBackend;

/// Discovery backend storing records in a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: DashMap<RegistrationId, DiscoveredRecord>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DiscoveryBackend for InMemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn publish(&self, record: &ServiceRecord) -> BackendResult<RegistrationId> {
        let registration = RegistrationId::generate();
        self.records.insert(
            registration.clone(),
            DiscoveredRecord {
                registration: registration.clone(),
                status: RecordStatus::Up,
                record: record.clone(),
            },
        );
        Ok(registration)
    }

    async fn unpublish(&self, registration: &RegistrationId) -> BackendResult<()> {
        if self.records.remove(registration).is_none() {
            tracing::debug!(registration = %registration, "Record already absent");
        }
        Ok(())
    }

    async fn update(&self, registration: &RegistrationId, record: &ServiceRecord) -> BackendResult<()> {
        match self.records.get_mut(registration) {
            Some(mut entry) => {
                entry.record = record.clone();
                Ok(())
            }
            None => Err(BackendError::rejected(
                Operation::Update,
                format!("unknown registration {}", registration),
            )),
        }
    }

    async fn query(&self, filter: &RecordFilter) -> BackendResult<Vec<DiscoveredRecord>> {
        let mut found: Vec<DiscoveredRecord> = self
            .records
            .iter()
            .filter(|entry| filter.matches(&entry.record))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.registration.cmp(&b.registration));
        Ok(found)
    }
}
