//! Service record and its wire document.
//!
//! The JSON layout follows the Vert.x service-discovery record format so that
//! records published here and by other registrants share one collection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RecordConfig;

/// Record type advertised for HTTP services.
pub const HTTP_ENDPOINT: &str = "http-endpoint";

/// Descriptor of one service instance.
///
/// Immutable after construction; derive a modified copy with [`with_port`].
///
/// [`with_port`]: ServiceRecord::with_port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    name: String,
    host: String,
    port: u16,
    root: String,
    metadata: BTreeMap<String, String>,
}

impl ServiceRecord {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        root: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            root: root.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Build the record described by configuration.
    pub fn from_config(config: &RecordConfig) -> Self {
        Self::new(&config.name, &config.host, config.port, &config.root)
            .with_metadata(config.metadata.clone())
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Copy of this record advertising another port.
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            port,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Base URL clients use to reach the API.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.root)
    }
}

/// Opaque identifier handed out by a backend at publish time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(String);

impl RegistrationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier for backends that assign ids client-side.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Availability flag carried by stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    #[default]
    Up,
    Down,
    OutOfService,
    #[serde(other)]
    Unknown,
}

/// A record as stored by a backend, with the id it was published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredRecord {
    pub registration: RegistrationId,
    pub status: RecordStatus,
    pub record: ServiceRecord,
}

/// Location block of the wire document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Location {
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    root: String,
    #[serde(default)]
    ssl: bool,
}

/// JSON document exchanged with Redis and REST registries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RecordDocument {
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    #[serde(default)]
    pub status: RecordStatus,
    pub location: Location,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
}

fn default_type() -> String {
    HTTP_ENDPOINT.to_string()
}

impl RecordDocument {
    pub fn from_record(record: &ServiceRecord, registration: Option<&RegistrationId>) -> Self {
        Self {
            name: record.name.clone(),
            kind: HTTP_ENDPOINT.to_string(),
            status: RecordStatus::Up,
            location: Location {
                endpoint: record.endpoint(),
                host: record.host.clone(),
                port: record.port,
                root: record.root.clone(),
                ssl: false,
            },
            metadata: record
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
            registration: registration.map(|id| id.as_str().to_string()),
        }
    }

    /// Convert into a discovered record. Documents without a registration
    /// are not addressable and yield `None`.
    pub fn into_discovered(self) -> Option<DiscoveredRecord> {
        let registration = self.registration.filter(|id| !id.is_empty())?;
        let metadata = self
            .metadata
            .into_iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect();

        Some(DiscoveredRecord {
            registration: RegistrationId(registration),
            status: self.status,
            record: ServiceRecord {
                name: self.name,
                host: self.location.host,
                port: self.location.port,
                root: self.location.root,
                metadata,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raider() -> ServiceRecord {
        ServiceRecord::from_config(&RecordConfig::default())
    }

    #[test]
    fn test_from_config_carries_default_metadata() {
        let record = raider();
        assert_eq!(record.name(), "botsgarden");
        assert_eq!(record.endpoint(), "http://localhost:80/api");
        assert_eq!(record.metadata_value("kind"), Some("raider"));
        assert_eq!(record.metadata_value("message"), Some("Hello 🌍"));
        assert_eq!(record.metadata_value("uri"), Some("/ping"));
    }

    #[test]
    fn test_with_port_leaves_original_untouched() {
        let record = raider();
        let bound = record.with_port(40123);
        assert_eq!(record.port(), 80);
        assert_eq!(bound.port(), 40123);
        assert_eq!(bound.name(), record.name());
    }

    #[test]
    fn test_document_layout() {
        let id = RegistrationId::new("abc-123");
        let doc = RecordDocument::from_record(&raider(), Some(&id));
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["type"], "http-endpoint");
        assert_eq!(value["status"], "UP");
        assert_eq!(value["registration"], "abc-123");
        assert_eq!(value["location"]["endpoint"], "http://localhost:80/api");
        assert_eq!(value["location"]["ssl"], false);
        assert_eq!(value["metadata"]["kind"], "raider");
    }

    #[test]
    fn test_unregistered_document_omits_registration() {
        let doc = RecordDocument::from_record(&raider(), None);
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("registration").is_none());
        assert!(doc.into_discovered().is_none());
    }

    #[test]
    fn test_foreign_document_decodes_leniently() {
        let doc: RecordDocument = serde_json::from_value(json!({
            "name": "legacy",
            "status": "WHATEVER",
            "location": {"host": "10.0.0.7", "port": 9000, "root": "/"},
            "metadata": {"weight": 3, "zone": "eu"},
            "registration": "r-1"
        }))
        .unwrap();

        let found = doc.into_discovered().unwrap();
        assert_eq!(found.registration.as_str(), "r-1");
        assert_eq!(found.status, RecordStatus::Unknown);
        assert_eq!(found.record.host(), "10.0.0.7");
        assert_eq!(found.record.metadata_value("weight"), Some("3"));
        assert_eq!(found.record.metadata_value("zone"), Some("eu"));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(RegistrationId::generate(), RegistrationId::generate());
    }
}
