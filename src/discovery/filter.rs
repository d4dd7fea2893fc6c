//! Record selection for `query`.

use std::fmt;
use std::sync::Arc;

use crate::discovery::record::ServiceRecord;

type Predicate = Arc<dyn Fn(&ServiceRecord) -> bool + Send + Sync>;

/// Which records a query returns.
#[derive(Clone, Default)]
pub enum RecordFilter {
    /// Every record.
    #[default]
    All,
    /// Records with exactly this name.
    Name(String),
    /// Records whose metadata maps `key` to `value`.
    Metadata { key: String, value: String },
    /// Arbitrary predicate.
    Custom(Predicate),
}

impl RecordFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        RecordFilter::Name(name.into())
    }

    pub fn by_metadata(key: impl Into<String>, value: impl Into<String>) -> Self {
        RecordFilter::Metadata {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matching<F>(predicate: F) -> Self
    where
        F: Fn(&ServiceRecord) -> bool + Send + Sync + 'static,
    {
        RecordFilter::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, record: &ServiceRecord) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Name(name) => record.name() == name.as_str(),
            RecordFilter::Metadata { key, value } => record.metadata_value(key) == Some(value.as_str()),
            RecordFilter::Custom(predicate) => predicate(record),
        }
    }
}

impl fmt::Debug for RecordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordFilter::All => write!(f, "All"),
            RecordFilter::Name(name) => f.debug_tuple("Name").field(name).finish(),
            RecordFilter::Metadata { key, value } => f
                .debug_struct("Metadata")
                .field("key", key)
                .field("value", value)
                .finish(),
            RecordFilter::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
