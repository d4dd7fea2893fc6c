//! Redis discovery backend.
//!
//! # Responsibilities
//! - Store every record as one field of a Redis hash (`collection_key`)
//! - Field name is the registration id, value is the JSON record document
//! - Classify Redis failures into the backend error taxonomy
//!
//! # Design Decisions
//! - Connection opened lazily and cached; a connection-level failure drops
//!   the cached connection so the next call dials again
//! - No client-side retries (`HDEL` of an absent field is still success)

use std::collections::HashMap;
use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{Client, Cmd, FromRedisValue, RedisError};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::RedisConfig;
use crate::discovery::error::{BackendError, BackendResult, Operation};
use crate::discovery::filter::RecordFilter;
use crate::discovery::record::{DiscoveredRecord, RecordDocument, RegistrationId, ServiceRecord};
use crate::discovery::DiscoveryBackend;
use crate::resilience::timeouts::bounded;

/// Discovery backend keeping records in a Redis hash.
pub struct RedisBackend {
    client: Client,
    endpoint: String,
    collection_key: String,
    timeout: Duration,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisBackend {
    /// Create the backend. Only validates the connection parameters.
    pub fn new(config: &RedisConfig, timeout: Duration) -> BackendResult<Self> {
        let endpoint = format!("{}:{}", config.host, config.port);
        let url = connection_url(config)
            .map_err(|e| BackendError::connection(&endpoint, format!("invalid Redis address: {}", e)))?;
        let client = Client::open(url.as_str()).map_err(|e| BackendError::connection(&endpoint, e))?;

        Ok(Self {
            client,
            endpoint,
            collection_key: config.collection_key.clone(),
            timeout,
            connection: Mutex::new(None),
        })
    }

    /// Hash holding the records.
    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    async fn connection(&self, operation: Operation) -> BackendResult<MultiplexedConnection> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| self.classify(operation, e))?;

        tracing::debug!(endpoint = %self.endpoint, "Connected to Redis");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Run one command under the backend deadline.
    async fn execute<T>(&self, operation: Operation, cmd: Cmd) -> BackendResult<T>
    where
        T: FromRedisValue + Send,
    {
        bounded(operation, self.timeout, async {
            let mut conn = self.connection(operation).await?;
            let result: Result<T, RedisError> = cmd.query_async(&mut conn).await;
            match result {
                Ok(value) => Ok(value),
                Err(e) => {
                    if is_connection_error(&e) {
                        self.connection.lock().await.take();
                    }
                    Err(self.classify(operation, e))
                }
            }
        })
        .await
    }

    fn classify(&self, operation: Operation, err: RedisError) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                operation,
                after: self.timeout,
            }
        } else if is_connection_error(&err) {
            BackendError::connection(&self.endpoint, err)
        } else {
            BackendError::rejected(operation, err.to_string())
        }
    }
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped()
}

fn connection_url(config: &RedisConfig) -> Result<url::Url, String> {
    let mut url = url::Url::parse(&format!("redis://{}:{}/", config.host, config.port))
        .map_err(|e| e.to_string())?;
    if let Some(auth) = config.auth.as_deref() {
        url.set_password(Some(auth))
            .map_err(|()| format!("cannot attach a password to '{}'", config.host))?;
    }
    Ok(url)
}

fn encode(operation: Operation, doc: &RecordDocument) -> BackendResult<String> {
    serde_json::to_string(doc)
        .map_err(|e| BackendError::rejected(operation, format!("cannot encode record: {}", e)))
}

#[async_trait]
impl DiscoveryBackend for RedisBackend {
    fn kind(&self) -> &'static str {
        "redis"
    }

    async fn publish(&self, record: &ServiceRecord) -> BackendResult<RegistrationId> {
        let registration = RegistrationId::generate();
        let json = encode(
            Operation::Publish,
            &RecordDocument::from_record(record, Some(&registration)),
        )?;

        let mut cmd = ::redis::cmd("HSET");
        cmd.arg(&self.collection_key).arg(registration.as_str()).arg(json);
        let _: i64 = self.execute(Operation::Publish, cmd).await?;

        Ok(registration)
    }

    async fn unpublish(&self, registration: &RegistrationId) -> BackendResult<()> {
        let mut cmd = ::redis::cmd("HDEL");
        cmd.arg(&self.collection_key).arg(registration.as_str());
        let removed: i64 = self.execute(Operation::Unpublish, cmd).await?;

        if removed == 0 {
            tracing::debug!(registration = %registration, "Record already absent from Redis");
        }
        Ok(())
    }

    async fn update(&self, registration: &RegistrationId, record: &ServiceRecord) -> BackendResult<()> {
        let mut exists = ::redis::cmd("HEXISTS");
        exists.arg(&self.collection_key).arg(registration.as_str());
        let known: bool = self.execute(Operation::Update, exists).await?;
        if !known {
            return Err(BackendError::rejected(
                Operation::Update,
                format!("unknown registration {}", registration),
            ));
        }

        let json = encode(
            Operation::Update,
            &RecordDocument::from_record(record, Some(registration)),
        )?;
        let mut cmd = ::redis::cmd("HSET");
        cmd.arg(&self.collection_key).arg(registration.as_str()).arg(json);
        let _: i64 = self.execute(Operation::Update, cmd).await?;
        Ok(())
    }

    async fn query(&self, filter: &RecordFilter) -> BackendResult<Vec<DiscoveredRecord>> {
        let mut cmd = ::redis::cmd("HGETALL");
        cmd.arg(&self.collection_key);
        let entries: HashMap<String, String> = self.execute(Operation::Query, cmd).await?;

        let mut found = Vec::with_capacity(entries.len());
        for (field, json) in entries {
            let doc: RecordDocument = match serde_json::from_str(&json) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(field = %field, error = %e, "Skipping undecodable record");
                    continue;
                }
            };
            let Some(mut discovered) = doc.into_discovered() else {
                tracing::warn!(field = %field, "Skipping record without registration");
                continue;
            };
            // The hash field is authoritative for addressing the record.
            discovered.registration = RegistrationId::new(field);
            if filter.matches(&discovered.record) {
                found.push(discovered);
            }
        }

        found.sort_by(|a, b| a.registration.cmp(&b.registration));
        Ok(found)
    }
}
