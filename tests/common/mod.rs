//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use hey_service::config::{BackendKind, ServiceConfig};
use hey_service::discovery::{
    BackendError, BackendResult, DiscoveredRecord, DiscoveryBackend, Operation, RecordFilter,
    RegistrationId, ServiceRecord,
};

/// Service config bound to an ephemeral loopback port with a short drain.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1".into();
    config.listener.port = 0;
    config.discovery.backend = BackendKind::Memory;
    config.discovery.timeout_ms = 500;
    config.shutdown.drain_timeout_secs = 1;
    config
}

/// Backend whose every call fails with a connection error.
#[derive(Default)]
pub struct FailingBackend {
    pub calls: AtomicU32,
}

#[async_trait]
impl DiscoveryBackend for FailingBackend {
    fn kind(&self) -> &'static str {
        "failing"
    }

    async fn publish(&self, _record: &ServiceRecord) -> BackendResult<RegistrationId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::connection("127.0.0.1:1", "connection refused"))
    }

    async fn unpublish(&self, _registration: &RegistrationId) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::connection("127.0.0.1:1", "connection refused"))
    }

    async fn update(&self, _registration: &RegistrationId, _record: &ServiceRecord) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::connection("127.0.0.1:1", "connection refused"))
    }

    async fn query(&self, _filter: &RecordFilter) -> BackendResult<Vec<DiscoveredRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::connection("127.0.0.1:1", "connection refused"))
    }
}

/// Backend that publishes fine but never answers an unpublish within `after`.
pub struct HangingBackend {
    pub after: Duration,
}

#[async_trait]
impl DiscoveryBackend for HangingBackend {
    fn kind(&self) -> &'static str {
        "hanging"
    }

    async fn publish(&self, _record: &ServiceRecord) -> BackendResult<RegistrationId> {
        Ok(RegistrationId::generate())
    }

    async fn unpublish(&self, _registration: &RegistrationId) -> BackendResult<()> {
        hey_service::resilience::timeouts::bounded(
            Operation::Unpublish,
            self.after,
            std::future::pending::<BackendResult<()>>(),
        )
        .await
    }

    async fn update(&self, _registration: &RegistrationId, _record: &ServiceRecord) -> BackendResult<()> {
        Ok(())
    }

    async fn query(&self, _filter: &RecordFilter) -> BackendResult<Vec<DiscoveredRecord>> {
        Ok(Vec::new())
    }
}

/// Stored documents of the mock registry, keyed by registration.
pub type Registry = Arc<Mutex<BTreeMap<String, Value>>>;

async fn register(State(registry): State<Registry>, Json(mut doc): Json<Value>) -> Json<Value> {
    let id = uuid::Uuid::new_v4().to_string();
    doc["registration"] = Value::String(id.clone());
    registry.lock().unwrap().insert(id, doc.clone());
    Json(doc)
}

async fn remove(State(registry): State<Registry>, Path(id): Path<String>) -> StatusCode {
    match registry.lock().unwrap().remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn update(
    State(registry): State<Registry>,
    Path(id): Path<String>,
    Json(mut doc): Json<Value>,
) -> StatusCode {
    let mut registry = registry.lock().unwrap();
    match registry.get_mut(&id) {
        Some(stored) => {
            doc["registration"] = Value::String(id);
            *stored = doc;
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn records(State(registry): State<Registry>) -> Json<Vec<Value>> {
    Json(registry.lock().unwrap().values().cloned().collect())
}

/// Start an in-process REST registry on an ephemeral port.
pub async fn start_mock_registry() -> (SocketAddr, Registry) {
    let registry: Registry = Arc::default();
    let app = Router::new()
        .route("/register", post(register))
        .route("/remove/{id}", delete(remove))
        .route("/update/{id}", put(update))
        .route("/records", get(records))
        .with_state(registry.clone());

    (spawn(app).await, registry)
}

/// Start a registry that answers every request with `status`.
pub async fn start_rejecting_registry(status: StatusCode) -> SocketAddr {
    let app = Router::new().fallback(move || async move { (status, "registry unavailable") });
    spawn(app).await
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a registry that accepts connections but never answers.
pub async fn start_stalling_registry() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Hashes of the mock Redis server: key → field → value.
pub type RedisStore = Arc<Mutex<BTreeMap<String, BTreeMap<String, String>>>>;

/// Start a RESP2 server implementing the hash commands the backend uses.
/// Anything else (connection setup such as `CLIENT SETINFO`) gets `+OK`.
pub async fn start_mock_redis() -> (SocketAddr, RedisStore) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store: RedisStore = Arc::default();

    let shared = store.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let store = shared.clone();
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let mut reader = BufReader::new(read);
                while let Ok(Some(args)) = read_command(&mut reader).await {
                    let reply = execute_redis(&store, &args);
                    if write.write_all(reply.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (addr, store)
}

async fn read_command<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Vec<String>>> {
    let invalid = || std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed RESP");
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count: usize = line
        .trim_end()
        .strip_prefix('*')
        .and_then(|n| n.parse().ok())
        .ok_or_else(invalid)?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len: usize = line
            .trim_end()
            .strip_prefix('$')
            .and_then(|n| n.parse().ok())
            .ok_or_else(invalid)?;
        let mut buf = vec![0; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

fn bulk(value: &str) -> String {
    format!("${}\r\n{}\r\n", value.len(), value)
}

fn execute_redis(store: &RedisStore, args: &[String]) -> String {
    let mut store = store.lock().unwrap();
    let command = args.first().map(|c| c.to_ascii_uppercase()).unwrap_or_default();

    match (command.as_str(), args) {
        ("HSET", [_, key, field, value]) => {
            let hash = store.entry(key.clone()).or_default();
            let added = hash.insert(field.clone(), value.clone()).is_none();
            format!(":{}\r\n", u8::from(added))
        }
        ("HDEL", [_, key, field]) => {
            let removed = store
                .get_mut(key)
                .map(|hash| hash.remove(field).is_some())
                .unwrap_or(false);
            format!(":{}\r\n", u8::from(removed))
        }
        ("HEXISTS", [_, key, field]) => {
            let exists = store.get(key).is_some_and(|hash| hash.contains_key(field));
            format!(":{}\r\n", u8::from(exists))
        }
        ("HGETALL", [_, key]) => match store.get(key) {
            Some(hash) => {
                let mut reply = format!("*{}\r\n", hash.len() * 2);
                for (field, value) in hash {
                    reply.push_str(&bulk(field));
                    reply.push_str(&bulk(value));
                }
                reply
            }
            None => "*0\r\n".to_string(),
        },
        ("PING", _) => "+PONG\r\n".to_string(),
        _ => "+OK\r\n".to_string(),
    }
}
