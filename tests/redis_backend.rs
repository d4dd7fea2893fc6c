//! Redis backend against an in-process RESP server.

use std::net::SocketAddr;
use std::time::Duration;

use hey_service::config::RedisConfig;
use hey_service::discovery::{
    BackendError, DiscoveryBackend, Operation, RecordFilter, RedisBackend, RegistrationId,
    ServiceRecord,
};

mod common;

const KEY: &str = "vert.x.ms";

fn backend_for(addr: SocketAddr) -> RedisBackend {
    let config = RedisConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        collection_key: KEY.into(),
        ..RedisConfig::default()
    };
    RedisBackend::new(&config, Duration::from_secs(2)).unwrap()
}

fn record() -> ServiceRecord {
    ServiceRecord::new("botsgarden", "localhost", 80, "/api")
}

#[tokio::test]
async fn test_publish_query_unpublish() {
    let (addr, store) = common::start_mock_redis().await;
    let backend = backend_for(addr);

    let id = backend.publish(&record()).await.unwrap();
    assert!(store.lock().unwrap()[KEY].contains_key(id.as_str()));

    let found = backend.query(&RecordFilter::by_name("botsgarden")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].registration, id);
    assert_eq!(found[0].record, record());

    backend.unpublish(&id).await.unwrap();
    assert!(backend.query(&RecordFilter::All).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unpublish_of_absent_field_succeeds() {
    let (addr, _store) = common::start_mock_redis().await;
    let backend = backend_for(addr);

    let id = backend.publish(&record()).await.unwrap();
    backend.unpublish(&id).await.unwrap();
    backend.unpublish(&id).await.unwrap();
    backend.unpublish(&RegistrationId::new("never-published")).await.unwrap();
}

#[tokio::test]
async fn test_hash_field_is_the_registration() {
    let (addr, store) = common::start_mock_redis().await;
    let backend = backend_for(addr);

    let id = backend.publish(&record()).await.unwrap();
    {
        let mut store = store.lock().unwrap();
        let hash = store.get_mut(KEY).unwrap();
        let doc = hash.remove(id.as_str()).unwrap();
        hash.insert("moved-field".into(), doc);
    }

    let found = backend.query(&RecordFilter::All).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].registration, RegistrationId::new("moved-field"));

    backend.unpublish(&found[0].registration).await.unwrap();
    assert!(store.lock().unwrap()[KEY].is_empty());
}

#[tokio::test]
async fn test_undecodable_entries_are_skipped() {
    let (addr, store) = common::start_mock_redis().await;
    let backend = backend_for(addr);

    let id = backend.publish(&record()).await.unwrap();
    store
        .lock()
        .unwrap()
        .get_mut(KEY)
        .unwrap()
        .insert("garbage".into(), "not json".into());

    let found = backend.query(&RecordFilter::All).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].registration, id);
}

#[tokio::test]
async fn test_update_requires_known_registration() {
    let (addr, _store) = common::start_mock_redis().await;
    let backend = backend_for(addr);

    let err = backend
        .update(&RegistrationId::new("unknown"), &record())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BackendError::Rejected { operation: Operation::Update, .. }
    ));

    let id = backend.publish(&record()).await.unwrap();
    backend.update(&id, &record().with_port(9090)).await.unwrap();
    let found = backend.query(&RecordFilter::All).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].record.port(), 9090);
}
