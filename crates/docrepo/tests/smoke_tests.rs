//! Tests that must not touch a store.
//!
//! The driver connects lazily, so a repository can be built over an
//! unreachable address; any operation that actually reached the server
//! would stall until the (deliberately long) server selection timeout.
//! These tests assert that validation failures short-circuit long before
//! that.

use std::time::{Duration, Instant};

use docrepo::{connection, Error, Meta, Model, MongoConfig, Repository};
use mongodb::options::{ClientOptions, ServerAddress};
use mongodb::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Widget {
    #[serde(flatten)]
    meta: Meta,
    name: String,
}

impl Model for Widget {
    fn meta(&self) -> &Meta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }
}

/// Repository over a client that never connects (TEST-NET address).
fn unreachable_repository() -> Repository<Widget> {
    let options = ClientOptions::builder()
        .hosts(vec![ServerAddress::Tcp {
            host: "203.0.113.1".to_string(),
            port: Some(27017),
        }])
        .server_selection_timeout(Duration::from_secs(30))
        .build();
    let client = Client::with_options(options).expect("lazy client");
    Repository::new(&client.database("smoke"), "widgets")
}

#[tokio::test]
async fn invalid_hex_id_fails_before_any_store_access() {
    let repository = unreachable_repository();
    let start = Instant::now();
    let err = repository.find_one_by_id("not-a-valid-hex").await.unwrap_err();
    assert!(matches!(err, Error::InvalidId), "got {err:?}");
    // A store round-trip would have blocked on server selection.
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn empty_batch_fails_before_any_store_access() {
    let repository = unreachable_repository();
    let start = Instant::now();
    let err = repository.create_many(&mut []).await.unwrap_err();
    assert!(matches!(err, Error::EmptySlice), "got {err:?}");
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unassigned_id_fails_update_without_timestamp_locally() {
    let repository = unreachable_repository();
    let widget = Widget::default();
    let err = repository
        .update_without_timestamp(&widget)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidId), "got {err:?}");
}

#[tokio::test]
async fn failed_id_validation_leaves_the_record_unstamped() {
    let repository = unreachable_repository();
    let mut widget = Widget::default();

    let err = repository.update(&mut widget).await.unwrap_err();
    assert!(matches!(err, Error::InvalidId), "got {err:?}");
    assert!(widget.meta().updated_at.is_none());

    let err = repository.delete(&mut widget).await.unwrap_err();
    assert!(matches!(err, Error::InvalidId), "got {err:?}");
    assert!(widget.meta().deleted_at.is_none());
    assert!(widget.meta().updated_at.is_none());
}

#[tokio::test]
async fn unanswered_ping_surfaces_a_connection_error() {
    let config = MongoConfig {
        host: "203.0.113.1".to_string(),
        ..Default::default()
    };
    let err = connection::connect(&config).await.unwrap_err();
    assert!(matches!(err, Error::Connection { .. }), "got {err:?}");
}

#[tokio::test]
async fn point_operations_respect_the_configured_deadline() {
    let repository = unreachable_repository().with_op_timeout(Duration::from_millis(100));
    let start = Instant::now();
    let err = repository
        .find_one_by_selector(docrepo::doc! {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
    assert!(start.elapsed() < Duration::from_secs(5));
}
