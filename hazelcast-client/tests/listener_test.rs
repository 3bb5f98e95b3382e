//! Integration tests for listener subscriptions and their replay after
//! reconnects.

mod common;

use std::time::Duration;

use bytes::Bytes;
use common::{eventually, within, MockCluster};
use hazelcast_client::{EntryEvent, EntryEventType, EntryListenerConfig, FnEntryListener};
use hazelcast_core::protocol::codecs::map_entry_listener::{self, EntryEventBody};
use tokio::sync::mpsc;

const MAP: &str = "orders";

fn added_event(key: &'static [u8], value: &'static [u8]) -> EntryEventBody {
    EntryEventBody {
        event_type: EntryEventType::Added.value(),
        member_uuid: None,
        number_of_affected_entries: 1,
        key: Some(Bytes::from_static(key)),
        value: Some(Bytes::from_static(value)),
        old_value: None,
        merging_value: None,
    }
}

fn collecting_listener() -> (FnEntryListener, mpsc::UnboundedReceiver<EntryEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = FnEntryListener::builder()
        .on_added(move |event| {
            let _ = tx.send(event);
        })
        .build();
    (listener, rx)
}

#[tokio::test]
async fn test_entry_listener_receives_events() {
    common::init_tracing();
    let cluster = MockCluster::start(1);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    let (listener, mut events) = collecting_listener();

    let id = client
        .add_entry_listener(MAP, EntryListenerConfig::new(), listener)
        .await
        .unwrap();
    assert_eq!(cluster.map_registration_count(), 1);
    assert_eq!(client.listener_service().active_registrations(id), 1);

    assert_eq!(cluster.push_entry_event(MAP, &added_event(b"k1", b"v1")), 1);
    assert_eq!(cluster.push_entry_event("other-map", &added_event(b"k2", b"v2")), 0);

    let event = within(Duration::from_secs(2), events.recv()).await.unwrap();
    assert_eq!(event.event_type, EntryEventType::Added);
    assert_eq!(event.key.as_deref(), Some(&b"k1"[..]));
    assert_eq!(event.value.as_deref(), Some(&b"v1"[..]));

    client.shutdown().await;
}

#[tokio::test]
async fn test_events_arrive_in_order() {
    let cluster = MockCluster::start(1);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    let (listener, mut events) = collecting_listener();
    client
        .add_entry_listener(MAP, EntryListenerConfig::new(), listener)
        .await
        .unwrap();

    const KEYS: [&[u8]; 5] = [b"a", b"b", b"c", b"d", b"e"];
    for key in KEYS {
        cluster.push_entry_event(MAP, &added_event(key, b"v"));
    }
    for key in KEYS {
        let event = within(Duration::from_secs(2), events.recv()).await.unwrap();
        assert_eq!(event.key.as_deref(), Some(key));
    }

    client.shutdown().await;
}

#[tokio::test]
async fn test_smart_routing_registers_on_every_member() {
    let cluster = MockCluster::start(3);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 3)
            .await
    );

    let (listener, _events) = collecting_listener();
    let id = client
        .add_entry_listener(MAP, EntryListenerConfig::new(), listener)
        .await
        .unwrap();
    assert_eq!(cluster.map_registration_count(), 3);
    assert_eq!(client.listener_service().active_registrations(id), 3);

    client.shutdown().await;
}

#[tokio::test]
async fn test_unisocket_registers_once() {
    let cluster = MockCluster::start(3);
    let client = cluster
        .client(cluster.config().smart_routing(false).build().unwrap())
        .await;

    let (listener, _events) = collecting_listener();
    client
        .add_entry_listener(MAP, EntryListenerConfig::new(), listener)
        .await
        .unwrap();
    assert_eq!(cluster.map_registration_count(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn test_listener_is_replayed_exactly_once_after_reconnect() {
    let cluster = MockCluster::start(1);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    let (listener, mut events) = collecting_listener();
    let id = client
        .add_entry_listener(MAP, EntryListenerConfig::new(), listener)
        .await
        .unwrap();
    let sessions_before = cluster.session_count();

    cluster.drop_connections();
    assert!(
        eventually(Duration::from_secs(5), || {
            cluster.map_registration_count() == 1
                && client.listener_service().active_registrations(id) == 1
                && client.connection_manager().connection_count() == 1
        })
        .await
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cluster.map_registration_count(), 1);
    assert_eq!(cluster.session_count(), sessions_before);
    assert_eq!(
        cluster.request_count(map_entry_listener::MAP_ADD_ENTRY_LISTENER),
        2
    );

    cluster.push_entry_event(MAP, &added_event(b"after", b"reconnect"));
    let event = within(Duration::from_secs(2), events.recv()).await.unwrap();
    assert_eq!(event.key.as_deref(), Some(&b"after"[..]));

    client.shutdown().await;
}

#[tokio::test]
async fn test_unsubscribe_removes_registration() {
    let cluster = MockCluster::start(2);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 2)
            .await
    );
    let (listener, mut events) = collecting_listener();
    let id = client
        .add_entry_listener(MAP, EntryListenerConfig::new(), listener)
        .await
        .unwrap();
    assert_eq!(cluster.map_registration_count(), 2);

    assert!(client.unsubscribe(id).await.unwrap());
    assert_eq!(cluster.map_registration_count(), 0);
    assert_eq!(
        cluster.request_count(map_entry_listener::MAP_REMOVE_ENTRY_LISTENER),
        2
    );
    assert_eq!(client.listener_service().subscription_count(), 0);
    assert!(!client.unsubscribe(id).await.unwrap());

    assert_eq!(cluster.push_entry_event(MAP, &added_event(b"k", b"v")), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.try_recv().is_err());

    client.shutdown().await;
}

#[tokio::test]
async fn test_unsubscribed_listener_is_not_replayed() {
    let cluster = MockCluster::start(1);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    let (listener, _events) = collecting_listener();
    let id = client
        .add_entry_listener(MAP, EntryListenerConfig::new(), listener)
        .await
        .unwrap();

    cluster.refuse_connections(true);
    cluster.drop_connections();
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 0)
            .await
    );
    assert!(client.unsubscribe(id).await.unwrap());

    cluster.refuse_connections(false);
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 1)
            .await
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cluster.map_registration_count(), 0);
    assert_eq!(
        cluster.request_count(map_entry_listener::MAP_ADD_ENTRY_LISTENER),
        1
    );

    client.shutdown().await;
}

#[tokio::test]
async fn test_subscribe_while_disconnected_registers_on_reconnect() {
    let cluster = MockCluster::start(1);
    let client = cluster.client(cluster.config().build().unwrap()).await;

    cluster.refuse_connections(true);
    cluster.drop_connections();
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 0)
            .await
    );

    let (listener, mut events) = collecting_listener();
    let id = client
        .add_entry_listener(MAP, EntryListenerConfig::new(), listener)
        .await
        .unwrap();
    assert_eq!(client.listener_service().active_registrations(id), 0);

    cluster.refuse_connections(false);
    assert!(
        eventually(Duration::from_secs(5), || cluster.map_registration_count() == 1).await
    );
    assert!(
        eventually(Duration::from_secs(5), || {
            client.listener_service().active_registrations(id) == 1
        })
        .await
    );

    cluster.push_entry_event(MAP, &added_event(b"late", b"v"));
    let event = within(Duration::from_secs(2), events.recv()).await.unwrap();
    assert_eq!(event.key.as_deref(), Some(&b"late"[..]));

    client.shutdown().await;
}
