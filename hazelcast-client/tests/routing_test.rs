//! Integration tests for smart and unisocket routing.

mod common;

use std::time::Duration;

use common::{eventually, operation, MockCluster, TEST_OPERATION};
use hazelcast_client::{InvocationTarget, LifecycleEvent};

#[tokio::test]
async fn test_smart_routing_connects_to_every_member() {
    common::init_tracing();
    let cluster = MockCluster::start(3);
    let client = cluster.client(cluster.config().build().unwrap()).await;

    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 3)
            .await
    );
    assert_eq!(client.members().len(), 3);
    assert_eq!(cluster.connected_members().len(), 3);
    assert_eq!(client.partition_service().partition_count(), common::PARTITION_COUNT);

    client.shutdown().await;
}

#[tokio::test]
async fn test_partition_invocation_goes_to_owner() {
    let cluster = MockCluster::start(3);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 3)
            .await
    );
    assert!(
        eventually(Duration::from_secs(5), || client.partition_service().is_initialized()).await
    );

    for partition_id in [0, 1, 2, 100, 270] {
        client
            .invoke(operation(true), InvocationTarget::Partition(partition_id))
            .await
            .unwrap();

        let request = cluster.requests_of(TEST_OPERATION).pop().unwrap();
        assert_eq!(request.member, cluster.partition_owner(partition_id));
        assert_eq!(request.partition_id, partition_id);
        assert_eq!(
            client.partition_owner(partition_id).map(|m| m.uuid()),
            Some(cluster.partition_owner(partition_id))
        );
    }

    client.shutdown().await;
}

#[tokio::test]
async fn test_member_target_is_honoured() {
    let cluster = MockCluster::start(2);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 2)
            .await
    );

    let target = cluster.member_uuids()[1];
    client
        .invoke(operation(true), InvocationTarget::Member(target))
        .await
        .unwrap();
    assert_eq!(cluster.requests_of(TEST_OPERATION)[0].member, target);

    client.shutdown().await;
}

#[tokio::test]
async fn test_key_invocation_uses_key_partition() {
    let cluster = MockCluster::start(2);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 2)
            .await
    );
    assert!(
        eventually(Duration::from_secs(5), || client.partition_service().is_initialized()).await
    );

    let partition_id = client.partition_id_for_key("user:42").unwrap();
    client.invoke_on_key(operation(true), "user:42").await.unwrap();

    let request = cluster.requests_of(TEST_OPERATION).pop().unwrap();
    assert_eq!(request.partition_id, partition_id);
    assert_eq!(request.member, cluster.partition_owner(partition_id));

    client.shutdown().await;
}

#[tokio::test]
async fn test_unisocket_uses_single_connection() {
    let cluster = MockCluster::start(3);
    let client = cluster
        .client(cluster.config().smart_routing(false).build().unwrap())
        .await;
    assert!(
        eventually(Duration::from_secs(5), || client.partition_service().is_initialized()).await
    );

    for partition_id in 0..6 {
        client
            .invoke(operation(true), InvocationTarget::Partition(partition_id))
            .await
            .unwrap();
    }
    let other = cluster.member_uuids()[2];
    client
        .invoke(operation(true), InvocationTarget::Member(other))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.connection_manager().connection_count(), 1);
    assert_eq!(cluster.session_count(), 1);
    let first = cluster.member_uuids()[0];
    assert!(cluster
        .requests_of(TEST_OPERATION)
        .iter()
        .all(|r| r.member == first));

    client.shutdown().await;
}

#[tokio::test]
async fn test_new_member_gets_connection_and_removed_member_loses_it() {
    let cluster = MockCluster::start(2);
    let client = cluster.client(cluster.config().build().unwrap()).await;
    let mut membership = client.membership_events();
    assert!(
        eventually(Duration::from_secs(5), || client.connection_manager().connection_count() == 2)
            .await
    );

    let added = cluster.add_member();
    assert!(
        eventually(Duration::from_secs(5), || client
            .connection_manager()
            .connection_for_member(&added)
            .is_some())
        .await
    );
    let event = membership.recv().await.unwrap();
    assert_eq!(event.member.uuid(), added);

    let removed = cluster.member_uuids()[1];
    cluster.remove_member(removed);
    assert!(
        eventually(Duration::from_secs(5), || client
            .connection_manager()
            .connection_for_member(&removed)
            .is_none()
            && client.members().len() == 2)
        .await
    );

    let mut lifecycle = client.add_lifecycle_listener();
    client.shutdown().await;
    assert_eq!(lifecycle.recv().await.unwrap(), LifecycleEvent::ShuttingDown);
}
