//! Cluster membership as seen by this client.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use hazelcast_core::protocol::codecs::MemberInfo;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::listener::{Member, MemberEvent};

/// Version of the member list before the first members-view event.
const INITIAL_MEMBER_LIST_VERSION: i32 = -1;

/// Information about the local Hazelcast client instance.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    uuid: Uuid,
    name: String,
    labels: Vec<String>,
}

impl ClientInfo {
    /// Creates a new client info instance.
    pub fn new(uuid: Uuid, name: String, labels: Vec<String>) -> Self {
        Self { uuid, name, labels }
    }

    /// Returns the unique identifier of this client instance.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the name of this client instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the labels associated with this client.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl std::fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClientInfo[uuid={}, name={}]", self.uuid, self.name)
    }
}

#[derive(Debug, Clone)]
struct MemberListSnapshot {
    version: i32,
    members: Vec<Member>,
}

/// Tracks the cluster member list pushed by the cluster view listener.
///
/// The list is an immutable snapshot replaced whenever a newer
/// members-view event arrives; the difference to the previous snapshot is
/// published as [`MemberEvent`]s.
#[derive(Debug)]
pub struct ClusterService {
    client: ClientInfo,
    snapshot: RwLock<Arc<MemberListSnapshot>>,
    membership_sender: broadcast::Sender<MemberEvent>,
    initial_list: watch::Sender<bool>,
    start_time: Instant,
}

impl ClusterService {
    /// Creates a cluster service for the local client `client`.
    pub fn new(client: ClientInfo) -> Self {
        let (membership_sender, _) = broadcast::channel(64);
        let (initial_list, _) = watch::channel(false);
        Self {
            client,
            snapshot: RwLock::new(Arc::new(MemberListSnapshot {
                version: INITIAL_MEMBER_LIST_VERSION,
                members: Vec::new(),
            })),
            membership_sender,
            initial_list,
            start_time: Instant::now(),
        }
    }

    /// Returns all members currently known to be in the cluster, in join
    /// order.
    pub fn members(&self) -> Vec<Member> {
        self.read().members.clone()
    }

    /// Returns the member with the specified UUID, if present in the cluster.
    pub fn member(&self, uuid: &Uuid) -> Option<Member> {
        self.read().members.iter().find(|m| m.uuid() == *uuid).cloned()
    }

    /// Returns the number of members currently in the cluster.
    pub fn member_count(&self) -> usize {
        self.read().members.len()
    }

    /// Returns the version of the current member list.
    pub fn member_list_version(&self) -> i32 {
        self.read().version
    }

    /// Returns information about the local client instance.
    pub fn local_client(&self) -> &ClientInfo {
        &self.client
    }

    /// Returns the time elapsed since the client was created.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Subscribes to cluster membership events.
    pub fn add_membership_listener(&self) -> broadcast::Receiver<MemberEvent> {
        self.membership_sender.subscribe()
    }

    /// Replaces the member list with `members` at `version`.
    ///
    /// Stale versions are ignored. Returns the membership events fired,
    /// removals before additions.
    pub fn apply_members_view(&self, version: i32, members: Vec<MemberInfo>) -> Vec<MemberEvent> {
        let members: Vec<Member> = members.into_iter().map(Member::from).collect();
        let events = {
            let mut snapshot = self.write();
            if version <= snapshot.version {
                tracing::debug!(
                    version,
                    current = snapshot.version,
                    "ignoring stale member list"
                );
                return Vec::new();
            }

            let events = diff(&snapshot.members, &members);
            *snapshot = Arc::new(MemberListSnapshot { version, members });
            events
        };

        tracing::info!(version, members = self.member_count(), "member list updated");
        for event in &events {
            tracing::info!(event = %event, "membership changed");
            let _ = self.membership_sender.send(event.clone());
        }
        self.initial_list.send_replace(true);
        events
    }

    /// Waits until the first member list arrives. Returns `false` on
    /// timeout.
    pub async fn wait_initial_member_list(&self, timeout: Duration) -> bool {
        let mut receiver = self.initial_list.subscribe();
        tokio::time::timeout(timeout, receiver.wait_for(|received| *received))
            .await
            .map(|result| result.is_ok())
            .unwrap_or(false)
    }

    /// Forgets the member list version after the client switched clusters.
    ///
    /// The old members stay until the new cluster's first members-view
    /// event, which then reports them as removed.
    pub fn reset(&self) {
        let mut snapshot = self.write();
        let members = snapshot.members.clone();
        *snapshot = Arc::new(MemberListSnapshot {
            version: INITIAL_MEMBER_LIST_VERSION,
            members,
        });
        self.initial_list.send_replace(false);
    }

    fn read(&self) -> Arc<MemberListSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Arc<MemberListSnapshot>> {
        self.snapshot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn diff(previous: &[Member], current: &[Member]) -> Vec<MemberEvent> {
    let previous_ids: HashSet<Uuid> = previous.iter().map(Member::uuid).collect();
    let current_ids: HashSet<Uuid> = current.iter().map(Member::uuid).collect();

    let removed = previous
        .iter()
        .filter(|m| !current_ids.contains(&m.uuid()))
        .cloned()
        .map(MemberEvent::member_removed);
    let added = current
        .iter()
        .filter(|m| !previous_ids.contains(&m.uuid()))
        .cloned()
        .map(MemberEvent::member_added);
    removed.chain(added).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::MemberEventType;
    use hazelcast_core::protocol::codecs::{Address, MemberVersion};

    fn member_info(port: u16) -> MemberInfo {
        MemberInfo {
            uuid: Uuid::new_v4(),
            address: Address::new("127.0.0.1", port),
            lite_member: false,
            attributes: Default::default(),
            version: MemberVersion::default(),
        }
    }

    fn service() -> ClusterService {
        ClusterService::new(ClientInfo::new(Uuid::new_v4(), "client".to_string(), vec![]))
    }

    #[test]
    fn test_client_info_display() {
        let uuid = Uuid::new_v4();
        let info = ClientInfo::new(uuid, "my-client".to_string(), vec!["label1".to_string()]);

        assert_eq!(info.name(), "my-client");
        assert_eq!(info.labels(), &["label1".to_string()]);
        let display = info.to_string();
        assert!(display.contains(&uuid.to_string()));
    }

    #[test]
    fn test_cluster_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClusterService>();
        assert_send_sync::<ClientInfo>();
    }

    #[test]
    fn test_members_view_emits_differences() {
        let service = service();
        let a = member_info(5701);
        let b = member_info(5702);
        let c = member_info(5703);

        let events = service.apply_members_view(1, vec![a.clone(), b.clone()]);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_type == MemberEventType::Added));

        let events = service.apply_members_view(2, vec![b.clone(), c.clone()]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, MemberEventType::Removed);
        assert_eq!(events[0].member.uuid(), a.uuid);
        assert_eq!(events[1].event_type, MemberEventType::Added);
        assert_eq!(events[1].member.uuid(), c.uuid);

        let uuids: Vec<Uuid> = service.members().iter().map(Member::uuid).collect();
        assert_eq!(uuids, vec![b.uuid, c.uuid]);
        assert!(service.member(&c.uuid).is_some());
        assert!(service.member(&a.uuid).is_none());
    }

    #[test]
    fn test_stale_members_view_is_ignored() {
        let service = service();
        service.apply_members_view(5, vec![member_info(5701)]);
        assert!(service.apply_members_view(5, vec![]).is_empty());
        assert!(service.apply_members_view(3, vec![]).is_empty());
        assert_eq!(service.member_count(), 1);
        assert_eq!(service.member_list_version(), 5);
    }

    #[test]
    fn test_reset_reports_old_members_removed() {
        let service = service();
        let old = member_info(5701);
        service.apply_members_view(9, vec![old.clone()]);

        service.reset();
        let fresh = member_info(5801);
        let events = service.apply_members_view(1, vec![fresh.clone()]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].member.uuid(), old.uuid);
        assert_eq!(events[0].event_type, MemberEventType::Removed);
        assert_eq!(events[1].member.uuid(), fresh.uuid);
    }

    #[tokio::test]
    async fn test_membership_events_broadcast() {
        let service = service();
        let mut receiver = service.add_membership_listener();
        let info = member_info(5701);
        service.apply_members_view(1, vec![info.clone()]);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.member.uuid(), info.uuid);
        assert_eq!(event.event_type, MemberEventType::Added);
    }

    #[tokio::test]
    async fn test_wait_initial_member_list() {
        let service = Arc::new(service());
        assert!(!service.wait_initial_member_list(Duration::from_millis(20)).await);

        let waiter = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.wait_initial_member_list(Duration::from_secs(5)).await })
        };
        service.apply_members_view(1, vec![member_info(5701)]);
        assert!(waiter.await.unwrap());
    }
}
