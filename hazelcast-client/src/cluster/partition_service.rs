//! Partition table and partition lookups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use hazelcast_core::{HazelcastError, Result, Serializable};
use hazelcast_core::serialization::Data;

use crate::connection::ConnectionId;

/// Represents a single partition in the Hazelcast cluster.
#[derive(Debug, Clone)]
pub struct Partition {
    id: i32,
    owner_uuid: Option<Uuid>,
}

impl Partition {
    /// Creates a new partition with the given ID and optional owner.
    pub fn new(id: i32, owner_uuid: Option<Uuid>) -> Self {
        Self { id, owner_uuid }
    }

    /// Returns the partition ID.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the UUID of the partition owner, if known.
    pub fn owner_uuid(&self) -> Option<Uuid> {
        self.owner_uuid
    }
}

impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Partition {}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.owner_uuid {
            Some(uuid) => write!(f, "Partition[id={}, owner={}]", self.id, uuid),
            None => write!(f, "Partition[id={}, owner=unknown]", self.id),
        }
    }
}

/// Immutable snapshot of partition ownership.
///
/// `origin` is the connection whose partitions-view event produced the
/// table. Snapshots are replaced, never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    origin: Option<ConnectionId>,
    version: i32,
    owners: HashMap<i32, Uuid>,
}

impl PartitionTable {
    /// Returns the connection the table came from.
    pub fn origin(&self) -> Option<ConnectionId> {
        self.origin
    }

    /// Returns the table version.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Returns the owner of `partition_id`.
    pub fn owner_of(&self, partition_id: i32) -> Option<Uuid> {
        self.owners.get(&partition_id).copied()
    }

    /// Returns the number of partitions with a known owner.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns `true` if no owner is known.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn supersedes(&self, origin: ConnectionId, version: i32) -> bool {
        self.origin != Some(origin) || version > self.version
    }
}

/// Maps a partition hash onto a partition id.
///
/// `i32::MIN` has no positive counterpart and maps to partition 0.
pub fn partition_of(partition_hash: i32, partition_count: i32) -> i32 {
    if partition_count <= 0 {
        return 0;
    }
    if partition_hash == i32::MIN {
        return 0;
    }
    partition_hash.abs() % partition_count
}

/// Holds the current partition table and the cluster's partition count.
#[derive(Debug, Default)]
pub struct PartitionService {
    table: RwLock<Arc<PartitionTable>>,
    partition_count: AtomicI32,
}

impl PartitionService {
    /// Creates an empty partition service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of partitions, or 0 before the first
    /// authentication.
    pub fn partition_count(&self) -> i32 {
        self.partition_count.load(Ordering::Acquire)
    }

    /// Records the partition count reported by a member. The first value
    /// wins; a member reporting a different count belongs to an
    /// incompatible cluster.
    pub fn check_and_set_partition_count(&self, count: i32) -> Result<()> {
        if count <= 0 {
            return Err(HazelcastError::Protocol(format!(
                "invalid partition count {}",
                count
            )));
        }
        match self
            .partition_count
            .compare_exchange(0, count, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                tracing::debug!(partition_count = count, "learned partition count");
                Ok(())
            }
            Err(current) if current == count => Ok(()),
            Err(current) => Err(HazelcastError::Connection(format!(
                "member reports {} partitions but the cluster has {}",
                count, current
            ))),
        }
    }

    /// Replaces the table with the one pushed by `origin`.
    ///
    /// The push is applied only if it carries owners and comes from a
    /// different connection or a newer version than the current table.
    /// Returns `true` if the table was replaced.
    pub fn apply(&self, origin: ConnectionId, version: i32, partitions: &[(Uuid, Vec<i32>)]) -> bool {
        let owners: HashMap<i32, Uuid> = partitions
            .iter()
            .flat_map(|(owner, ids)| ids.iter().map(move |id| (*id, *owner)))
            .collect();
        if owners.is_empty() {
            tracing::debug!(origin = %origin, version, "ignoring empty partition table");
            return false;
        }

        let mut table = self.write();
        if !table.supersedes(origin, version) {
            tracing::debug!(
                origin = %origin,
                version,
                current = table.version,
                "ignoring stale partition table"
            );
            return false;
        }

        *table = Arc::new(PartitionTable {
            origin: Some(origin),
            version,
            owners,
        });
        tracing::debug!(origin = %origin, version, partitions = table.len(), "applied partition table");
        true
    }

    /// Returns the current table.
    pub fn snapshot(&self) -> Arc<PartitionTable> {
        Arc::clone(&self.read())
    }

    /// Returns the owner of `partition_id`, if known.
    pub fn owner_of(&self, partition_id: i32) -> Option<Uuid> {
        self.read().owner_of(partition_id)
    }

    /// Returns all partitions with their owners.
    pub fn partitions(&self) -> Vec<Partition> {
        let table = self.snapshot();
        (0..self.partition_count())
            .map(|id| Partition::new(id, table.owner_of(id)))
            .collect()
    }

    /// Returns the partition a serialized key belongs to.
    pub fn partition_id_for_data(&self, data: &Data) -> Result<i32> {
        let count = self.partition_count();
        if count == 0 {
            return Err(HazelcastError::ClientNotActive(
                "partition count is not known yet".to_string(),
            ));
        }
        Ok(partition_of(data.partition_hash(), count))
    }

    /// Returns the partition `key` belongs to.
    pub fn partition_id_for_key<K>(&self, key: &K) -> Result<i32>
    where
        K: Serializable + ?Sized,
    {
        self.partition_id_for_data(&Data::from_value(key)?)
    }

    /// Returns whether the partition table has been populated.
    pub fn is_initialized(&self) -> bool {
        !self.read().is_empty()
    }

    /// Forgets the table. Called when the client lands on another cluster.
    /// The partition count is kept, since it never changes.
    pub fn reset(&self) {
        *self.write() = Arc::new(PartitionTable::default());
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Arc<PartitionTable>> {
        self.table.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Arc<PartitionTable>> {
        self.table.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
