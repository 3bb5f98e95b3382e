//! Cluster management services for Hazelcast client.

mod cluster_service;
mod cluster_view;
mod lifecycle_service;
mod partition_service;

pub use cluster_service::{ClientInfo, ClusterService};
pub use lifecycle_service::{LifecycleListenerRegistration, LifecycleService};
pub use partition_service::{partition_of, Partition, PartitionService, PartitionTable};

pub(crate) use cluster_view::ClusterViewListener;
