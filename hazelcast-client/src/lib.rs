//! Async Rust client core for [Hazelcast](https://hazelcast.com/) clusters.
//!
//! This crate connects to a Hazelcast 5.x cluster over the
//! [Hazelcast Open Binary Protocol](https://github.com/hazelcast/hazelcast-client-protocol)
//! and provides the machinery every data structure proxy builds on:
//!
//! - authenticated connections to cluster members, one reader task each
//! - partition-aware request routing (smart routing) or a single connection
//!   (unisocket)
//! - invocations with retries, capped backoff, deadlines and cancellation
//! - listener registrations that survive reconnects
//! - member list, partition table and lifecycle tracking
//!
//! It is built on [Tokio](https://tokio.rs/) and exposes every operation as an
//! `async fn`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hazelcast_client::{ClientConfig, HazelcastClient, InvocationTarget};
//! use hazelcast_client::core::protocol::codecs::client_ping;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .cluster_name("dev")
//!         .build()?;
//!     let client = HazelcastClient::new(config).await?;
//!
//!     client
//!         .invoke(client_ping::encode_request(), InvocationTarget::Random)
//!         .await?;
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! Use [`ClientConfig::builder()`](ClientConfig::builder) (or equivalently
//! [`ClientConfigBuilder::new()`](ClientConfigBuilder::new)) to construct a config:
//!
//! ```rust,no_run
//! use hazelcast_client::{ClientConfig, ReconnectMode};
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder()
//!     .cluster_name("production")
//!     .add_address("10.0.0.1:5701".parse().unwrap())
//!     .credentials("admin", "secret")
//!     .network(|n| n
//!         .connection_timeout(Duration::from_secs(10))
//!         .reconnect_mode(ReconnectMode::Async))
//!     .retry(|r| r
//!         .initial_backoff(Duration::from_millis(100))
//!         .max_backoff(Duration::from_secs(30))
//!         .multiplier(2.0))
//!     .invocation(|i| i.invocation_timeout(Duration::from_secs(60)))
//!     .build()
//!     .expect("invalid config");
//! ```
//!
//! # Listeners
//!
//! ```rust,no_run
//! # async fn example(client: &hazelcast_client::HazelcastClient) -> hazelcast_core::Result<()> {
//! use hazelcast_client::{EntryListenerConfig, FnEntryListener};
//!
//! let listener = FnEntryListener::builder()
//!     .on_added(|event| println!("added: {:?}", event.key))
//!     .build();
//! let id = client
//!     .add_entry_listener("my-map", EntryListenerConfig::new(), listener)
//!     .await?;
//! client.unsubscribe(id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub(crate) mod backoff;
mod client;
pub mod cluster;
pub mod config;
pub mod connection;
pub mod invocation;
pub mod listener;

pub use client::HazelcastClient;
pub use cluster::{
    partition_of, ClientInfo, ClusterService, LifecycleListenerRegistration, LifecycleService,
    Partition, PartitionService, PartitionTable,
};
pub use config::{
    ClientConfig, ClientConfigBuilder, ConfigError, InvocationConfig, InvocationConfigBuilder,
    NetworkConfig, NetworkConfigBuilder, ReconnectMode, RetryConfig, RetryConfigBuilder,
    SecurityConfig, SecurityConfigBuilder,
};
pub use connection::{
    Connection, ConnectionEvent, ConnectionId, ConnectionListener, ConnectionManager, Connector,
    LoadBalancer, RandomLoadBalancer, RoundRobinLoadBalancer, TcpConnector,
};
pub use hazelcast_core as core;
pub use invocation::{InvocationService, InvocationState, InvocationTarget};
pub use listener::{
    BoxedEntryListener, ClientState, EntryEvent, EntryEventType, EntryListener,
    EntryListenerCodec, EntryListenerConfig, EventHandler, FnEntryListener,
    FnEntryListenerBuilder, LifecycleEvent, ListenerId, ListenerMessageCodec, ListenerService,
    ListenerStats, MapEvent, MapListener, Member, MemberEvent, MemberEventType,
};
