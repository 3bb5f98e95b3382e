//! Connection management for Hazelcast client.

#[allow(clippy::module_inception)]
mod connection;
mod connector;
mod correlation;
mod load_balancer;
mod manager;

pub use connection::{Connection, ConnectionId};
pub use connector::{BoxedStream, Connector, MemberStream, TcpConnector};
pub use correlation::{CallOutcome, CorrelationIdGenerator, CorrelationRegistry, PendingCall};
pub use load_balancer::{
    default_load_balancer, LoadBalancer, RandomLoadBalancer, RoundRobinLoadBalancer,
};
pub use manager::{ConnectionEvent, ConnectionListener, ConnectionManager};

pub(crate) use connection::into_response;
