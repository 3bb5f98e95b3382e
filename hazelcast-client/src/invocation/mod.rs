//! Request routing, retries and deadlines.

mod service;

use std::fmt;

use uuid::Uuid;

use crate::connection::ConnectionId;

pub use service::InvocationService;

/// Where an invocation should be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationTarget {
    /// The owner of a partition. Falls back to any connection when the owner
    /// is unknown or not connected, or when smart routing is off.
    Partition(i32),
    /// A specific cluster member.
    Member(Uuid),
    /// A specific connection. Never re-routed.
    Connection(ConnectionId),
    /// Any connection chosen by the load balancer.
    Random,
}

impl fmt::Display for InvocationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partition(id) => write!(f, "partition {}", id),
            Self::Member(uuid) => write!(f, "member {}", uuid),
            Self::Connection(id) => write!(f, "{}", id),
            Self::Random => f.write_str("any member"),
        }
    }
}

/// Progress of a single invocation.
///
/// ```text
/// Created -> Sent -> Completed
///               \--> Failed
///               \--> Retrying -> Sent ...
/// (any) -> TimedOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationState {
    /// Not yet written to any connection.
    Created,
    /// Written, waiting for the response.
    Sent,
    /// Waiting before the next attempt.
    Retrying,
    /// A response arrived.
    Completed,
    /// Failed with a non-retryable error.
    Failed,
    /// The deadline elapsed.
    TimedOut,
}

impl InvocationState {
    /// Returns `true` for states an invocation never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Sent => "sent",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
        };
        f.write_str(name)
    }
}
