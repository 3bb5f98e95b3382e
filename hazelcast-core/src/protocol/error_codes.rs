//! Error codes carried by error responses.
//!
//! Only the codes the client reacts to are named here; any other code is
//! surfaced to the caller unchanged inside a [`ServerError`](crate::ServerError).

/// Unknown or unmapped error.
pub const UNDEFINED: i32 = 0;
/// Authentication rejected.
pub const AUTHENTICATION: i32 = 3;
/// The calling member is no longer part of the cluster.
pub const CALLER_NOT_MEMBER: i32 = 8;
/// The operation was cancelled on the member.
pub const CANCELLATION: i32 = 9;
/// The distributed object was destroyed.
pub const DISTRIBUTED_OBJECT_DESTROYED: i32 = 14;
/// Generic member-side failure.
pub const HAZELCAST: i32 = 18;
/// The member is shutting down or not yet started.
pub const HAZELCAST_INSTANCE_NOT_ACTIVE: i32 = 19;
/// The member rejected the request because it is overloaded.
pub const HAZELCAST_OVERLOAD: i32 = 20;
/// Serialization failure on the member.
pub const HAZELCAST_SERIALIZATION: i32 = 21;
/// I/O failure on the member.
pub const IO: i32 = 22;
/// Invalid argument.
pub const ILLEGAL_ARGUMENT: i32 = 23;
/// Invalid state.
pub const ILLEGAL_STATE: i32 = 27;
/// The member left the cluster while executing the operation.
pub const MEMBER_LEFT: i32 = 33;
/// Operation timed out on the member.
pub const OPERATION_TIMEOUT: i32 = 38;
/// The partition is migrating; the operation was not executed.
pub const PARTITION_MIGRATING: i32 = 39;
/// Generic retryable failure.
pub const RETRYABLE_HAZELCAST: i32 = 46;
/// Retryable I/O failure.
pub const RETRYABLE_IO: i32 = 47;
/// The member the operation targeted disconnected.
pub const TARGET_DISCONNECTED: i32 = 52;
/// The targeted member is not part of the cluster.
pub const TARGET_NOT_MEMBER: i32 = 53;

/// Returns `true` if the member guarantees the failed operation was not
/// applied, so it can be retried even when it is not idempotent.
pub fn is_retry_safe(error_code: i32) -> bool {
    matches!(
        error_code,
        CALLER_NOT_MEMBER
            | HAZELCAST_INSTANCE_NOT_ACTIVE
            | MEMBER_LEFT
            | PARTITION_MIGRATING
            | RETRYABLE_HAZELCAST
            | RETRYABLE_IO
            | TARGET_DISCONNECTED
            | TARGET_NOT_MEMBER
    )
}
