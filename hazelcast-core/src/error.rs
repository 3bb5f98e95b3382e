//! Error types for Hazelcast operations.

use std::fmt;
use std::io;
use thiserror::Error;

use crate::protocol::error_codes;

/// The main error type for Hazelcast operations.
///
/// Variants map onto the failure classes the invocation engine distinguishes:
/// transient connection failures, structured server errors, framing errors,
/// client-state errors and timeouts.
#[derive(Debug, Error)]
pub enum HazelcastError {
    /// Transient connection failure (no usable connection, write failed,
    /// socket closed before the request left the client).
    #[error("connection error: {0}")]
    Connection(String),

    /// The connection carrying a request closed before its response arrived.
    #[error("target disconnected: {0}")]
    TargetDisconnected(String),

    /// Malformed or truncated wire data. Fatal to the connection it came from.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A structured error returned by a cluster member.
    #[error("server error: {0}")]
    Server(Box<ServerError>),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The overall invocation deadline elapsed.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// The client is not connected or is shutting down.
    #[error("client not active: {0}")]
    ClientNotActive(String),

    /// Authentication errors (invalid credentials, failed login).
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Configuration errors (invalid settings).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl HazelcastError {
    /// Returns `true` if the operation may be retried regardless of whether it
    /// is idempotent: the request either never reached a member or the member
    /// reported that it did not execute it.
    pub fn is_retry_safe(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Server(server) => server.is_retryable(),
            _ => false,
        }
    }

    /// Returns `true` if the operation may be retried given whether redoing a
    /// possibly-executed operation is acceptable.
    pub fn is_retryable_for(&self, redo: bool) -> bool {
        match self {
            Self::TargetDisconnected(_) | Self::Io(_) => redo,
            other => other.is_retry_safe(),
        }
    }

    /// Returns the server error details if this is a [`HazelcastError::Server`].
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Self::Server(server) => Some(server),
            _ => None,
        }
    }

    /// Returns `true` for [`HazelcastError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<ServerError> for HazelcastError {
    fn from(error: ServerError) -> Self {
        Self::Server(Box::new(error))
    }
}

/// One frame of a remote stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTraceElement {
    /// Declaring class of the frame.
    pub class_name: String,
    /// Method name of the frame.
    pub method_name: String,
    /// Source file, if the member reported one.
    pub file_name: Option<String>,
    /// Line number (negative when unknown).
    pub line_number: i32,
}

impl fmt::Display for StackTraceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_name {
            Some(file) => write!(
                f,
                "{}.{}({}:{})",
                self.class_name, self.method_name, file, self.line_number
            ),
            None => write!(f, "{}.{}(Unknown Source)", self.class_name, self.method_name),
        }
    }
}

/// A structured error reported by a cluster member.
///
/// The first holder of an error response is the outermost error; `causes`
/// holds the remaining holders in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Protocol error code.
    pub error_code: i32,
    /// Fully qualified class name of the remote exception.
    pub class_name: String,
    /// Remote exception message.
    pub message: Option<String>,
    /// Remote stack trace.
    pub stack_trace: Vec<StackTraceElement>,
    /// Nested causes reported after the outermost error.
    pub causes: Vec<ServerError>,
}

impl ServerError {
    /// Creates a server error without stack trace or causes.
    pub fn new(error_code: i32, class_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            error_code,
            class_name: class_name.into(),
            message,
            stack_trace: Vec::new(),
            causes: Vec::new(),
        }
    }

    /// Returns `true` if the member marked this error as safe to retry.
    pub fn is_retryable(&self) -> bool {
        error_codes::is_retry_safe(self.error_code)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.class_name, self.error_code)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// A specialized `Result` type for Hazelcast operations.
pub type Result<T> = std::result::Result<T, HazelcastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_display() {
        let err = HazelcastError::Connection("failed to connect to server".to_string());
        assert_eq!(
            err.to_string(),
            "connection error: failed to connect to server"
        );
    }

    #[test]
    fn test_protocol_error_display() {
        let err = HazelcastError::Protocol("invalid message format".to_string());
        assert_eq!(err.to_string(), "protocol error: invalid message format");
    }

    #[test]
    fn test_timeout_error_display() {
        let err = HazelcastError::Timeout("invocation timed out after 30s".to_string());
        assert_eq!(
            err.to_string(),
            "timeout error: invocation timed out after 30s"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_server_error_display() {
        let err: HazelcastError = ServerError::new(
            error_codes::ILLEGAL_ARGUMENT,
            "java.lang.IllegalArgumentException",
            Some("bad key".to_string()),
        )
        .into();
        assert_eq!(
            err.to_string(),
            "server error: java.lang.IllegalArgumentException (code 23): bad key"
        );
    }

    #[test]
    fn test_connection_errors_are_retry_safe() {
        assert!(HazelcastError::Connection("no connection".into()).is_retry_safe());
        assert!(HazelcastError::Connection("no connection".into()).is_retryable_for(false));
    }

    #[test]
    fn test_target_disconnected_needs_redo() {
        let err = HazelcastError::TargetDisconnected("closed".into());
        assert!(!err.is_retry_safe());
        assert!(!err.is_retryable_for(false));
        assert!(err.is_retryable_for(true));
    }

    #[test]
    fn test_server_error_retryability_follows_code() {
        let retryable: HazelcastError =
            ServerError::new(error_codes::PARTITION_MIGRATING, "PartitionMigratingException", None)
                .into();
        let fatal: HazelcastError =
            ServerError::new(error_codes::ILLEGAL_STATE, "IllegalStateException", None).into();

        assert!(retryable.is_retry_safe());
        assert!(!fatal.is_retry_safe());
        assert!(!fatal.is_retryable_for(true));
    }

    #[test]
    fn test_client_state_errors_never_retry() {
        assert!(!HazelcastError::ClientNotActive("shutdown".into()).is_retryable_for(true));
        assert!(!HazelcastError::Timeout("t".into()).is_retryable_for(true));
        assert!(!HazelcastError::Cancelled("c".into()).is_retryable_for(true));
        assert!(!HazelcastError::Protocol("p".into()).is_retryable_for(true));
    }

    #[test]
    fn test_stack_trace_element_display() {
        let element = StackTraceElement {
            class_name: "com.hazelcast.map.impl.MapService".to_string(),
            method_name: "put".to_string(),
            file_name: Some("MapService.java".to_string()),
            line_number: 42,
        };
        assert_eq!(
            element.to_string(),
            "com.hazelcast.map.impl.MapService.put(MapService.java:42)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let err: HazelcastError = io_err.into();
        assert!(matches!(err, HazelcastError::Io(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HazelcastError>();
    }
}
