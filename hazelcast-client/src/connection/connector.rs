//! Transport seam: how the client obtains a byte stream to a member.

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use hazelcast_core::{HazelcastError, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// A bidirectional byte stream to a cluster member.
pub trait MemberStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> MemberStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// A boxed member stream.
pub type BoxedStream = Box<dyn MemberStream>;

/// Opens streams to cluster members.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to `address`.
    async fn connect(&self, address: SocketAddr) -> Result<BoxedStream>;
}

impl fmt::Debug for dyn Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Connector")
    }
}

/// Plain TCP connector with `TCP_NODELAY` set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, address: SocketAddr) -> Result<BoxedStream> {
        let stream = TcpStream::connect(address).await.map_err(|e| {
            HazelcastError::Connection(format!("failed to connect to {}: {}", address, e))
        })?;

        stream.set_nodelay(true).map_err(|e| {
            HazelcastError::Connection(format!("failed to set TCP_NODELAY: {}", e))
        })?;

        tracing::debug!(address = %address, "established tcp stream");
        Ok(Box::new(stream))
    }
}
