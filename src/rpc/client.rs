//! # RPC Client
//!
//! Blocking request/reply client for an [`RpcServer`](super::server::RpcServer).
//! Each call sends one `Call` message and waits, up to a timeout, for the
//! matching `Reply`.

use log::{debug, warn};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;

use crate::common::connection::Connection;
use crate::common::messages::{Message, Payload};
use crate::error::RpcError;

/// Default reply timeout for generic calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that can perform a remote call.
///
/// [`RpcClient`] is the TCP implementation; components that only need to
/// issue calls take a `Caller` so they can be driven by a stub in tests.
pub trait Caller: Send {
    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Payload, RpcError>;

    /// Drop any open connection.
    fn close(&mut self);
}

/// TCP RPC client.
pub struct RpcClient {
    host: String,
    port: u16,
    timeout: Duration,
    runtime: Runtime,
    conn: Option<Connection>,
}

impl RpcClient {
    /// Create a client for `host:port`. No connection is made until the
    /// first call.
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Result<Self, RpcError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            host: host.into(),
            port,
            timeout,
            runtime,
            conn: None,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}

impl Caller for RpcClient {
    /// Send one call and wait for its reply.
    ///
    /// Connecting and the whole round trip share the same timeout. On any
    /// failure the connection is dropped, so a late reply can never be
    /// mistaken for the answer to the next call.
    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Payload, RpcError> {
        let address = self.address();
        let timeout = self.timeout;
        let conn = self.conn.take();
        let request = Message::Call {
            name: name.to_string(),
            args,
        };

        let outcome = self
            .runtime
            .block_on(tokio::time::timeout(timeout, round_trip(conn, &address, &request)));

        match outcome {
            Ok(Ok((conn, payload))) => {
                self.conn = Some(conn);
                Ok(payload)
            }
            Ok(Err(e)) => {
                warn!("RPC call {} to {} failed: {}", name, address, e);
                Err(e)
            }
            Err(_) => {
                warn!("RPC call {} to {} timed out after {:?}", name, address, timeout);
                Err(RpcError::Timeout(timeout))
            }
        }
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!("Closed RPC connection to {}", self.address());
        }
    }
}

async fn round_trip(
    conn: Option<Connection>,
    address: &str,
    request: &Message,
) -> Result<(Connection, Payload), RpcError> {
    let mut conn = match conn {
        Some(conn) => conn,
        None => {
            debug!("Connecting to RPC server at {}", address);
            Connection::new(TcpStream::connect(address).await?)
        }
    };
    conn.write_message(request).await?;
    match conn.read_message().await? {
        Some(Message::Reply(payload)) => Ok((conn, payload)),
        Some(other) => Err(RpcError::Protocol(format!("{:?}", other))),
        None => Err(RpcError::ConnectionClosed),
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.close();
    }
}
