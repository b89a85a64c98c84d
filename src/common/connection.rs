//! # TCP Connection Abstraction
//!
//! Wraps a TCP stream with message framing for the RPC protocol.
//!
//! ## Wire Protocol
//!
//! Messages are sent with a 4-byte length prefix (big-endian) followed by JSON data:
//! ```text
//! [4 bytes: message length] [N bytes: JSON message data]
//! ```

use log::error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::messages::Message;
use crate::error::RpcError;

/// Maximum allowed message size (100MB) to prevent memory exhaustion.
const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// TCP connection wrapper with message framing support.
pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        // Replies are small and latency-bound; don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);
        Self { stream }
    }

    /// Read a message from the connection.
    ///
    /// # Returns
    /// - `Ok(Some(Message))`: Successfully read and deserialized a message
    /// - `Ok(None)`: Connection closed cleanly, oversized frame, or undecodable payload
    /// - `Err`: I/O error while reading the message body
    pub async fn read_message(&mut self) -> Result<Option<Message>, RpcError> {
        let mut length_buf = [0u8; 4];

        match self.stream.read_exact(&mut length_buf).await {
            Ok(_) => {
                let length = u32::from_be_bytes(length_buf) as usize;

                if length > MAX_MESSAGE_SIZE {
                    error!(
                        "Message too large: {} bytes (max: {} bytes)",
                        length, MAX_MESSAGE_SIZE
                    );
                    return Ok(None);
                }

                let mut data = vec![0u8; length];
                self.stream.read_exact(&mut data).await?;

                match Message::from_bytes(&data) {
                    Ok(msg) => Ok(Some(msg)),
                    Err(e) => {
                        error!("Failed to deserialize message: {}", e);
                        Ok(None)
                    }
                }
            }
            Err(_) => Ok(None), // Connection closed
        }
    }

    /// Write a message to the connection.
    ///
    /// Serializes to JSON, writes the length prefix and the body, then flushes.
    pub async fn write_message(&mut self, message: &Message) -> Result<(), RpcError> {
        let data = message.to_bytes()?;
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(RpcError::Protocol(format!(
                "outgoing message of {} bytes exceeds {} bytes",
                data.len(),
                MAX_MESSAGE_SIZE
            )));
        }
        let length = data.len() as u32;

        self.stream.write_all(&length.to_be_bytes()).await?;
        self.stream.write_all(&data).await?;
        self.stream.flush().await?;

        Ok(())
    }
}
