//! # Image Client
//!
//! Polls a remote [`ImageServer`](super::image_server::ImageServer) and
//! behaves like any other input device: `read()` yields frames until the
//! stream ends.

use log::{debug, warn};
use std::time::Duration;

use super::image_server::{DEFAULT_PORT, DEFAULT_READ_CALL};
use crate::common::messages::{Frame, Payload};
use crate::context::input_source::Endpoint;
use crate::device::InputDevice;
use crate::error::RpcError;
use crate::rpc::{Caller, RpcClient};

/// Reply timeout for image reads. Large enough for a remote producer to
/// start up, small enough that a finished stream does not hang the reader.
pub const IMAGE_RECV_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_HOST: &str = "127.0.0.1";

pub struct ImageClient<C: Caller = RpcClient> {
    caller: C,
    read_call: String,
}

impl ImageClient<RpcClient> {
    /// Client for the image server at `host:port` with default settings.
    pub fn new(host: &str, port: u16) -> Result<Self, RpcError> {
        Self::with_timeout(host, port, IMAGE_RECV_TIMEOUT)
    }

    pub fn with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self, RpcError> {
        let caller = RpcClient::new(host, port, timeout)?;
        Ok(Self::with_caller(caller, DEFAULT_READ_CALL))
    }

    /// Client for a classified remote input source; a missing port means
    /// the default image server port.
    pub fn for_endpoint(endpoint: &Endpoint) -> Result<Self, RpcError> {
        Self::new(&endpoint.host, endpoint.port.unwrap_or(DEFAULT_PORT))
    }
}

impl<C: Caller> ImageClient<C> {
    /// Client issuing `read_call` through an arbitrary caller.
    pub fn with_caller(caller: C, read_call: impl Into<String>) -> Self {
        Self {
            caller,
            read_call: read_call.into(),
        }
    }

    pub fn read_call(&self) -> &str {
        &self.read_call
    }

    /// Fetch the current remote image.
    ///
    /// `None` means the stream is over: the server returned no image, a
    /// malformed image, an unexpected reply, or did not answer in time.
    pub fn read(&mut self) -> Option<Frame> {
        match self.caller.call(&self.read_call, Vec::new()) {
            Ok(Payload::Image(frame)) if frame.is_valid() => Some(frame),
            Ok(Payload::Image(frame)) => {
                warn!(
                    "{} returned a {}x{}x{} image with {} bytes",
                    self.read_call,
                    frame.width,
                    frame.height,
                    frame.channels,
                    frame.data.len()
                );
                None
            }
            Ok(other) => {
                debug!("{} returned no image: {:?}", self.read_call, other);
                None
            }
            Err(e) => {
                debug!("{} failed: {}", self.read_call, e);
                None
            }
        }
    }

    /// Close the connection, matching the capture-device convention.
    pub fn release(&mut self) {
        self.caller.close();
    }
}

impl<C: Caller> InputDevice for ImageClient<C> {
    fn read(&mut self) -> Option<Frame> {
        ImageClient::read(self)
    }

    fn release(&mut self) {
        ImageClient::release(self);
    }
}

impl<C: Caller> Drop for ImageClient<C> {
    fn drop(&mut self) {
        self.caller.close();
    }
}
