//! # Image Server
//!
//! Publishes the most recently written frame to remote readers.
//!
//! The writer overwrites a single slot (latest frame wins, no queue). Remote
//! clients call `ImageServer.read`. The very first read waits, for a bounded
//! time, until a frame is available so that clients started before the
//! producer do not immediately see "no image"; every later read returns
//! the slot as-is.

use log::{debug, info};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::common::clock::{Clock, SystemClock};
use crate::common::messages::{Frame, Payload};
use crate::device::OutputDevice;
use crate::error::RpcError;
use crate::rpc::{Export, Handler, Registry, RpcServer};

pub const DEFAULT_PORT: u16 = 61616;
pub const DEFAULT_READ_CALL: &str = "ImageServer.read";
/// Poll interval of the first-read wait.
pub const WAIT_INTERVAL: Duration = Duration::from_millis(100);
/// Upper bound of the first-read wait.
pub const MAX_WAIT_DURATION: Duration = Duration::from_secs(2);

struct Slot {
    image: Option<Frame>,
    /// True until the first read has been answered.
    is_fresh: bool,
}

/// State shared between the writer and the RPC handler thread.
struct Shared {
    slot: Mutex<Slot>,
    clock: Arc<dyn Clock>,
    wait_interval: Duration,
    max_wait: Duration,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Option<Frame> {
        {
            let mut slot = self.slot();
            if !slot.is_fresh || slot.image.is_some() {
                slot.is_fresh = false;
                return slot.image.clone();
            }
        }

        debug!("Waiting up to {:?} for the first image", self.max_wait);
        let started = self.clock.now();
        while self.slot().image.is_none()
            && self.clock.now().saturating_duration_since(started) < self.max_wait
        {
            self.clock.sleep(self.wait_interval);
        }

        let mut slot = self.slot();
        slot.is_fresh = false;
        slot.image.clone()
    }
}

/// Image output device served over RPC.
pub struct ImageServer {
    shared: Arc<Shared>,
    server: Option<RpcServer>,
    /// Registries this server was exported onto with [`ImageServer::export_on`].
    exported: Vec<Registry>,
}

impl ImageServer {
    /// Create a server and start serving it on `port`.
    pub fn new(port: u16) -> Result<Self, RpcError> {
        let mut image_server = Self::detached();
        let registry = Registry::new();
        registry.export(&image_server);
        image_server.server = Some(RpcServer::start(port, registry)?);
        info!("ImageServer publishing on port {}", image_server.port().unwrap_or(port));
        Ok(image_server)
    }

    /// Create a server without its own RPC thread. Export it onto an
    /// existing [`RpcServer`] to make it reachable.
    pub fn detached() -> Self {
        Self::with_clock(Arc::new(SystemClock), WAIT_INTERVAL, MAX_WAIT_DURATION)
    }

    /// Detached server with explicit wait timing.
    pub fn with_clock(clock: Arc<dyn Clock>, wait_interval: Duration, max_wait: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    image: None,
                    is_fresh: true,
                }),
                clock,
                wait_interval,
                max_wait,
            }),
            server: None,
            exported: Vec::new(),
        }
    }

    /// Port of the server this instance started, if any.
    pub fn port(&self) -> Option<u16> {
        self.server.as_ref().map(RpcServer::port)
    }

    /// Store `frame` as the current image. Never blocks on readers.
    pub fn write(&self, frame: Frame) {
        self.shared.slot().image = Some(frame);
    }

    /// Current image; the first call may wait for one (see module docs).
    pub fn read(&self) -> Option<Frame> {
        self.shared.read()
    }

    /// Export `ImageServer.read` onto a shared registry, such as the one of
    /// the context's `--rpc` server. [`ImageServer::stop`] removes it again.
    pub fn export_on(&mut self, registry: &Registry) {
        registry.export(&*self);
        self.exported.push(registry.clone());
    }

    /// Clear the image so further reads see "done", withdraw it from shared
    /// registries and stop the RPC server if this instance started one.
    /// Idempotent.
    pub fn stop(&mut self) {
        self.shared.slot().image = None;
        for registry in self.exported.drain(..) {
            registry.unexport(<Self as Export>::CLASS_NAME);
        }
        if let Some(mut server) = self.server.take() {
            server.stop();
            info!("ImageServer stopped");
        }
    }
}

impl Export for ImageServer {
    const CLASS_NAME: &'static str = "ImageServer";

    fn handlers(&self) -> Vec<(&'static str, Handler)> {
        let shared = Arc::clone(&self.shared);
        let read: Handler = Arc::new(move |_args: Vec<Value>| match shared.read() {
            Some(frame) => Payload::Image(frame),
            None => Payload::Empty,
        });
        vec![("read", read)]
    }
}

impl OutputDevice for ImageServer {
    fn write(&mut self, frame: Frame) {
        ImageServer::write(self, frame);
    }

    fn stop(&mut self) {
        ImageServer::stop(self);
    }
}

impl Drop for ImageServer {
    fn drop(&mut self) {
        self.stop();
    }
}
