//! # lumos
//!
//! Application bootstrap for computer vision programs, plus a small RPC
//! layer for publishing live images and collecting events remotely.
//!
//! ## Modules
//!
//! - [`context`]: options, configuration, logging, input source, application time
//! - [`rpc`]: call registry, TCP server thread and blocking client
//! - [`net`]: `ImageServer`, `ImageClient`, `EventLogger`
//! - [`device`]: input/output device capabilities
//! - [`common`]: wire messages, framing, YAML config helpers, clock
//! - [`shutdown`]: Ctrl+C handling for driver loops

pub mod common;
pub mod context;
pub mod device;
pub mod error;
pub mod net;
pub mod rpc;
pub mod shutdown;

pub use common::messages::{Frame, Payload};
pub use context::{Context, Options};
pub use error::{ContextError, RpcError};
pub use net::{EventLogger, EventLoggerOptions, ImageClient, ImageServer};
