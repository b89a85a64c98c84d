//! # Network Components
//!
//! RPC-enabled building blocks:
//!
//! - [`ImageServer`]: output device publishing the latest frame (`ImageServer.read`)
//! - [`ImageClient`]: input device reading frames from a remote `ImageServer`
//! - [`EventLogger`]: collects remote timestamped events into a file (`EventLogger.log`)
//!
//! All of them release their sockets, threads and files on `Drop`, so
//! holding one in a scope is enough to guarantee cleanup on early exit.

pub mod event_logger;
pub mod image_client;
pub mod image_server;

pub use event_logger::{EventLogger, EventLoggerOptions};
pub use image_client::ImageClient;
pub use image_server::ImageServer;
