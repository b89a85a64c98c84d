//! # RPC Transport
//!
//! Minimal request/reply RPC over TCP:
//!
//! - [`registry`]: explicit `"ClassName.method"` → handler table
//! - [`server`]: [`RpcServer`], one background thread per server, explicit stop
//! - [`client`]: [`RpcClient`], blocking calls with a reply timeout

pub mod client;
pub mod registry;
pub mod server;

pub use client::{Caller, RpcClient};
pub use registry::{Export, Handler, Registry};
pub use server::RpcServer;

/// Port used by `--rpc` when no port is given.
pub const DEFAULT_PORT: u16 = 60606;
