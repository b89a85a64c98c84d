//! # Common Components
//!
//! Shared utilities and data structures used by both client and server components.
//!
//! ## Modules
//!
//! - [`messages`]: RPC message and image frame definitions
//! - [`connection`]: TCP connection abstraction with message framing
//! - [`config`]: YAML configuration loading and lookup
//! - [`clock`]: Injectable time source for wait loops and time control

pub mod clock;
pub mod config;
pub mod connection;
pub mod messages;
