use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while bringing up the process context.
///
/// Only these are propagated to the host program; every other startup
/// problem (logging, input source) degrades to a logged warning.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("a Context instance already exists in this process")]
    SingletonViolation,

    #[error("Context::get_instance() called before the context was created")]
    NotInitialized,

    #[error("cannot read config file {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is not a mapping: {reason}")]
    ConfigFormat { path: PathBuf, reason: String },

    #[error("RPC server error: {0}")]
    Rpc(#[from] RpcError),
}

/// Errors of the RPC transport.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("no reply within {0:?}")]
    Timeout(std::time::Duration),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("unexpected message: {0}")]
    Protocol(String),

    #[error("cannot start RPC server on port {port}: {reason}")]
    ServerStart { port: u16, reason: String },
}
