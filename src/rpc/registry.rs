//! # Call Registry
//!
//! Explicit table from call name to handler. Objects describe their remotely
//! callable methods through [`Export`]; the registry prefixes each method
//! with the object's class name, giving names like `"ImageServer.read"`.

use log::debug;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::common::messages::Payload;

/// A remotely callable function: positional JSON arguments in, payload out.
pub type Handler = Arc<dyn Fn(Vec<Value>) -> Payload + Send + Sync>;

/// An object that exposes methods over RPC.
pub trait Export {
    /// Prefix for every call name this object registers.
    const CLASS_NAME: &'static str;

    /// `(method name, handler)` pairs, without the class prefix.
    fn handlers(&self) -> Vec<(&'static str, Handler)>;
}

/// Shared call table. Clones refer to the same table, so objects can be
/// exported onto a server that is already running.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: Arc<RwLock<HashMap<String, Handler>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the call name for `method` on class `class_name`.
    pub fn call_name(class_name: &str, method: &str) -> String {
        format!("{}.{}", class_name, method)
    }

    /// Register a single handler under an explicit call name.
    pub fn register(&self, name: impl Into<String>, handler: Handler) {
        let name = name.into();
        debug!("Registering RPC call {}", name);
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.insert(name, handler);
    }

    /// Register every method of `object` as `"<CLASS_NAME>.<method>"`.
    pub fn export<E: Export>(&self, object: &E) {
        for (method, handler) in object.handlers() {
            self.register(Self::call_name(E::CLASS_NAME, method), handler);
        }
    }

    /// Remove every call registered for `class_name`.
    pub fn unexport(&self, class_name: &str) {
        let prefix = format!("{}.", class_name);
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.retain(|name, _| !name.starts_with(&prefix));
    }

    pub fn lookup(&self, name: &str) -> Option<Handler> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.get(name).cloned()
    }

    /// Dispatch a call. Unknown names produce an error payload.
    pub fn dispatch(&self, name: &str, args: Vec<Value>) -> Payload {
        match self.lookup(name) {
            Some(handler) => handler(args),
            None => Payload::Error(format!("unknown method '{}'", name)),
        }
    }

    pub fn names(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
