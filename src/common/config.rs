//! # Configuration Utilities
//!
//! Loading of the YAML configuration tree and lookups into it.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

use crate::error::ContextError;

/// Load a YAML configuration file that must contain a mapping.
///
/// An empty document is treated as an empty mapping.
///
/// # Returns
/// - `Ok(Mapping)`: Successfully loaded configuration
/// - `Err(ConfigLoad)`: File could not be opened or read
/// - `Err(ConfigFormat)`: File is not valid YAML or its root is not a mapping
///
/// # Example
/// ```ignore
/// let config = load_config(Path::new("config.yaml"))?;
/// ```
pub fn load_config(path: &Path) -> Result<Mapping, ContextError> {
    let content = fs::read_to_string(path).map_err(|source| ContextError::ConfigLoad {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content).map_err(|reason| ContextError::ConfigFormat {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_config(content: &str) -> Result<Mapping, String> {
    match serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string())? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(format!("root is {}", kind_of(&other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Look up a dotted path (`"camera.width"`) in a configuration tree.
pub fn lookup<'a>(config: &'a Mapping, dotted_path: &str) -> Option<&'a Value> {
    let mut keys = dotted_path.split('.');
    let mut current = config.get(keys.next()?)?;
    for key in keys {
        current = current.as_mapping()?.get(key)?;
    }
    Some(current)
}

/// Look up a TCP port. Values outside `0..=65535` or of another type count
/// as absent.
pub fn lookup_port(config: &Mapping, dotted_path: &str) -> Option<u16> {
    let port = lookup(config, dotted_path)?.as_u64()?;
    u16::try_from(port).ok()
}

/// Set `value` at a dotted path, requiring every intermediate node to exist
/// and be a mapping.
pub fn replace(tree: &mut Value, dotted_path: &str, value: Value) -> Result<(), String> {
    let mut current = tree;
    let mut keys = dotted_path.split('.').peekable();
    while let Some(key) = keys.next() {
        let mapping = current
            .as_mapping_mut()
            .ok_or_else(|| format!("'{}' is not inside a mapping", key))?;
        if keys.peek().is_none() {
            mapping.insert(Value::from(key), value);
            return Ok(());
        }
        current = mapping
            .get_mut(key)
            .ok_or_else(|| format!("missing key '{}'", key))?;
    }
    Err("empty path".to_string())
}
