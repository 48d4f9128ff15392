//! Parsed mapping tables and strict field accessors
//!
//! Accessors never fall back to defaults: a missing or mistyped field is a
//! deployment error and is reported as such.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

pub type Node = Map<String, Value>;

/// A parsed mapping document. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MappingTable {
    name: Arc<str>,
    root: Arc<Node>,
}

impl MappingTable {
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::ConfigLoad {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        match value {
            Value::Object(root) => Ok(Self {
                name: Arc::from(name),
                root: Arc::new(root),
            }),
            other => Err(Error::ConfigLoad {
                name: name.to_string(),
                message: format!("top level must be an object, found {}", kind_of(&other)),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

fn field<'a>(node: &'a Node, key: &str) -> Result<&'a Value> {
    match node.get(key) {
        None | Some(Value::Null) => Err(Error::FieldMissing {
            key: key.to_string(),
        }),
        Some(value) => Ok(value),
    }
}

fn mismatch(key: &str, expected: &'static str, found: &Value) -> Error {
    Error::FieldTypeMismatch {
        key: key.to_string(),
        expected,
        found: kind_of(found),
    }
}

pub fn as_str<'a>(node: &'a Node, key: &str) -> Result<&'a str> {
    let value = field(node, key)?;
    value.as_str().ok_or_else(|| mismatch(key, "a string", value))
}

pub fn as_mapping<'a>(node: &'a Node, key: &str) -> Result<&'a Node> {
    let value = field(node, key)?;
    value.as_object().ok_or_else(|| mismatch(key, "an object", value))
}

pub fn as_sequence<'a>(node: &'a Node, key: &str) -> Result<&'a [Value]> {
    let value = field(node, key)?;
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| mismatch(key, "an array", value))
}

/// Optional string: absent is fine, present with the wrong type is not.
pub fn as_opt_str<'a>(node: &'a Node, key: &str) -> Result<Option<&'a str>> {
    match node.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(mismatch(key, "a string", other)),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
