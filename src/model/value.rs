// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed Model Values
//!
//! Attribute values and operation parameters are carried as [`ModelValue`]s.
//! A string map is an `Object` whose values are all strings; a list of
//! objects is a `List` of `Object`s.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed configuration value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelValue {
    /// No value
    #[default]
    Undefined,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// String
    String(String),
    /// Ordered list
    List(Vec<ModelValue>),
    /// Keyed object
    Object(BTreeMap<String, ModelValue>),
}

impl ModelValue {
    /// Build an object from `(key, value)` pairs
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<ModelValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        ModelValue::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Whether a value is present
    pub fn is_defined(&self) -> bool {
        !matches!(self, ModelValue::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ModelValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ModelValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ModelValue]> {
        match self {
            ModelValue::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ModelValue>> {
        match self {
            ModelValue::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key of an object value
    pub fn get(&self, key: &str) -> Option<&ModelValue> {
        self.as_object().and_then(|entries| entries.get(key))
    }

    /// Interpret the value as a string→string map
    ///
    /// Accepts either an object of strings or a list of single-entry objects
    /// (`[{A => a}, {B => b}]`). Returns `None` for any other shape and for
    /// lists that repeat a key.
    pub fn to_string_map(&self) -> Option<BTreeMap<String, String>> {
        match self {
            ModelValue::Object(entries) => entries
                .iter()
                .map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect(),
            ModelValue::List(items) => {
                let mut map = BTreeMap::new();
                for item in items {
                    let entries = item.as_object()?;
                    if entries.len() != 1 {
                        return None;
                    }
                    for (key, value) in entries {
                        if map.insert(key.clone(), value.as_str()?.to_string()).is_some() {
                            return None;
                        }
                    }
                }
                Some(map)
            }
            _ => None,
        }
    }

    /// Name of the value's type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ModelValue::Undefined => "undefined",
            ModelValue::Bool(_) => "boolean",
            ModelValue::Int(_) => "int",
            ModelValue::String(_) => "string",
            ModelValue::List(_) => "list",
            ModelValue::Object(_) => "object",
        }
    }
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelValue::Undefined => write!(f, "undefined"),
            ModelValue::Bool(value) => write!(f, "{}", value),
            ModelValue::Int(value) => write!(f, "{}", value),
            ModelValue::String(value) => write!(f, "\"{}\"", value),
            ModelValue::List(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            ModelValue::Object(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}=>{}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for ModelValue {
    fn from(value: &str) -> Self {
        ModelValue::String(value.to_string())
    }
}

impl From<String> for ModelValue {
    fn from(value: String) -> Self {
        ModelValue::String(value)
    }
}

impl From<i64> for ModelValue {
    fn from(value: i64) -> Self {
        ModelValue::Int(value)
    }
}

impl From<i32> for ModelValue {
    fn from(value: i32) -> Self {
        ModelValue::Int(value as i64)
    }
}

impl From<bool> for ModelValue {
    fn from(value: bool) -> Self {
        ModelValue::Bool(value)
    }
}

impl From<Vec<ModelValue>> for ModelValue {
    fn from(values: Vec<ModelValue>) -> Self {
        ModelValue::List(values)
    }
}

impl From<BTreeMap<String, ModelValue>> for ModelValue {
    fn from(entries: BTreeMap<String, ModelValue>) -> Self {
        ModelValue::Object(entries)
    }
}

impl From<BTreeMap<String, String>> for ModelValue {
    fn from(entries: BTreeMap<String, String>) -> Self {
        ModelValue::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key, ModelValue::String(value)))
                .collect(),
        )
    }
}
