// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Address Value Object
//!
//! A resource address is an ordered list of `(type, name)` segments naming one
//! node of the resource tree, written as `/stack=maximal2/transport=UDP`.
//! The empty address names the subsystem root.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address parse error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Segment is missing '=': {0}")]
    MissingSeparator(String),

    #[error("Segment has an empty type or name: {0}")]
    EmptyComponent(String),

    #[error("Invalid character in segment: {0}")]
    InvalidCharacter(char),
}

/// One `(type, name)` segment of an address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathElement {
    /// Resource type, e.g. `stack`
    pub key: String,

    /// Resource name within its type, e.g. `maximal2`
    pub value: String,
}

impl PathElement {
    /// Create a new segment with validation
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, AddressError> {
        let key = key.into();
        let value = value.into();

        if key.is_empty() || value.is_empty() {
            return Err(AddressError::EmptyComponent(format!("{}={}", key, value)));
        }

        for ch in key.chars().chain(value.chars()) {
            if ch == '/' || ch == '=' || ch.is_whitespace() {
                return Err(AddressError::InvalidCharacter(ch));
            }
        }

        Ok(Self { key, value })
    }

    /// Whether this segment has the given type
    pub fn is_type(&self, key: &str) -> bool {
        self.key == key
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl FromStr for PathElement {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| AddressError::MissingSeparator(s.to_string()))?;
        PathElement::new(key, value)
    }
}

/// Immutable address of a resource node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceAddress(Vec<PathElement>);

impl ResourceAddress {
    /// The subsystem root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build an address from `(type, name)` pairs
    ///
    /// ```rust
    /// use cim_stack_controller::address::ResourceAddress;
    ///
    /// let address = ResourceAddress::from_pairs(&[("stack", "tcp"), ("transport", "TCP")]).unwrap();
    /// assert_eq!(address.to_string(), "/stack=tcp/transport=TCP");
    /// ```
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, AddressError> {
        pairs
            .iter()
            .map(|(key, value)| PathElement::new(*key, *value))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Address of a child of this address
    pub fn append(&self, element: PathElement) -> Self {
        let mut segments = self.0.clone();
        segments.push(element);
        Self(segments)
    }

    /// Address of a child, validating the new segment
    pub fn child(&self, key: &str, value: &str) -> Result<Self, AddressError> {
        Ok(self.append(PathElement::new(key, value)?))
    }

    /// Parent address, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Leaf segment, `None` for the root
    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    /// Type of the leaf segment
    pub fn resource_type(&self) -> Option<&str> {
        self.last().map(|element| element.key.as_str())
    }

    /// Name of the leaf segment
    pub fn name(&self) -> Option<&str> {
        self.last().map(|element| element.value.as_str())
    }

    /// Value of the first segment with the given type
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|element| element.key == key)
            .map(|element| element.value.as_str())
    }

    /// All segments
    pub fn segments(&self) -> &[PathElement] {
        &self.0
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root address
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace the segment at `index`
    pub fn with_segment(&self, index: usize, element: PathElement) -> Self {
        let mut segments = self.0.clone();
        if index < segments.len() {
            segments[index] = element;
        }
        Self(segments)
    }

    /// Whether `self` equals or lies below `ancestor`
    pub fn starts_with(&self, ancestor: &ResourceAddress) -> bool {
        self.0.starts_with(&ancestor.0)
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for element in &self.0 {
            write!(f, "/{}", element)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('/')
            .filter(|segment| !segment.is_empty())
            .map(PathElement::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<Vec<PathElement>> for ResourceAddress {
    fn from(segments: Vec<PathElement>) -> Self {
        Self(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let address: ResourceAddress = "/stack=maximal2/transport=UDP".parse().unwrap();
        assert_eq!(address.len(), 2);
        assert_eq!(address.resource_type(), Some("transport"));
        assert_eq!(address.name(), Some("UDP"));
        assert_eq!(address.value_of("stack"), Some("maximal2"));
        assert_eq!(address.to_string(), "/stack=maximal2/transport=UDP");
    }

    #[test]
    fn test_root() {
        let root: ResourceAddress = "/".parse().unwrap();
        assert!(root.is_root());
        assert_eq!(root.parent(), None);
        assert_eq!(root.to_string(), "/");
    }

    #[test]
    fn test_parent_and_child() {
        let stack = ResourceAddress::from_pairs(&[("stack", "s1")]).unwrap();
        let transport = stack.child("transport", "TCP").unwrap();
        assert_eq!(transport.parent(), Some(stack.clone()));
        assert!(transport.starts_with(&stack));
        assert!(!stack.starts_with(&transport));
    }

    #[test]
    fn test_invalid_segments() {
        assert!("/stack".parse::<ResourceAddress>().is_err());
        assert!("/stack=".parse::<ResourceAddress>().is_err());
        assert!(PathElement::new("stack", "a b").is_err());
    }
}
