// Copyright (c) 2025 - Cowboy AI, Inc.
//! Management Model
//!
//! The resource tree and the typed values stored in it.
//!
//! # Structure
//!
//! ```text
//! subsystem=jgroups
//! ├── stack=udp
//! │   ├── transport=UDP
//! │   │   └── thread-pool=default
//! │   ├── protocol=PING
//! │   └── protocol=FLUSH
//! └── channel=ee   (stack => "udp")
//! ```
//!
//! Nodes are created atomically inside a single model-phase step. Children
//! keep their order, which is the protocol layering order of a stack.

pub mod attribute;
pub mod node;
pub mod tree;
pub mod value;

pub use attribute::{validate_parameters, AttributeDefinition, AttributeEffect, ValueType};
pub use node::{ResourceNode, ResourceSnapshot};
pub use tree::ResourceTree;
pub use value::ModelValue;
