// Copyright (c) 2025 - Cowboy AI, Inc.
//! Legacy Alias Resolution
//!
//! Older management clients address the protocol stack through a flat,
//! legacy shape: a stack has a singleton `transport=TRANSPORT` child and the
//! protocol type is a `type` parameter. The canonical model keys the transport
//! child by its protocol type instead. The resolver maps between the two so
//! that every canonical mutation is visible through the legacy view and the
//! other way around.
//!
//! # Architecture
//!
//! ```text
//! legacy address ──resolve──> canonical address ──project──> {canonical, legacy...}
//!                               │
//!                   AddressAlias { parent_type, legacy, canonical_type, key }
//!
//! legacy attribute ──forward──> canonical attribute
//!                  <──inverse──
//! ```
//!
//! Address alias keys name the canonical child in one of three ways:
//!
//! - [`AliasKey::Fixed`]: always the same canonical name
//! - [`AliasKey::ExistingChild`]: the single existing child of the canonical type
//! - [`AliasKey::FromParameter`]: on add, taken (and consumed) from a parameter;
//!   otherwise the existing child
//!
//! Registration rejects cycles among fixed aliases and attribute transform
//! pairs that do not round trip their sample values in both directions.
//! Nothing is re-checked per request.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::address::{PathElement, ResourceAddress};
use crate::errors::{ControllerError, ControllerResult};
use crate::model::{ModelValue, ResourceSnapshot, ResourceTree};
use crate::operation::{Operation, OperationKind};

/// Resource type of the tree root
pub const ROOT_TYPE: &str = "subsystem";

/// Value conversion between the legacy and canonical form of an attribute
pub type ValueTransform = Arc<dyn Fn(&ModelValue) -> Option<ModelValue> + Send + Sync>;

/// How an address alias picks the canonical child name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasKey {
    Fixed(String),
    ExistingChild,
    FromParameter(String),
}

/// Maps a legacy child segment onto a canonical child type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressAlias {
    /// Type of the parent the legacy segment appears under
    pub parent_type: String,
    pub legacy: PathElement,
    pub canonical_type: String,
    pub key: AliasKey,
    /// Legacy add replaces an existing child of another name in one step
    pub replaces_existing: bool,
}

impl AddressAlias {
    pub fn new(
        parent_type: impl Into<String>,
        legacy: PathElement,
        canonical_type: impl Into<String>,
        key: AliasKey,
    ) -> Self {
        Self {
            parent_type: parent_type.into(),
            legacy,
            canonical_type: canonical_type.into(),
            key,
            replaces_existing: false,
        }
    }

    pub fn replacing(mut self) -> Self {
        self.replaces_existing = true;
        self
    }

    fn matches(&self, parent_type: &str, element: &PathElement) -> bool {
        self.parent_type == parent_type && &self.legacy == element
    }
}

/// Maps a legacy attribute name onto a canonical attribute
#[derive(Clone)]
pub struct AttributeAlias {
    pub resource_type: String,
    pub legacy_name: String,
    pub canonical_name: String,
    forward: ValueTransform,
    inverse: ValueTransform,
    identity: bool,
    samples: Vec<ModelValue>,
    canonical_samples: Vec<ModelValue>,
}

impl fmt::Debug for AttributeAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeAlias")
            .field("resource_type", &self.resource_type)
            .field("legacy_name", &self.legacy_name)
            .field("canonical_name", &self.canonical_name)
            .field("identity", &self.identity)
            .field("samples", &self.samples)
            .field("canonical_samples", &self.canonical_samples)
            .finish()
    }
}

impl AttributeAlias {
    /// Alias with a transform pair; `forward` maps legacy values to canonical ones
    ///
    /// A transform is partial: `None` means the value has no counterpart in
    /// the other form. Registration requires sample values in both forms.
    pub fn new<F, I>(
        resource_type: impl Into<String>,
        legacy_name: impl Into<String>,
        canonical_name: impl Into<String>,
        forward: F,
        inverse: I,
    ) -> Self
    where
        F: Fn(&ModelValue) -> Option<ModelValue> + Send + Sync + 'static,
        I: Fn(&ModelValue) -> Option<ModelValue> + Send + Sync + 'static,
    {
        Self {
            resource_type: resource_type.into(),
            legacy_name: legacy_name.into(),
            canonical_name: canonical_name.into(),
            forward: Arc::new(forward),
            inverse: Arc::new(inverse),
            identity: false,
            samples: Vec::new(),
            canonical_samples: Vec::new(),
        }
    }

    /// Plain rename, values unchanged
    pub fn rename(
        resource_type: impl Into<String>,
        legacy_name: impl Into<String>,
        canonical_name: impl Into<String>,
    ) -> Self {
        let mut alias = Self::new(
            resource_type,
            legacy_name,
            canonical_name,
            |value| Some(value.clone()),
            |value| Some(value.clone()),
        );
        alias.identity = true;
        alias
    }

    /// Legacy-form values checked for a lossless round trip at registration
    pub fn with_samples(mut self, samples: Vec<ModelValue>) -> Self {
        self.samples = samples;
        self
    }

    /// Canonical-form values checked for a lossless round trip at registration
    ///
    /// Samples without a legacy form are allowed; they must map to `None`.
    pub fn with_canonical_samples(mut self, samples: Vec<ModelValue>) -> Self {
        self.canonical_samples = samples;
        self
    }

    /// Convert a legacy value into the canonical form
    pub fn to_canonical(&self, value: &ModelValue) -> ControllerResult<ModelValue> {
        if !value.is_defined() {
            return Ok(ModelValue::Undefined);
        }
        (self.forward)(value).ok_or_else(|| ControllerError::InvalidValue {
            name: self.legacy_name.clone(),
            reason: format!("{} cannot be expressed as {}", value, self.canonical_name),
        })
    }

    /// Convert a canonical value into the legacy form
    pub fn to_legacy(&self, value: &ModelValue) -> ControllerResult<ModelValue> {
        if !value.is_defined() {
            return Ok(ModelValue::Undefined);
        }
        (self.inverse)(value).ok_or_else(|| ControllerError::InvalidValue {
            name: self.legacy_name.clone(),
            reason: format!("{} {} has no {} form", self.canonical_name, value, self.legacy_name),
        })
    }

    fn mismatch(&self, value: &ModelValue) -> ControllerError {
        ControllerError::AliasTransformMismatch {
            alias: format!("{}:{}", self.resource_type, self.legacy_name),
            value: value.to_string(),
        }
    }

    fn check_round_trip(&self) -> ControllerResult<()> {
        if self.identity {
            return Ok(());
        }
        if self.samples.is_empty() || self.canonical_samples.is_empty() {
            return Err(ControllerError::Validation(format!(
                "attribute alias {} on {} needs legacy and canonical sample values",
                self.legacy_name, self.resource_type
            )));
        }

        for sample in &self.samples {
            let round_trip = (self.forward)(sample).and_then(|canonical| (self.inverse)(&canonical));
            if round_trip.as_ref() != Some(sample) {
                return Err(self.mismatch(sample));
            }
        }
        for sample in &self.canonical_samples {
            if let Some(legacy) = (self.inverse)(sample) {
                if (self.forward)(&legacy).as_ref() != Some(sample) {
                    return Err(self.mismatch(sample));
                }
            }
        }
        Ok(())
    }
}

/// Operation rewritten onto the canonical model
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOperation {
    pub operation: Operation,
    /// Existing child a legacy add replaces within the same step
    pub replaces: Option<ResourceAddress>,
    /// Legacy attribute name a read should be presented through
    pub legacy_attribute: Option<String>,
}

/// Bidirectional mapping between legacy and canonical names
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    address_aliases: Vec<AddressAlias>,
    attribute_aliases: Vec<AttributeAlias>,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.address_aliases.is_empty() && self.attribute_aliases.is_empty()
    }

    /// Register an address alias, rejecting duplicates and fixed cycles
    pub fn register_address(&mut self, alias: AddressAlias) -> ControllerResult<()> {
        if self.address_alias(&alias.parent_type, &alias.legacy).is_some() {
            return Err(ControllerError::Validation(format!(
                "alias {} under {} is already registered",
                alias.legacy, alias.parent_type
            )));
        }

        let mut target = alias.clone();
        let mut hops = 0;
        while let AliasKey::Fixed(name) = &target.key {
            let element = PathElement::new(target.canonical_type.clone(), name.clone())?;
            if element == alias.legacy {
                return Err(ControllerError::AliasCycle(format!(
                    "{} under {}",
                    alias.legacy, alias.parent_type
                )));
            }
            match self.address_alias(&alias.parent_type, &element) {
                Some(next) if hops <= self.address_aliases.len() => {
                    target = next.clone();
                    hops += 1;
                }
                _ => break,
            }
        }

        debug!(legacy = %alias.legacy, canonical = %alias.canonical_type, "address alias registered");
        self.address_aliases.push(alias);
        Ok(())
    }

    /// Register an attribute alias after checking its transform pair
    pub fn register_attribute(&mut self, alias: AttributeAlias) -> ControllerResult<()> {
        if self
            .attribute_alias(&alias.resource_type, &alias.legacy_name)
            .is_some()
        {
            return Err(ControllerError::Validation(format!(
                "attribute alias {} on {} is already registered",
                alias.legacy_name, alias.resource_type
            )));
        }

        let mut name = alias.canonical_name.clone();
        let mut hops = 0;
        loop {
            if name == alias.legacy_name {
                return Err(ControllerError::AliasCycle(format!(
                    "attribute {} on {}",
                    alias.legacy_name, alias.resource_type
                )));
            }
            match self.attribute_alias(&alias.resource_type, &name) {
                Some(next) if hops <= self.attribute_aliases.len() => {
                    name = next.canonical_name.clone();
                    hops += 1;
                }
                _ => break,
            }
        }

        alias.check_round_trip()?;
        debug!(legacy = %alias.legacy_name, canonical = %alias.canonical_name, "attribute alias registered");
        self.attribute_aliases.push(alias);
        Ok(())
    }

    fn address_alias(&self, parent_type: &str, element: &PathElement) -> Option<&AddressAlias> {
        self.address_aliases
            .iter()
            .find(|alias| alias.matches(parent_type, element))
    }

    fn attribute_alias(&self, resource_type: &str, name: &str) -> Option<&AttributeAlias> {
        self.attribute_aliases
            .iter()
            .find(|alias| alias.resource_type == resource_type && alias.legacy_name == name)
    }

    /// Chain of aliases from a legacy attribute name down to the canonical one
    fn attribute_chain(&self, resource_type: &str, name: &str) -> Vec<&AttributeAlias> {
        let mut chain = Vec::new();
        let mut current = name;
        while let Some(alias) = self.attribute_alias(resource_type, current) {
            if chain.len() > self.attribute_aliases.len() {
                break;
            }
            chain.push(alias);
            current = &alias.canonical_name;
        }
        chain
    }

    /// Canonical address for an existing resource
    pub fn resolve(&self, address: &ResourceAddress, tree: &ResourceTree) -> ControllerResult<ResourceAddress> {
        self.resolve_segments(address, tree, None)
            .map(|(canonical, _)| canonical)
    }

    fn resolve_segments(
        &self,
        address: &ResourceAddress,
        tree: &ResourceTree,
        mut add_parameters: Option<&mut BTreeMap<String, ModelValue>>,
    ) -> ControllerResult<(ResourceAddress, Option<ResourceAddress>)> {
        let mut canonical = ResourceAddress::root();
        let mut replaces = None;
        let last = address.len().saturating_sub(1);

        for (index, element) in address.segments().iter().enumerate() {
            let parent_type = canonical.resource_type().unwrap_or(ROOT_TYPE).to_string();
            let mut current = element.clone();
            let mut hops = 0;

            while let Some(alias) = self.address_alias(&parent_type, &current) {
                hops += 1;
                if hops > self.address_aliases.len() {
                    return Err(ControllerError::AliasCycle(current.to_string()));
                }
                let adding = index == last && add_parameters.is_some();
                current = match (&alias.key, add_parameters.as_deref_mut()) {
                    (AliasKey::Fixed(name), _) => PathElement::new(alias.canonical_type.clone(), name.clone())?,
                    (AliasKey::FromParameter(parameter), Some(parameters)) if adding => {
                        let value = parameters
                            .remove(parameter)
                            .ok_or_else(|| ControllerError::MissingParameter(parameter.clone()))?;
                        let name = value.as_str().ok_or_else(|| ControllerError::InvalidValue {
                            name: parameter.clone(),
                            reason: format!("expected a string, got {}", value.type_name()),
                        })?;
                        if alias.replaces_existing {
                            replaces = tree
                                .child_names(&canonical, &alias.canonical_type)
                                .into_iter()
                                .find(|existing| existing != name)
                                .map(|existing| canonical.child(&alias.canonical_type, &existing))
                                .transpose()?;
                        }
                        PathElement::new(alias.canonical_type.clone(), name)?
                    }
                    (AliasKey::FromParameter(_) | AliasKey::ExistingChild, _) => {
                        let names = tree.child_names(&canonical, &alias.canonical_type);
                        match names.as_slice() {
                            [only] => PathElement::new(alias.canonical_type.clone(), only.clone())?,
                            [] => return Err(ControllerError::ResourceNotFound(address.clone())),
                            _ => {
                                return Err(ControllerError::Validation(format!(
                                    "{} is ambiguous under {}",
                                    current, canonical
                                )))
                            }
                        }
                    }
                };
            }
            canonical = canonical.append(current);
        }
        Ok((canonical, replaces))
    }

    /// Rewrite an operation onto canonical addresses and attribute names
    pub fn canonicalize(&self, operation: Operation, tree: &ResourceTree) -> ControllerResult<ResolvedOperation> {
        let Operation {
            address,
            kind,
            mut parameters,
        } = operation;

        let (kind, address) = match kind {
            OperationKind::AddProtocol | OperationKind::RemoveProtocol => {
                let protocol = parameters
                    .remove("type")
                    .ok_or_else(|| ControllerError::MissingParameter("type".to_string()))?;
                let protocol = protocol.as_str().ok_or_else(|| ControllerError::InvalidValue {
                    name: "type".to_string(),
                    reason: "expected a protocol name".to_string(),
                })?;
                let stack = self.resolve(&address, tree)?;
                let target = stack.child("protocol", protocol)?;
                let kind = if kind == OperationKind::AddProtocol {
                    OperationKind::Add
                } else {
                    OperationKind::Remove
                };
                (kind, target)
            }
            other => (other, address),
        };

        match kind {
            OperationKind::Add => {
                let (canonical, replaces) = self.resolve_segments(&address, tree, Some(&mut parameters))?;
                let resource_type = canonical.resource_type().unwrap_or(ROOT_TYPE).to_string();
                let parameters = self.canonical_parameters(&resource_type, parameters)?;
                Ok(ResolvedOperation {
                    operation: Operation {
                        address: canonical,
                        kind: OperationKind::Add,
                        parameters,
                    },
                    replaces,
                    legacy_attribute: None,
                })
            }
            OperationKind::WriteAttribute { name, value } => {
                let canonical = self.resolve(&address, tree)?;
                let resource_type = canonical.resource_type().unwrap_or(ROOT_TYPE).to_string();
                let (name, value) = self.canonical_attribute(&resource_type, &name, &value)?;
                Ok(ResolvedOperation {
                    operation: Operation {
                        address: canonical,
                        kind: OperationKind::WriteAttribute { name, value },
                        parameters,
                    },
                    replaces: None,
                    legacy_attribute: None,
                })
            }
            OperationKind::ReadAttribute { name } => {
                let canonical = self.resolve(&address, tree)?;
                let resource_type = canonical.resource_type().unwrap_or(ROOT_TYPE).to_string();
                let (canonical_name, _) =
                    self.canonical_attribute(&resource_type, &name, &ModelValue::Undefined)?;
                let legacy_attribute = (canonical_name != name).then_some(name);
                Ok(ResolvedOperation {
                    operation: Operation {
                        address: canonical,
                        kind: OperationKind::ReadAttribute { name: canonical_name },
                        parameters,
                    },
                    replaces: None,
                    legacy_attribute,
                })
            }
            OperationKind::Composite(_) => Err(ControllerError::Validation(
                "composite operations must be flattened before resolution".to_string(),
            )),
            kind => Ok(ResolvedOperation {
                operation: Operation {
                    address: self.resolve(&address, tree)?,
                    kind,
                    parameters,
                },
                replaces: None,
                legacy_attribute: None,
            }),
        }
    }

    /// Translate a legacy attribute name and value; canonical names pass through
    pub fn canonical_attribute(
        &self,
        resource_type: &str,
        name: &str,
        value: &ModelValue,
    ) -> ControllerResult<(String, ModelValue)> {
        let mut name = name.to_string();
        let mut value = value.clone();
        for alias in self.attribute_chain(resource_type, &name) {
            value = alias.to_canonical(&value)?;
            name = alias.canonical_name.clone();
        }
        Ok((name, value))
    }

    fn canonical_parameters(
        &self,
        resource_type: &str,
        parameters: BTreeMap<String, ModelValue>,
    ) -> ControllerResult<BTreeMap<String, ModelValue>> {
        let mut canonical = BTreeMap::new();
        for (name, value) in parameters {
            let (name, value) = self.canonical_attribute(resource_type, &name, &value)?;
            if canonical.insert(name.clone(), value).is_some() {
                return Err(ControllerError::Validation(format!(
                    "'{}' is supplied under more than one name",
                    name
                )));
            }
        }
        Ok(canonical)
    }

    /// Present a canonical value under a legacy attribute name
    ///
    /// Fails when the value has no legacy form.
    pub fn present_attribute(
        &self,
        resource_type: &str,
        legacy_name: &str,
        value: &ModelValue,
    ) -> ControllerResult<ModelValue> {
        self.attribute_chain(resource_type, legacy_name)
            .iter()
            .rev()
            .try_fold(value.clone(), |value, alias| alias.to_legacy(&value))
    }

    /// Every address naming `canonical`, the canonical address first
    pub fn project(&self, canonical: &ResourceAddress, tree: &ResourceTree) -> Vec<ResourceAddress> {
        let mut prefixes: Vec<Vec<PathElement>> = vec![Vec::new()];
        let mut parent = ResourceAddress::root();

        for element in canonical.segments() {
            let parent_type = parent.resource_type().unwrap_or(ROOT_TYPE);
            let alternatives = self.legacy_alternatives(parent_type, &parent, element, tree);
            prefixes = prefixes
                .into_iter()
                .flat_map(|prefix| {
                    alternatives.iter().map(move |alternative| {
                        let mut next = prefix.clone();
                        next.push(alternative.clone());
                        next
                    })
                })
                .collect();
            parent = parent.append(element.clone());
        }

        prefixes.into_iter().map(ResourceAddress::from).collect()
    }

    fn legacy_alternatives(
        &self,
        parent_type: &str,
        parent: &ResourceAddress,
        element: &PathElement,
        tree: &ResourceTree,
    ) -> Vec<PathElement> {
        let mut alternatives = vec![element.clone()];
        let mut index = 0;
        while index < alternatives.len() {
            let target = alternatives[index].clone();
            for alias in self.address_aliases.iter().filter(|alias| alias.parent_type == parent_type) {
                let names_target = alias.canonical_type == target.key
                    && match &alias.key {
                        AliasKey::Fixed(name) => name == &target.value,
                        AliasKey::ExistingChild | AliasKey::FromParameter(_) => {
                            tree.child_names(parent, &alias.canonical_type) == [target.value.clone()]
                        }
                    };
                if names_target && !alternatives.contains(&alias.legacy) {
                    alternatives.push(alias.legacy.clone());
                }
            }
            index += 1;
        }
        alternatives
    }

    /// Fill in the legacy addresses of a snapshot and its children
    pub fn project_snapshot(&self, snapshot: &mut ResourceSnapshot, tree: &ResourceTree) {
        snapshot.aliases = self
            .project(&snapshot.address, tree)
            .into_iter()
            .skip(1)
            .collect();
        for child in &mut snapshot.children {
            self.project_snapshot(child, tree);
        }
    }
}
