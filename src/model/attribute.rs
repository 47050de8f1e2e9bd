// Copyright (c) 2025 - Cowboy AI, Inc.
//! Attribute Definitions
//!
//! Each resource type declares its attributes. A definition validates and
//! normalizes incoming values and carries an [`AttributeEffect`] telling the
//! runtime phase what a write means for the running service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::value::ModelValue;
use crate::errors::{ControllerError, ControllerResult};

/// Declared value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    Bool,
    Int,
    String,
    /// List of objects
    ObjectList,
    /// String→string map; also accepts a list of single-entry objects
    StringMap,
}

/// What a write to the attribute does to the owning service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeEffect {
    /// Model only, the running service is untouched
    ModelOnly,
    /// Pushed to the running service without restarting it
    Reload,
    /// Running service is stopped and started with the new configuration
    Restart,
}

/// Declaration of a single attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub value_type: ValueType,
    pub required: bool,
    pub default: Option<ModelValue>,
    pub allowed: Vec<String>,
    pub min: Option<i64>,
    pub effect: AttributeEffect,
}

impl AttributeDefinition {
    /// Optional attribute, no default, model-only effect
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: false,
            default: None,
            allowed: Vec::new(),
            min: None,
            effect: AttributeEffect::ModelOnly,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<ModelValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn effect(mut self, effect: AttributeEffect) -> Self {
        self.effect = effect;
        self
    }

    /// Validate a value and return its normalized form
    ///
    /// `Undefined` is legal for optional attributes and means "unset".
    pub fn validate(&self, value: &ModelValue) -> ControllerResult<ModelValue> {
        if !value.is_defined() {
            if self.required {
                return Err(ControllerError::MissingParameter(self.name.clone()));
            }
            return Ok(ModelValue::Undefined);
        }

        let normalized = match (self.value_type, value) {
            (ValueType::Bool, ModelValue::Bool(_)) => value.clone(),
            (ValueType::Bool, ModelValue::String(s)) => match s.as_str() {
                "true" => ModelValue::Bool(true),
                "false" => ModelValue::Bool(false),
                _ => return Err(self.invalid(format!("'{}' is not a boolean", s))),
            },
            (ValueType::Int, ModelValue::Int(_)) => value.clone(),
            (ValueType::Int, ModelValue::String(s)) => s
                .parse::<i64>()
                .map(ModelValue::Int)
                .map_err(|_| self.invalid(format!("'{}' is not an integer", s)))?,
            (ValueType::String, ModelValue::String(s)) if !s.is_empty() => value.clone(),
            (ValueType::String, ModelValue::String(_)) => {
                return Err(self.invalid("must not be empty".to_string()))
            }
            (ValueType::ObjectList, ModelValue::List(items))
                if items.iter().all(|item| item.as_object().is_some()) =>
            {
                value.clone()
            }
            (ValueType::StringMap, _) => match value.to_string_map() {
                Some(map) => ModelValue::from(map),
                None => return Err(self.invalid("expected a map of strings".to_string())),
            },
            _ => {
                return Err(self.invalid(format!(
                    "expected {:?}, got {}",
                    self.value_type,
                    value.type_name()
                )))
            }
        };

        if let (Some(min), Some(n)) = (self.min, normalized.as_int()) {
            if n < min {
                return Err(self.invalid(format!("{} is below the minimum of {}", n, min)));
            }
        }

        if !self.allowed.is_empty() {
            if let Some(s) = normalized.as_str() {
                if !self.allowed.iter().any(|allowed| allowed == s) {
                    return Err(self.invalid(format!(
                        "'{}' is not one of {:?}",
                        s, self.allowed
                    )));
                }
            }
        }

        Ok(normalized)
    }

    fn invalid(&self, reason: String) -> ControllerError {
        ControllerError::InvalidValue {
            name: self.name.clone(),
            reason,
        }
    }
}

/// Validate a parameter set against attribute definitions
///
/// Returns the attributes to store: normalized supplied values plus defaults.
/// Parameters listed in `structural` are consumed by the handler itself and
/// are skipped here.
pub fn validate_parameters(
    resource_type: &str,
    definitions: &[AttributeDefinition],
    parameters: &BTreeMap<String, ModelValue>,
    structural: &[&str],
) -> ControllerResult<BTreeMap<String, ModelValue>> {
    for name in parameters.keys() {
        if structural.contains(&name.as_str()) {
            continue;
        }
        if !definitions.iter().any(|definition| &definition.name == name) {
            return Err(ControllerError::UnknownAttribute {
                resource_type: resource_type.to_string(),
                name: name.clone(),
            });
        }
    }

    let mut attributes = BTreeMap::new();
    for definition in definitions {
        let supplied = parameters
            .get(&definition.name)
            .cloned()
            .unwrap_or(ModelValue::Undefined);
        let value = definition.validate(&supplied)?;
        if value.is_defined() {
            attributes.insert(definition.name.clone(), value);
        } else if let Some(default) = &definition.default {
            attributes.insert(definition.name.clone(), default.clone());
        }
    }
    Ok(attributes)
}
