//! Rack, module, page and parameter entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for racks, modules, pages, parameters and resources
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Parameter value: numeric or textual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Float(f32),
    Str(String),
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One instance of the control surface, living on a host:port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rack {
    pub id: EntityId,
    pub host: String,
    pub port: u16,
}

impl Rack {
    pub fn new(id: impl Into<EntityId>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: EntityId,
    pub display_name: String,
    /// Module type, e.g. `mec.reverb`
    pub module_type: String,
}

impl Module {
    pub fn new(
        id: impl Into<EntityId>,
        display_name: impl Into<String>,
        module_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            module_type: module_type.into(),
        }
    }
}

/// Named group of parameters within a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: EntityId,
    pub display_name: String,
    #[serde(default)]
    pub param_ids: Vec<EntityId>,
}

impl Page {
    pub fn new(
        id: impl Into<EntityId>,
        display_name: impl Into<String>,
        param_ids: Vec<EntityId>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            param_ids,
        }
    }
}

/// Leaf value being controlled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: EntityId,
    pub display_name: String,
    /// Parameter type, e.g. `float`, `pct`, `bool`, `list`
    pub param_type: String,
    pub current: ParamValue,
    /// Type-specific descriptor values (min, max, default, list entries)
    #[serde(default)]
    pub attributes: Vec<ParamValue>,
}

impl Parameter {
    pub fn new(
        id: impl Into<EntityId>,
        display_name: impl Into<String>,
        param_type: impl Into<String>,
        current: ParamValue,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            param_type: param_type.into(),
            current,
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<ParamValue>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Copy of this parameter holding a new current value
    pub fn with_value(&self, value: ParamValue) -> Self {
        Self {
            current: value,
            ..self.clone()
        }
    }
}
