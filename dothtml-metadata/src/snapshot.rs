//! Serde model of control metadata snapshots
//!
//!     A snapshot is one JSON document produced by an external metadata
//!     exporter: the full set of control types it saw (keyed by full type
//!     name) plus the tag registrations that make them addressable from
//!     markup. Snapshots also carry routing and resource tables; the editor
//!     core has no use for those and the model simply does not declare them.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Where a property may appear in markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum MappingMode {
    Exclude,
    #[default]
    Attribute,
    InnerElement,
    Both,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyDefinition {
    /// Declared type as a type-name string, parsed on demand.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Absent means [`MappingMode::Attribute`].
    pub mapping_mode: Option<MappingMode>,
    pub default_value: Option<serde_json::Value>,
    pub required: bool,
    pub only_bindings: bool,
    pub only_hardcoded: bool,
    pub is_command: bool,
    pub from_capability: bool,
    pub data_context_change: Option<serde_json::Value>,
}

impl PropertyDefinition {
    pub fn mapping_mode(&self) -> MappingMode {
        self.mapping_mode.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyGroupDefinition {
    pub prefixes: Vec<String>,
    /// Element type of the group's values, as a type-name string.
    pub value_type: String,
    pub mapping_mode: Option<MappingMode>,
    pub only_bindings: bool,
    pub only_hardcoded: bool,
}

impl PropertyGroupDefinition {
    pub fn mapping_mode(&self) -> MappingMode {
        self.mapping_mode.unwrap_or_default()
    }
}

/// A bundle of properties a control pulls in from a shared capability type.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilityDefinition {
    #[serde(rename = "type")]
    pub type_name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlDefinition {
    pub assembly: Option<String>,
    pub base_type: Option<String>,
    pub is_abstract: bool,
    pub default_content_property: Option<String>,
    pub without_content: bool,
    /// Own declared properties by name; inherited ones come from walking
    /// `base_type`.
    pub properties: BTreeMap<String, PropertyDefinition>,
    pub property_groups: BTreeMap<String, PropertyGroupDefinition>,
    pub capabilities: BTreeMap<String, CapabilityDefinition>,
}

/// How a control becomes addressable from markup. Markup controls map one
/// exact tag to a source file; code controls expose a whole namespace under a
/// tag prefix.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlRegistration {
    #[serde(rename_all = "camelCase")]
    Markup { tag: String, src: String },
    #[serde(rename_all = "camelCase")]
    Code {
        tag_prefix: String,
        namespace: String,
        assembly: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataSnapshot {
    pub controls: BTreeMap<String, ControlDefinition>,
    pub registrations: Vec<ControlRegistration>,
}
