//! ApplicationConfiguration CRD types
//!
//! An ApplicationConfiguration lists component instances, each bound to a
//! ComponentSchematic, with parameter values and traits.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::ApplicationConfigurationStatus;

/// A named value that parameter bindings can reference
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Variable value
    #[serde(default)]
    pub value: String,
}

/// Binds a schematic parameter to a literal or a variable
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValue {
    /// Parameter name as declared by the schematic
    pub name: String,
    /// Literal value, or `[fromVariable(NAME)]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Name of a variable supplying the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// A trait attached to a component instance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraitBinding {
    /// Trait name, e.g. `manual-scaler`
    pub name: String,
    /// Trait-specific properties
    #[serde(default)]
    #[schemars(schema_with = "super::preserve_unknown_fields")]
    pub properties: serde_json::Value,
}

/// One component instance of the application
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfiguration {
    /// Name of the ComponentSchematic in the same namespace
    pub component_name: String,
    /// Name of this instance; names every derived object
    #[serde(default)]
    pub instance_name: String,
    /// Parameter bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_values: Vec<ParameterValue>,
    /// Attached traits
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<TraitBinding>,
}

impl ComponentConfiguration {
    /// Instance name, falling back to the component name when unset
    pub fn instance(&self) -> &str {
        if self.instance_name.is_empty() {
            &self.component_name
        } else {
            &self.instance_name
        }
    }

    /// True if any attached trait manages replica counts at runtime
    pub fn has_autoscaler(&self) -> bool {
        self.traits
            .iter()
            .any(|t| t.name == "auto-scaler" || t.name == "better-auto-scaler")
    }
}

/// Application descriptor reconciled into workloads, services, storage and autoscalers
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1alpha1",
    kind = "ApplicationConfiguration",
    plural = "applicationconfigurations",
    shortname = "appconfig",
    namespaced,
    status = "ApplicationConfigurationStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfigurationSpec {
    /// Named values shared by parameter bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Variable>,

    /// Component instances, reconciled in order
    #[serde(default)]
    pub components: Vec<ComponentConfiguration>,
}
