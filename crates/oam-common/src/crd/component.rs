//! ComponentSchematic CRD types
//!
//! A ComponentSchematic is a reusable workload template: containers with
//! their ports, resources, probes and config files, plus the parameters an
//! ApplicationConfiguration can bind.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::workload_type::WorkloadType;

// =============================================================================
// Parameters and settings
// =============================================================================

/// A parameter the component accepts
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared type (informational; values are strings)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Whether a value must be supplied
    #[serde(default)]
    pub required: bool,
    /// Value used when nothing is bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Workload-type specific setting (used by MysqlCluster components)
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSetting {
    /// Setting name, e.g. `spec` or `config`
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared type (informational)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Whether a value must be supplied
    #[serde(default)]
    pub required: bool,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Inline value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "super::any_value")]
    pub value: Option<serde_json::Value>,
    /// Parameter supplying the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_param: Option<String>,
}

// =============================================================================
// Container
// =============================================================================

/// Environment variable, literal or bound to a parameter
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvEntry {
    /// Variable name
    pub name: String,
    /// Literal value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Parameter supplying the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_param: Option<String>,
}

/// A file materialized into a ConfigMap and mounted into the container
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Absolute mount path of the file
    pub path: String,
    /// Literal file content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Parameter supplying the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_param: Option<String>,
}

/// Container port
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port name
    pub name: String,
    /// Port number
    pub container_port: i32,
    /// TCP or UDP (default TCP)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// A resource quantity requirement
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    /// Kubernetes quantity string, e.g. `500m` or `1Gi`
    #[serde(default)]
    pub required: String,
}

/// Disk backing a declared volume
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    /// Size, e.g. `10Gi`
    #[serde(default)]
    pub required: String,
    /// Ephemeral disks are deleted with the application
    #[serde(default)]
    pub ephemeral: bool,
}

/// Volume access mode as declared by the schematic
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-write
    RW,
    /// Read-only
    RO,
}

/// A volume the container mounts
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDeclaration {
    /// Volume name
    pub name: String,
    /// Where the volume is mounted
    pub mount_path: String,
    /// Access mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_mode: Option<AccessMode>,
    /// Sharing policy (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing_policy: Option<String>,
    /// Backing disk; volumes without one cannot be claimed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<Disk>,
}

/// A named extended resource, e.g. `example.com/fpga`
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedResource {
    /// Resource name
    pub name: String,
    /// Quantity
    pub required: String,
}

/// Resources a container requires
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// CPU
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Quantity>,
    /// Memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Quantity>,
    /// GPUs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Quantity>,
    /// Declared volumes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeDeclaration>,
    /// Extended resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extended: Vec<ExtendedResource>,
}

/// Exec probe action
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ExecProbe {
    /// Command to run
    pub command: Vec<String>,
}

/// HTTP header sent by an HTTP probe
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct HttpHeader {
    /// Header name
    pub name: String,
    /// Header value
    pub value: String,
}

/// HTTP GET probe action
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpGetProbe {
    /// Request path
    pub path: String,
    /// Port number
    pub port: i32,
    /// Extra headers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub http_headers: Vec<HttpHeader>,
}

/// TCP socket probe action
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct TcpSocketProbe {
    /// Port number
    pub port: i32,
}

/// Liveness or readiness probe; exactly one action should be set
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthProbe {
    /// Exec action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecProbe>,
    /// HTTP action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetProbe>,
    /// TCP action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_socket: Option<TcpSocketProbe>,
    /// Seconds before the first probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<i32>,
    /// Seconds between probes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<i32>,
    /// Probe timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,
    /// Consecutive successes to pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<i32>,
    /// Consecutive failures to fail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<i32>,
}

/// Container template
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// Entrypoint override
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,
    /// Arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvEntry>,
    /// Config files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<ConfigFile>,
    /// Ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    /// Resource requirements
    #[serde(default)]
    pub resources: Resources,
    /// Liveness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<HealthProbe>,
    /// Readiness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<HealthProbe>,
    /// Secret used to pull the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_secret: Option<String>,
}

// =============================================================================
// CRD
// =============================================================================

/// Reusable workload template referenced by ApplicationConfigurations
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1alpha1",
    kind = "ComponentSchematic",
    plural = "componentschematics",
    shortname = "comp",
    namespaced,
    printcolumn = r#"{"name":"Workload","type":"string","jsonPath":".spec.workloadType"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSchematicSpec {
    /// Workload type, e.g. `core.oam.dev/v1alpha1.Server`
    pub workload_type: String,

    /// Operating system hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,

    /// CPU architecture hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    /// Parameters an application can bind
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    /// Containers
    #[serde(default)]
    pub containers: Vec<Container>,

    /// Workload-type specific settings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workload_settings: Vec<WorkloadSetting>,
}

impl ComponentSchematicSpec {
    /// Parsed workload type, `None` if unrecognized
    pub fn workload(&self) -> Option<WorkloadType> {
        WorkloadType::parse(&self.workload_type)
    }

    /// Find a declared volume by name across all containers
    pub fn find_volume(&self, name: &str) -> Option<&VolumeDeclaration> {
        self.containers
            .iter()
            .flat_map(|c| c.resources.volumes.iter())
            .find(|v| v.name == name)
    }

    /// Find a workload setting by name
    pub fn setting(&self, name: &str) -> Option<&WorkloadSetting> {
        self.workload_settings.iter().find(|s| s.name == name)
    }
}
