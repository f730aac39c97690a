//! Custom Resource Definitions used by the OAM controller
//!
//! `ApplicationConfiguration` and `ComponentSchematic` are owned by this
//! controller. `MysqlCluster` and the extended `HorizontalPodAutoscaler`
//! belong to other operators and are only written and watched here.

mod application;
mod autoscaler;
mod component;
mod mysql;
mod status;
mod workload_type;

pub use application::{
    ApplicationConfiguration, ApplicationConfigurationSpec, ComponentConfiguration,
    ParameterValue, TraitBinding, Variable,
};
pub use autoscaler::{
    HcHorizontalPodAutoscaler, HcHorizontalPodAutoscalerSpec, HcHorizontalPodAutoscalerStatus,
    HcMetricSpec, HcMetricTarget, HcResourceMetricSource, HcScaleTargetRef, ScaleDirection,
};
pub use component::{
    AccessMode, ComponentSchematic, ComponentSchematicSpec, ConfigFile, Container,
    ContainerPort, Disk, EnvEntry, ExecProbe, ExtendedResource, HealthProbe, HttpGetProbe,
    HttpHeader, Parameter, Quantity, Resources, TcpSocketProbe, VolumeDeclaration,
    WorkloadSetting,
};
pub use mysql::{MysqlCluster, MysqlClusterSpec, MysqlClusterStatus};
pub use status::{
    ApplicationConfigurationStatus, ApplicationPhase, AutoscalerObservation, ClaimObservation,
    ConfigMapObservation, DeploymentObservation, Health, IngressObservation, JobObservation,
    ModuleStatus, MysqlClusterObservation, ObservedState, RecordKey, ResourceRecord,
    ServiceObservation, SyncState,
};
pub use workload_type::{WorkloadType, CORE_GROUP_VERSION, MYSQL_GROUP_VERSION};

use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};

/// Schema for free-form JSON objects (trait properties, workload settings)
pub(crate) fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

/// Schema for fields holding any JSON value
pub(crate) fn any_value(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject::default();
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}
