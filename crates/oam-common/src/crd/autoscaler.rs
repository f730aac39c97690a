//! Bidirectional HorizontalPodAutoscaler from `harmonycloud.cn/v1beta1`
//!
//! Unlike `autoscaling/v2`, each utilization threshold applies to one
//! direction only: a scale-up trigger or a scale-down trigger.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::kube_utils::HasApiResource;

/// Direction a metric threshold triggers
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ScaleDirection {
    /// Threshold crossed upwards adds replicas
    ScaleUp,
    /// Threshold crossed downwards removes replicas
    ScaleDown,
}

/// Workload the autoscaler drives
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HcScaleTargetRef {
    /// Target kind
    pub kind: String,
    /// Target name
    pub name: String,
    /// Target apiVersion
    pub api_version: String,
}

/// Utilization target of one metric
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HcMetricTarget {
    /// Always `Utilization`
    #[serde(rename = "type")]
    pub type_: String,
    /// Percentage in (0, 100)
    pub average_utilization: i32,
    /// Direction the threshold triggers
    pub scale_type: ScaleDirection,
}

/// Resource metric source
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct HcResourceMetricSource {
    /// `cpu` or `memory`
    pub name: String,
    /// Threshold
    pub target: HcMetricTarget,
}

/// One metric of the autoscaler
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct HcMetricSpec {
    /// Always `Resource`
    #[serde(rename = "type")]
    pub type_: String,
    /// Resource metric
    pub resource: HcResourceMetricSource,
}

impl HcMetricSpec {
    /// Utilization threshold on `resource` in the given direction
    pub fn utilization(resource: &str, percent: i32, direction: ScaleDirection) -> Self {
        Self {
            type_: "Resource".to_string(),
            resource: HcResourceMetricSource {
                name: resource.to_string(),
                target: HcMetricTarget {
                    type_: "Utilization".to_string(),
                    average_utilization: percent,
                    scale_type: direction,
                },
            },
        }
    }
}

/// Bidirectional autoscaler spec
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "harmonycloud.cn",
    version = "v1beta1",
    kind = "HorizontalPodAutoscaler",
    root = "HcHorizontalPodAutoscaler",
    plural = "horizontalpodautoscalers",
    namespaced,
    status = "HcHorizontalPodAutoscalerStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct HcHorizontalPodAutoscalerSpec {
    /// Workload to scale
    pub scale_target_ref: HcScaleTargetRef,
    /// Lower replica bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
    /// Upper replica bound
    pub max_replicas: i32,
    /// Thresholds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<HcMetricSpec>,
}

/// Observed scaling state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HcHorizontalPodAutoscalerStatus {
    /// Replicas currently running
    #[serde(default)]
    pub current_replicas: i32,
    /// Replicas the autoscaler wants
    #[serde(default)]
    pub desired_replicas: i32,
}

impl HasApiResource for HcHorizontalPodAutoscaler {
    const API_VERSION: &'static str = "harmonycloud.cn/v1beta1";
    const KIND: &'static str = "HorizontalPodAutoscaler";
}
