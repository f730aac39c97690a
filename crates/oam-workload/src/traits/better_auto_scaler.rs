//! `better-auto-scaler`: bidirectional `harmonycloud.cn/v1beta1` autoscaler
//!
//! Scale-up and scale-down thresholds are configured separately per metric.
//! A threshold outside (0, 100) is dropped.

use oam_common::crd::{
    HcHorizontalPodAutoscaler, HcHorizontalPodAutoscalerSpec, HcMetricSpec, HcScaleTargetRef,
    ScaleDirection,
};
use serde::Deserialize;

use super::lenient_opt_i32;
use crate::compiled::{ObjectContext, ScaleTarget};

/// Bidirectional utilization thresholds
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct BetterAutoScaler {
    /// Lower replica bound, at least 1
    #[serde(default, deserialize_with = "lenient_opt_i32")]
    pub minimum: Option<i32>,
    /// Upper replica bound, at least `minimum`
    #[serde(default, deserialize_with = "lenient_opt_i32")]
    pub maximum: Option<i32>,
    /// CPU percent that triggers a scale up
    #[serde(default, rename = "cpu-up", deserialize_with = "lenient_opt_i32")]
    pub cpu_up: Option<i32>,
    /// CPU percent that triggers a scale down
    #[serde(default, rename = "cpu-down", deserialize_with = "lenient_opt_i32")]
    pub cpu_down: Option<i32>,
    /// Memory percent that triggers a scale up
    #[serde(default, rename = "memory-up", deserialize_with = "lenient_opt_i32")]
    pub memory_up: Option<i32>,
    /// Memory percent that triggers a scale down
    #[serde(default, rename = "memory-down", deserialize_with = "lenient_opt_i32")]
    pub memory_down: Option<i32>,
}

impl BetterAutoScaler {
    /// Replica bounds after clamping
    pub fn bounds(&self) -> (i32, i32) {
        let minimum = self.minimum.unwrap_or(1).max(1);
        let maximum = self.maximum.unwrap_or(minimum).max(minimum);
        (minimum, maximum)
    }

    fn metrics(&self) -> Vec<HcMetricSpec> {
        [
            ("cpu", self.cpu_up, ScaleDirection::ScaleUp),
            ("cpu", self.cpu_down, ScaleDirection::ScaleDown),
            ("memory", self.memory_up, ScaleDirection::ScaleUp),
            ("memory", self.memory_down, ScaleDirection::ScaleDown),
        ]
        .into_iter()
        .filter_map(|(resource, percent, direction)| {
            percent
                .filter(|p| *p > 0 && *p < 100)
                .map(|p| HcMetricSpec::utilization(resource, p, direction))
        })
        .collect()
    }

    /// Autoscaler named after the instance, targeting the workload
    pub fn compile(&self, ctx: &ObjectContext<'_>, target: &ScaleTarget) -> HcHorizontalPodAutoscaler {
        let (minimum, maximum) = self.bounds();
        let mut hpa = HcHorizontalPodAutoscaler::new(
            ctx.instance,
            HcHorizontalPodAutoscalerSpec {
                scale_target_ref: HcScaleTargetRef {
                    kind: target.kind.clone(),
                    name: target.name.clone(),
                    api_version: target.api_version.clone(),
                },
                min_replicas: Some(minimum),
                max_replicas: maximum,
                metrics: self.metrics(),
            },
        );
        hpa.metadata = ctx.trait_meta(ctx.instance).into_kube();
        hpa
    }
}
