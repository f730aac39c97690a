//! `auto-scaler`: `autoscaling/v2` HorizontalPodAutoscaler

use oam_common::kube_utils::HasApiResource;
use serde::Deserialize;

use super::{lenient_i32, lenient_opt_i32};
use crate::compiled::{ObjectContext, ScaleTarget};
use crate::k8s::{CrossVersionObjectReference, HorizontalPodAutoscaler, HpaSpec, MetricSpec};

fn default_minimum() -> i32 {
    1
}

fn default_maximum() -> i32 {
    10
}

/// Utilization-based autoscaling
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AutoScaler {
    /// Lower replica bound
    #[serde(default = "default_minimum", deserialize_with = "lenient_i32")]
    pub minimum: i32,
    /// Upper replica bound
    #[serde(default = "default_maximum", deserialize_with = "lenient_i32")]
    pub maximum: i32,
    /// Target average CPU utilization, percent
    #[serde(default, deserialize_with = "lenient_opt_i32")]
    pub cpu: Option<i32>,
    /// Target average memory utilization, percent
    #[serde(default, deserialize_with = "lenient_opt_i32")]
    pub memory: Option<i32>,
}

impl AutoScaler {
    /// HPA named after the instance, targeting the workload
    pub fn compile(&self, ctx: &ObjectContext<'_>, target: &ScaleTarget) -> HorizontalPodAutoscaler {
        let metrics = [("cpu", self.cpu), ("memory", self.memory)]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| MetricSpec::utilization(name, v)))
            .collect();

        HorizontalPodAutoscaler {
            api_version: HorizontalPodAutoscaler::API_VERSION.to_string(),
            kind: HorizontalPodAutoscaler::KIND.to_string(),
            metadata: ctx.trait_meta(ctx.instance),
            spec: HpaSpec {
                scale_target_ref: CrossVersionObjectReference {
                    api_version: target.api_version.clone(),
                    kind: target.kind.clone(),
                    name: target.name.clone(),
                },
                min_replicas: self.minimum,
                max_replicas: self.maximum,
                metrics,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::tests::{context, owner};
    use serde_json::json;

    #[test]
    fn defaults_and_metrics() {
        let owner = owner();
        let ctx = context(&owner);
        let target = ScaleTarget::new("apps/v1", "Deployment", ctx.instance);

        let scaler: AutoScaler = serde_json::from_value(json!({"cpu": "80"})).unwrap();
        let hpa = scaler.compile(&ctx, &target);

        assert_eq!(hpa.metadata.name, ctx.instance);
        assert_eq!(hpa.spec.min_replicas, 1);
        assert_eq!(hpa.spec.max_replicas, 10);
        assert_eq!(hpa.spec.metrics, vec![MetricSpec::utilization("cpu", 80)]);
        assert_eq!(hpa.spec.scale_target_ref.kind, "Deployment");
        assert_eq!(hpa.spec.scale_target_ref.name, ctx.instance);
    }

    #[test]
    fn both_metrics() {
        let owner = owner();
        let ctx = context(&owner);
        let target = ScaleTarget::new("batch/v1", "Job", ctx.instance);
        let scaler: AutoScaler =
            serde_json::from_value(json!({"minimum": 2, "maximum": 6, "cpu": 50, "memory": 70}))
                .unwrap();
        let hpa = scaler.compile(&ctx, &target);
        assert_eq!(hpa.spec.min_replicas, 2);
        assert_eq!(hpa.spec.max_replicas, 6);
        assert_eq!(hpa.spec.metrics.len(), 2);
        assert_eq!(hpa.spec.metrics[1].resource.name, "memory");
    }
}
