//! Child observation
//!
//! Turns a live derived object into the structured [`ObservedState`] stored
//! on its status record. Live objects arrive as `DynamicObject`s and are
//! parsed into the matching k8s-openapi (or CRD) type first.

use k8s_openapi::api::apps::v1 as apps;
use k8s_openapi::api::autoscaling::v2 as autoscaling;
use k8s_openapi::api::batch::v1 as batch;
use k8s_openapi::api::core::v1 as core;
use k8s_openapi::api::networking::v1 as networking;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use serde::de::DeserializeOwned;

use oam_common::crd::{
    AutoscalerObservation, ClaimObservation, ConfigMapObservation, DeploymentObservation,
    HcHorizontalPodAutoscaler, IngressObservation, JobObservation, MysqlCluster,
    MysqlClusterObservation, ObservedState, ServiceObservation,
};
use oam_common::kube_utils::HasApiResource;
use oam_common::Error;
use oam_workload::k8s;

const BOUND: &str = "Bound";

/// Every kind the controller derives and watches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildKind {
    /// apps/v1 Deployment
    Deployment,
    /// batch/v1 Job
    Job,
    /// autoscaling/v2 HorizontalPodAutoscaler
    HorizontalPodAutoscaler,
    /// harmonycloud.cn/v1beta1 HorizontalPodAutoscaler
    HcHorizontalPodAutoscaler,
    /// v1 PersistentVolumeClaim
    PersistentVolumeClaim,
    /// v1 Service
    Service,
    /// v1 ConfigMap
    ConfigMap,
    /// networking.k8s.io/v1 Ingress
    Ingress,
    /// mysql.middleware.harmonycloud.cn/v1alpha1 MysqlCluster
    MysqlCluster,
}

impl ChildKind {
    /// All watched kinds
    pub const ALL: [ChildKind; 9] = [
        ChildKind::Deployment,
        ChildKind::Job,
        ChildKind::HorizontalPodAutoscaler,
        ChildKind::HcHorizontalPodAutoscaler,
        ChildKind::PersistentVolumeClaim,
        ChildKind::Service,
        ChildKind::ConfigMap,
        ChildKind::Ingress,
        ChildKind::MysqlCluster,
    ];

    /// API coordinates of this kind
    pub fn api_resource(&self) -> ApiResource {
        match self {
            ChildKind::Deployment => k8s::Deployment::api_resource(),
            ChildKind::Job => k8s::Job::api_resource(),
            ChildKind::HorizontalPodAutoscaler => k8s::HorizontalPodAutoscaler::api_resource(),
            ChildKind::HcHorizontalPodAutoscaler => HcHorizontalPodAutoscaler::api_resource(),
            ChildKind::PersistentVolumeClaim => k8s::PersistentVolumeClaim::api_resource(),
            ChildKind::Service => k8s::Service::api_resource(),
            ChildKind::ConfigMap => k8s::ConfigMap::api_resource(),
            ChildKind::Ingress => k8s::Ingress::api_resource(),
            ChildKind::MysqlCluster => MysqlCluster::api_resource(),
        }
    }

    /// Look up a kind by apiVersion and kind
    pub fn from_type(api_version: &str, kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| {
            let ar = k.api_resource();
            ar.api_version == api_version && ar.kind == kind
        })
    }

    /// Parse a live object of this kind into its observation.
    ///
    /// Fails with `TypeMismatch` when the object declares another type.
    pub fn observe(&self, obj: &DynamicObject) -> Result<ObservedState, Error> {
        let expected = self.api_resource();
        if let Some(types) = &obj.types {
            if types.api_version != expected.api_version || types.kind != expected.kind {
                return Err(Error::type_mismatch(
                    format!("{}/{}", expected.api_version, expected.kind),
                    format!("{}/{}", types.api_version, types.kind),
                ));
            }
        }

        Ok(match self {
            ChildKind::Deployment => observe_deployment(&parse(obj)?),
            ChildKind::Job => observe_job(&parse(obj)?),
            ChildKind::HorizontalPodAutoscaler => observe_hpa(&parse(obj)?),
            ChildKind::HcHorizontalPodAutoscaler => observe_hc_hpa(&parse(obj)?),
            ChildKind::PersistentVolumeClaim => observe_claim(&parse(obj)?),
            ChildKind::Service => observe_service(&parse(obj)?),
            ChildKind::ConfigMap => observe_config_map(&parse(obj)?),
            ChildKind::Ingress => observe_ingress(&parse(obj)?),
            ChildKind::MysqlCluster => observe_mysql(&parse(obj)?),
        })
    }
}

fn parse<T: DeserializeOwned>(obj: &DynamicObject) -> Result<T, Error> {
    Ok(serde_json::from_value(serde_json::to_value(obj)?)?)
}

fn observe_deployment(deploy: &apps::Deployment) -> ObservedState {
    let status = deploy.status.clone().unwrap_or_default();
    let desired = deploy
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .or(status.replicas)
        .unwrap_or(0);
    ObservedState::Deployment(DeploymentObservation {
        replicas: desired,
        ready_replicas: status.ready_replicas.unwrap_or(0),
        updated_replicas: status.updated_replicas.unwrap_or(0),
        available_replicas: status.available_replicas.unwrap_or(0),
    })
}

fn observe_job(job: &batch::Job) -> ObservedState {
    let status = job.status.clone().unwrap_or_default();
    ObservedState::Job(JobObservation {
        active: status.active.unwrap_or(0),
        succeeded: status.succeeded.unwrap_or(0),
        failed: status.failed.unwrap_or(0),
    })
}

fn observe_hpa(hpa: &autoscaling::HorizontalPodAutoscaler) -> ObservedState {
    let status = hpa.status.clone().unwrap_or_default();
    ObservedState::Autoscaler(AutoscalerObservation {
        current_replicas: status.current_replicas.unwrap_or(0),
        desired_replicas: status.desired_replicas,
    })
}

fn observe_hc_hpa(hpa: &HcHorizontalPodAutoscaler) -> ObservedState {
    let status = hpa.status.clone().unwrap_or_default();
    ObservedState::Autoscaler(AutoscalerObservation {
        current_replicas: status.current_replicas,
        desired_replicas: status.desired_replicas,
    })
}

fn observe_claim(pvc: &core::PersistentVolumeClaim) -> ObservedState {
    let status = pvc.status.clone().unwrap_or_default();
    let spec = pvc.spec.clone().unwrap_or_default();
    let phase = status.phase.unwrap_or_else(|| "Pending".to_string());
    if phase != BOUND {
        return ObservedState::Claim(ClaimObservation {
            phase,
            ..Default::default()
        });
    }
    ObservedState::Claim(ClaimObservation {
        phase,
        volume: spec.volume_name,
        capacity: status
            .capacity
            .and_then(|c| c.get("storage").map(|q| q.0.clone())),
        access_modes: status.access_modes.unwrap_or_default(),
        storage_class: spec.storage_class_name,
    })
}

fn observe_service(svc: &core::Service) -> ObservedState {
    let spec = svc.spec.clone().unwrap_or_default();
    let ports = spec
        .ports
        .unwrap_or_default()
        .iter()
        .map(|p| {
            let protocol = p.protocol.as_deref().unwrap_or("TCP");
            match p.node_port {
                Some(node_port) => format!("{}:{}/{}", p.port, node_port, protocol),
                None => format!("{}/{}", p.port, protocol),
            }
        })
        .collect();
    ObservedState::Service(ServiceObservation {
        service_type: spec.type_.unwrap_or_else(|| "ClusterIP".to_string()),
        cluster_ip: spec.cluster_ip,
        ports,
    })
}

fn observe_config_map(cm: &core::ConfigMap) -> ObservedState {
    let keys = cm.data.as_ref().map_or(0, |d| d.len()) + cm.binary_data.as_ref().map_or(0, |d| d.len());
    ObservedState::ConfigMap(ConfigMapObservation {
        keys: i32::try_from(keys).unwrap_or(i32::MAX),
    })
}

fn observe_ingress(ingress: &networking::Ingress) -> ObservedState {
    let hosts = ingress
        .spec
        .as_ref()
        .and_then(|s| s.rules.as_ref())
        .map(|rules| rules.iter().map(|r| r.host.clone().unwrap_or_else(|| "*".to_string())).collect())
        .unwrap_or_default();
    ObservedState::Ingress(IngressObservation { hosts })
}

fn observe_mysql(cluster: &MysqlCluster) -> ObservedState {
    let status = cluster.status.clone().unwrap_or_default();
    ObservedState::MysqlCluster(MysqlClusterObservation {
        phase: status.phase.unwrap_or_default(),
        replicas: status.replicas.unwrap_or(0),
        failed_count: status.failed_count.unwrap_or(0),
        reason: status.reason.filter(|r| !r.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dynamic(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).unwrap()
    }

    // =========================================================================
    // Kind lookup
    // =========================================================================

    #[test]
    fn autoscaler_variants_are_distinct_kinds() {
        assert_eq!(
            ChildKind::from_type("autoscaling/v2", "HorizontalPodAutoscaler"),
            Some(ChildKind::HorizontalPodAutoscaler)
        );
        assert_eq!(
            ChildKind::from_type("harmonycloud.cn/v1beta1", "HorizontalPodAutoscaler"),
            Some(ChildKind::HcHorizontalPodAutoscaler)
        );
        assert_eq!(ChildKind::from_type("v1", "Secret"), None);
    }

    // =========================================================================
    // Observations
    // =========================================================================

    /// Story: a rolled-out Deployment reports ready against desired replicas
    #[test]
    fn story_deployment_observation() {
        let obj = dynamic(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "shop-frontend", "namespace": "retail"},
            "spec": {"replicas": 3, "selector": {}, "template": {}},
            "status": {"replicas": 3, "readyReplicas": 2, "updatedReplicas": 3, "availableReplicas": 2}
        }));
        let observed = ChildKind::Deployment.observe(&obj).unwrap();
        assert_eq!(observed.summary(), "Ready: 2/3, Up-to-date: 3, Available: 2");
    }

    /// Story: an unbound claim only reports its phase
    #[test]
    fn story_pending_claim() {
        let obj = dynamic(json!({
            "apiVersion": "v1",
            "kind": "PersistentVolumeClaim",
            "metadata": {"name": "data", "namespace": "retail"},
            "spec": {"accessModes": ["ReadWriteOnce"]},
            "status": {"phase": "Pending"}
        }));
        let observed = ChildKind::PersistentVolumeClaim.observe(&obj).unwrap();
        assert_eq!(observed.summary(), "Status: Pending.");
    }

    /// Story: a bound claim reports volume, capacity and class
    #[test]
    fn story_bound_claim() {
        let obj = dynamic(json!({
            "apiVersion": "v1",
            "kind": "PersistentVolumeClaim",
            "metadata": {"name": "data", "namespace": "retail"},
            "spec": {"volumeName": "pv-1", "storageClassName": "fast"},
            "status": {"phase": "Bound", "capacity": {"storage": "10Gi"}, "accessModes": ["ReadWriteMany"]}
        }));
        let observed = ChildKind::PersistentVolumeClaim.observe(&obj).unwrap();
        assert_eq!(
            observed.summary(),
            "Volume: pv-1, Capacity: 10Gi, AccessModes: ReadWriteMany, StorageClass: fast, Status: Bound."
        );
    }

    #[test]
    fn service_ports_include_node_ports() {
        let obj = dynamic(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "shop-frontend", "namespace": "retail"},
            "spec": {
                "type": "NodePort",
                "clusterIP": "10.0.0.7",
                "ports": [{"port": 80, "nodePort": 30080, "protocol": "TCP"}, {"port": 9090}]
            }
        }));
        let observed = ChildKind::Service.observe(&obj).unwrap();
        assert_eq!(
            observed.summary(),
            "Type: NodePort, Cluster-IP: 10.0.0.7, Port(s): 80:30080/TCP,9090/TCP"
        );
    }

    #[test]
    fn extended_autoscaler_observation() {
        let obj = dynamic(json!({
            "apiVersion": "harmonycloud.cn/v1beta1",
            "kind": "HorizontalPodAutoscaler",
            "metadata": {"name": "shop-frontend", "namespace": "retail"},
            "spec": {"scaleTargetRef": {"apiVersion": "apps/v1", "kind": "Deployment", "name": "shop-frontend"}, "maxReplicas": 4},
            "status": {"currentReplicas": 2, "desiredReplicas": 3}
        }));
        let observed = ChildKind::HcHorizontalPodAutoscaler.observe(&obj).unwrap();
        assert_eq!(observed.summary(), "CurrentReplicas: 2, DesiredReplicas: 3.");
    }

    /// Story: a handler given the wrong kind refuses it
    #[test]
    fn story_wrong_kind_is_type_mismatch() {
        let obj = dynamic(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "shop-frontend-web", "namespace": "retail"},
            "data": {"a.conf": "x"}
        }));
        let err = ChildKind::Deployment.observe(&obj).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(!err.is_retryable());

        let observed = ChildKind::ConfigMap.observe(&obj).unwrap();
        assert_eq!(observed.summary(), "Data: 1");
    }
}
