//! Compiled component output types

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use oam_common::crd::{HcHorizontalPodAutoscaler, MysqlCluster, WorkloadType};
use oam_common::kube_utils::ObjectMeta;
use oam_common::{APP_LABEL_KEY, ROLE_TRAIT, ROLE_WORKLOAD};

use crate::error::CompilationError;
use crate::helpers::object_tags;
use crate::k8s::{
    ConfigMap, Deployment, HorizontalPodAutoscaler, Ingress, Job, PersistentVolumeClaim, Service,
};
use crate::resource::DesiredObject;

// =============================================================================
// ObjectContext
// =============================================================================

/// Identity shared by every object derived from one component instance
#[derive(Clone, Copy, Debug)]
pub struct ObjectContext<'a> {
    /// Owning ApplicationConfiguration name
    pub application: &'a str,
    /// ComponentSchematic name
    pub component: &'a str,
    /// Instance name; names the workload, Service, Ingress and autoscalers
    pub instance: &'a str,
    /// Namespace of the application
    pub namespace: &'a str,
    /// Controller reference to the application
    pub owner: &'a OwnerReference,
}

impl<'a> ObjectContext<'a> {
    /// Labels and annotations for an object with the given role
    pub fn tags(&self, role: &str) -> BTreeMap<String, String> {
        object_tags(self.application, self.component, self.instance, role)
    }

    /// Metadata for a workload-role object
    pub fn workload_meta(&self, name: &str) -> ObjectMeta {
        ObjectMeta::new(name, self.namespace)
            .with_tags(&self.tags(ROLE_WORKLOAD))
            .with_owner(Some(self.owner))
    }

    /// Metadata for a trait-role object
    pub fn trait_meta(&self, name: &str) -> ObjectMeta {
        ObjectMeta::new(name, self.namespace)
            .with_tags(&self.tags(ROLE_TRAIT))
            .with_owner(Some(self.owner))
    }

    /// Metadata for a trait-role object that outlives the application.
    ///
    /// Without an owner reference, the `application` annotation is what marks
    /// the object as ours on the next pass.
    pub fn unowned_trait_meta(&self, name: &str) -> ObjectMeta {
        ObjectMeta::new(name, self.namespace).with_tags(&self.tags(ROLE_TRAIT))
    }

    /// Pod selector shared by the workload and its Service
    pub fn selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(APP_LABEL_KEY.to_string(), self.instance.to_string())])
    }

    /// Labels on workload pods
    pub fn pod_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.tags(ROLE_WORKLOAD);
        labels.extend(self.selector());
        labels
    }
}

/// Workload an autoscaler drives
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleTarget {
    /// Workload apiVersion
    pub api_version: String,
    /// Workload kind
    pub kind: String,
    /// Workload name
    pub name: String,
}

impl ScaleTarget {
    /// Build a target reference
    pub fn new(api_version: &str, kind: &str, name: &str) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }
}

// =============================================================================
// CompiledComponent
// =============================================================================

/// The base workload of a component
#[derive(Clone, Debug)]
pub enum WorkloadObject {
    /// Server and Worker variants
    Deployment(Deployment),
    /// Task variants
    Job(Job),
    /// MysqlCluster
    MysqlCluster(Box<MysqlCluster>),
}

impl WorkloadObject {
    fn desired(&self) -> Result<DesiredObject, CompilationError> {
        match self {
            WorkloadObject::Deployment(d) => DesiredObject::from_resource(d),
            WorkloadObject::Job(j) => DesiredObject::from_resource(j),
            WorkloadObject::MysqlCluster(m) => DesiredObject::from_resource(m.as_ref()),
        }
    }
}

/// Every object derived from one component instance.
///
/// [`CompiledComponent::desired_objects`] yields them in apply order so that
/// config and storage exist before the pods that mount them, and the
/// workload exists before anything that targets it.
#[derive(Clone, Debug)]
pub struct CompiledComponent {
    /// Instance name
    pub instance: String,
    /// Workload type of the schematic
    pub workload_type: WorkloadType,
    /// True if an autoscaler trait owns the replica count
    pub has_autoscaler: bool,
    /// Per-container config files (and `my.cnf.tmpl` for MysqlCluster)
    pub config_maps: Vec<ConfigMap>,
    /// Claims from volume-mounter (or the MysqlCluster data claim)
    pub pvcs: Vec<PersistentVolumeClaim>,
    /// Base workload; `None` if it could not be built
    pub workload: Option<WorkloadObject>,
    /// ClusterIP Service for Server variants with ports
    pub service: Option<Service>,
    /// Ingress from ingress traits
    pub ingress: Option<Ingress>,
    /// autoscaling/v2 HPA from auto-scaler
    pub hpa: Option<HorizontalPodAutoscaler>,
    /// harmonycloud.cn HPA from better-auto-scaler
    pub hc_hpa: Option<HcHorizontalPodAutoscaler>,
    /// Non-fatal problems found while compiling
    pub warnings: Vec<String>,
}

impl CompiledComponent {
    pub(crate) fn new(instance: &str, workload_type: WorkloadType, has_autoscaler: bool) -> Self {
        Self {
            instance: instance.to_string(),
            workload_type,
            has_autoscaler,
            config_maps: Vec::new(),
            pvcs: Vec::new(),
            workload: None,
            service: None,
            ingress: None,
            hpa: None,
            hc_hpa: None,
            warnings: Vec::new(),
        }
    }

    /// Serialized objects in apply order:
    /// ConfigMaps, PVCs, workload, Service, Ingress, autoscalers
    pub fn desired_objects(&self) -> Result<Vec<DesiredObject>, CompilationError> {
        let mut objects = Vec::new();
        for cm in &self.config_maps {
            objects.push(DesiredObject::from_resource(cm)?);
        }
        for pvc in &self.pvcs {
            objects.push(DesiredObject::from_resource(pvc)?);
        }
        if let Some(workload) = &self.workload {
            objects.push(workload.desired()?);
        }
        if let Some(service) = &self.service {
            objects.push(DesiredObject::from_resource(service)?);
        }
        if let Some(ingress) = &self.ingress {
            objects.push(DesiredObject::from_resource(ingress)?);
        }
        if let Some(hpa) = &self.hpa {
            objects.push(DesiredObject::from_resource(hpa)?);
        }
        if let Some(hpa) = &self.hc_hpa {
            objects.push(DesiredObject::from_resource(hpa)?);
        }
        Ok(objects)
    }
}
