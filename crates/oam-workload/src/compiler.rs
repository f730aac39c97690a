//! WorkloadCompiler - converts one component instance into derived objects
//!
//! This is the single entry point of the crate: parameters are resolved,
//! the base workload is built from the schematic containers, and the trait
//! pipeline then mutates the pod spec and adds sibling objects.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use oam_common::crd::{ComponentConfiguration, ComponentSchematicSpec, Variable, WorkloadType};
use oam_common::kube_utils::HasApiResource;
use tracing::{debug, warn};

use crate::compiled::{CompiledComponent, ObjectContext, ScaleTarget, WorkloadObject};
use crate::error::CompilationError;
use crate::k8s::{
    Deployment, Job, LabelSelector, LocalObjectReference, PodSpec, PodTemplateMeta,
    PodTemplateSpec, Volume,
};
use crate::params::resolve_parameters;
use crate::pipeline::{config, containers, mysql, service};
use crate::traits::{self, TraitSet};

const JOB_RESTART_POLICY: &str = "OnFailure";

/// Compiles a component instance of an ApplicationConfiguration.
///
/// ```rust,ignore
/// let compiled = WorkloadCompiler::new(app_name, namespace, &owner, &component, &schematic)
///     .with_variables(&spec.variables)
///     .compile()?;
/// for object in compiled.desired_objects()? { /* apply */ }
/// ```
pub struct WorkloadCompiler<'a> {
    application: &'a str,
    namespace: &'a str,
    owner: &'a OwnerReference,
    component: &'a ComponentConfiguration,
    schematic: &'a ComponentSchematicSpec,
    variables: &'a [Variable],
}

impl<'a> WorkloadCompiler<'a> {
    /// Create a compiler for one component instance
    pub fn new(
        application: &'a str,
        namespace: &'a str,
        owner: &'a OwnerReference,
        component: &'a ComponentConfiguration,
        schematic: &'a ComponentSchematicSpec,
    ) -> Self {
        Self {
            application,
            namespace,
            owner,
            component,
            schematic,
            variables: &[],
        }
    }

    /// Set the application variables parameter bindings may reference
    pub fn with_variables(mut self, variables: &'a [Variable]) -> Self {
        self.variables = variables;
        self
    }

    /// Compile the component.
    ///
    /// Fails only on an unknown workload type. Problems with individual
    /// traits or settings are logged, recorded as warnings and skipped.
    pub fn compile(self) -> Result<CompiledComponent, CompilationError> {
        let instance = self.component.instance();
        let workload_type = self.schematic.workload().ok_or_else(|| {
            CompilationError::undefined_workload_type(&self.schematic.workload_type, instance)
        })?;

        let ctx = ObjectContext {
            application: self.application,
            component: &self.component.component_name,
            instance,
            namespace: self.namespace,
            owner: self.owner,
        };

        let resolved = resolve_parameters(
            &self.schematic.parameters,
            &self.component.parameter_values,
            self.variables,
        );
        let traits = TraitSet::decode(&self.component.traits);

        let mut compiled = CompiledComponent::new(instance, workload_type, false);
        compiled.warnings = resolved.warnings;

        if workload_type == WorkloadType::MysqlCluster {
            match mysql::compile(&ctx, self.schematic, &resolved.values, &traits) {
                Ok(out) => {
                    compiled.config_maps.push(out.config_map);
                    compiled.pvcs.push(out.pvc);
                    compiled.workload = Some(WorkloadObject::MysqlCluster(Box::new(out.cluster)));
                }
                Err(e) => {
                    warn!(instance = %instance, error = %e, "skipping MysqlCluster objects");
                    compiled.warnings.push(e.to_string());
                }
            }
            return Ok(compiled);
        }

        // Containers and config files
        let config = config::compile(&ctx, &self.schematic.containers, &resolved.values);
        let mut pod = PodSpec {
            containers: containers::compile(instance, &self.schematic.containers, &resolved.values),
            volumes: config.volumes,
            image_pull_secrets: image_pull_secrets(self.schematic),
            ..Default::default()
        };
        compiled.config_maps = config.config_maps;

        // Pod-mutating traits
        for pilot in traits.log_pilots() {
            pilot.apply(&mut pod);
        }
        for policy in traits.host_policies() {
            policy.apply(&mut pod);
        }
        for policy in traits.resources_policies() {
            policy.apply(&mut pod);
        }
        if let Some(policy) = traits.schedule_policy() {
            policy.apply(&mut pod, self.namespace);
        }
        for mounter in traits.volume_mounters() {
            if let Some((pvc, volume)) = mounter.compile(&ctx, self.schematic) {
                compiled.pvcs.push(pvc);
                pod.add_volume(volume);
            }
        }
        back_unclaimed_mounts(&mut pod);

        let template = PodTemplateSpec {
            metadata: PodTemplateMeta {
                labels: ctx.pod_labels(),
            },
            spec: pod,
        };
        let replicas = if workload_type.is_singleton() {
            1
        } else {
            traits.replicas()
        };

        let target = if workload_type.is_task() {
            let mut template = template;
            template.spec.restart_policy = Some(JOB_RESTART_POLICY.to_string());
            compiled.workload = Some(WorkloadObject::Job(Job::new(
                ctx.workload_meta(instance),
                replicas,
                template,
            )));
            ScaleTarget::new(Job::API_VERSION, Job::KIND, instance)
        } else {
            let selector = LabelSelector {
                match_labels: ctx.selector(),
                ..Default::default()
            };
            compiled.workload = Some(WorkloadObject::Deployment(Deployment::new(
                ctx.workload_meta(instance),
                replicas,
                selector,
                template,
            )));
            ScaleTarget::new(Deployment::API_VERSION, Deployment::KIND, instance)
        };

        if workload_type.is_server() {
            compiled.service = service::compile(&ctx, &self.schematic.containers);
            compiled.ingress = traits::ingress::compile(&ctx, traits.ingresses());
        } else if traits.ingresses().next().is_some() {
            debug!(instance = %instance, "ignoring ingress trait on non-server workload");
        }

        if workload_type.supports_autoscaling() {
            compiled.hpa = traits.auto_scaler().map(|s| s.compile(&ctx, &target));
            compiled.hc_hpa = traits.better_auto_scaler().map(|s| s.compile(&ctx, &target));
        }
        compiled.has_autoscaler = compiled.hpa.is_some() || compiled.hc_hpa.is_some();

        Ok(compiled)
    }
}

/// Distinct image pull secrets of all containers, in declaration order
fn image_pull_secrets(schematic: &ComponentSchematicSpec) -> Vec<LocalObjectReference> {
    let mut secrets: Vec<LocalObjectReference> = Vec::new();
    for name in schematic
        .containers
        .iter()
        .filter_map(|c| c.image_pull_secret.as_deref())
        .filter(|s| !s.is_empty())
    {
        if !secrets.iter().any(|s| s.name == name) {
            secrets.push(LocalObjectReference {
                name: name.to_string(),
            });
        }
    }
    secrets
}

/// Give every mounted volume without a source an emptyDir
fn back_unclaimed_mounts(pod: &mut PodSpec) {
    let unclaimed: Vec<String> = pod
        .containers
        .iter()
        .flat_map(|c| c.volume_mounts.iter())
        .filter(|m| !pod.volumes.iter().any(|v| v.name == m.name))
        .map(|m| m.name.clone())
        .collect();
    for name in unclaimed {
        pod.add_volume(Volume::from_empty_dir(name));
    }
}
