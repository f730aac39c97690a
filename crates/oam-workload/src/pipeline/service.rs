//! ClusterIP Service for Server workloads

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use oam_common::crd as oam;
use oam_common::kube_utils::HasApiResource;

use crate::compiled::ObjectContext;
use crate::k8s::{Service, ServicePort, ServiceSpec};

const CLUSTER_IP: &str = "ClusterIP";

/// Service exposing every container port, `None` if there are no ports
pub(crate) fn compile(ctx: &ObjectContext<'_>, containers: &[oam::Container]) -> Option<Service> {
    let ports: Vec<ServicePort> = containers
        .iter()
        .flat_map(|c| c.ports.iter())
        .map(|p| ServicePort {
            name: (!p.name.is_empty()).then(|| p.name.clone()),
            port: p.container_port,
            target_port: IntOrString::Int(p.container_port),
            protocol: p.protocol.clone().filter(|p| !p.is_empty()),
        })
        .collect();

    if ports.is_empty() {
        return None;
    }

    Some(Service {
        api_version: Service::API_VERSION.to_string(),
        kind: Service::KIND.to_string(),
        metadata: ctx.workload_meta(ctx.instance),
        spec: ServiceSpec {
            type_: CLUSTER_IP.to_string(),
            selector: ctx.selector(),
            ports,
        },
    })
}
