//! Container compilation
//!
//! Turns schematic containers into pod containers: env resolved through the
//! parameter map, requests equal to limits, the declared probe handler and
//! one mount per declared volume and config file.

use oam_common::crd::{self as oam, HealthProbe, Resources};

use crate::helpers::{
    basename, canonical_quantity, config_volume_name, is_zero_quantity, param_value,
};
use crate::k8s::{
    Container, ContainerPort, EnvVar, ExecAction, HttpGetAction, HttpHeader, ProbeSpec,
    ResourceList, ResourceRequirements, TcpSocketAction, VolumeMount,
};
use crate::params::ParameterMap;

const GPU_RESOURCE: &str = "nvidia.com/gpu";

/// Compile every container of a schematic
pub(crate) fn compile(
    instance: &str,
    containers: &[oam::Container],
    params: &ParameterMap,
) -> Vec<Container> {
    containers
        .iter()
        .map(|c| Container {
            name: c.name.clone(),
            image: c.image.clone(),
            command: (!c.cmd.is_empty()).then(|| c.cmd.clone()),
            args: (!c.args.is_empty()).then(|| c.args.clone()),
            env: compile_env(&c.env, params),
            ports: c
                .ports
                .iter()
                .map(|p| ContainerPort {
                    name: (!p.name.is_empty()).then(|| p.name.clone()),
                    container_port: p.container_port,
                    protocol: p.protocol.clone().filter(|p| !p.is_empty()),
                })
                .collect(),
            resources: compile_resources(&c.resources),
            liveness_probe: c.liveness_probe.as_ref().map(compile_probe),
            readiness_probe: c.readiness_probe.as_ref().map(compile_probe),
            volume_mounts: compile_mounts(instance, c),
        })
        .collect()
}

/// Literal values, overridden by `fromParam` when it names a resolved parameter
fn compile_env(env: &[oam::EnvEntry], params: &ParameterMap) -> Vec<EnvVar> {
    env.iter()
        .map(|e| {
            let value = param_value(e.from_param.as_deref(), params)
                .cloned()
                .or_else(|| e.value.clone())
                .unwrap_or_default();
            EnvVar::literal(&e.name, value)
        })
        .collect()
}

fn compile_resources(resources: &Resources) -> Option<ResourceRequirements> {
    let mut list = ResourceList::new();
    let declared = [
        ("cpu", resources.cpu.as_ref()),
        ("memory", resources.memory.as_ref()),
        (GPU_RESOURCE, resources.gpu.as_ref()),
    ];
    for (name, quantity) in declared {
        if let Some(q) = quantity.filter(|q| !is_zero_quantity(&q.required)) {
            list.insert(name.to_string(), canonical_quantity(&q.required));
        }
    }
    for extended in &resources.extended {
        if !is_zero_quantity(&extended.required) {
            list.insert(extended.name.clone(), canonical_quantity(&extended.required));
        }
    }

    if list.is_empty() {
        return None;
    }
    Some(ResourceRequirements {
        requests: list.clone(),
        limits: list,
    })
}

/// Only the declared handler is set; exec wins over httpGet over tcpSocket
fn compile_probe(probe: &HealthProbe) -> ProbeSpec {
    let mut spec = ProbeSpec {
        initial_delay_seconds: probe.initial_delay_seconds,
        period_seconds: probe.period_seconds,
        timeout_seconds: probe.timeout_seconds,
        failure_threshold: probe.failure_threshold,
        success_threshold: probe.success_threshold,
        ..Default::default()
    };
    if let Some(exec) = &probe.exec {
        spec.exec = Some(ExecAction {
            command: exec.command.clone(),
        });
    } else if let Some(http) = &probe.http_get {
        spec.http_get = Some(HttpGetAction {
            path: http.path.clone(),
            port: http.port,
            http_headers: http
                .http_headers
                .iter()
                .map(|h| HttpHeader {
                    name: h.name.clone(),
                    value: h.value.clone(),
                })
                .collect(),
        });
    } else if let Some(tcp) = &probe.tcp_socket {
        spec.tcp_socket = Some(TcpSocketAction { port: tcp.port });
    }
    spec
}

fn compile_mounts(instance: &str, container: &oam::Container) -> Vec<VolumeMount> {
    let declared = container.resources.volumes.iter().map(|v| {
        VolumeMount::new(
            &v.name,
            &v.mount_path,
            v.access_mode == Some(oam::AccessMode::RO),
        )
    });
    let config_volume = config_volume_name(instance, &container.name);
    let files = container
        .config
        .iter()
        .map(|f| VolumeMount::readonly_file(&config_volume, &f.path, basename(&f.path)));
    declared.chain(files).collect()
}
