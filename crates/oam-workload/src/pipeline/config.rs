//! Config file compilation
//!
//! Each container with config files gets one ConfigMap
//! (`{instance}-{container}`) keyed by file basename, and one pod volume
//! (`{instance}-{container}-config`) projecting every key.

use oam_common::crd as oam;

use crate::compiled::ObjectContext;
use crate::helpers::{basename, config_map_name, config_volume_name, param_value};
use crate::k8s::{ConfigMap, Volume};
use crate::params::ParameterMap;

/// ConfigMaps and the pod volumes that project them
#[derive(Debug, Default)]
pub(crate) struct CompiledConfig {
    pub config_maps: Vec<ConfigMap>,
    pub volumes: Vec<Volume>,
}

pub(crate) fn compile(
    ctx: &ObjectContext<'_>,
    containers: &[oam::Container],
    params: &ParameterMap,
) -> CompiledConfig {
    let mut compiled = CompiledConfig::default();

    for container in containers.iter().filter(|c| !c.config.is_empty()) {
        let cm_name = config_map_name(ctx.instance, &container.name);
        let mut cm = ConfigMap::new(ctx.workload_meta(&cm_name));
        for file in &container.config {
            let content = param_value(file.from_param.as_deref(), params)
                .cloned()
                .or_else(|| file.value.clone())
                .unwrap_or_default();
            cm = cm.with_data(basename(&file.path), content);
        }

        compiled.volumes.push(Volume::from_config_map(
            config_volume_name(ctx.instance, &container.name),
            &cm_name,
            cm.data.keys(),
        ));
        compiled.config_maps.push(cm);
    }

    compiled
}
