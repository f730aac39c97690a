//! MysqlCluster conversion
//!
//! A MysqlCluster component carries no containers. Its `spec` workload
//! setting is the operator's MysqlCluster spec and its `config` setting
//! names the parameter holding `my.cnf.tmpl`. The controller adds the
//! ConfigMap and the data claim the operator expects to find.

use oam_common::crd::{ComponentSchematicSpec, MysqlCluster, MysqlClusterSpec};
use serde_json::Value;

use crate::compiled::ObjectContext;
use crate::error::CompilationError;
use crate::helpers::param_value;
use crate::k8s::{ConfigMap, PersistentVolumeClaim};
use crate::params::ParameterMap;
use crate::traits::TraitSet;

const SPEC_SETTING: &str = "spec";
const CONFIG_SETTING: &str = "config";
const CONFIG_KEY: &str = "my.cnf.tmpl";
const OPERATOR_LABEL: (&str, &str) = ("operatorname", "mysql-operator");
const DATA_ACCESS_MODE: &str = "ReadWriteMany";

/// Objects making up one MysqlCluster component
#[derive(Debug)]
pub(crate) struct CompiledMysql {
    pub cluster: MysqlCluster,
    pub config_map: ConfigMap,
    pub pvc: PersistentVolumeClaim,
}

pub(crate) fn compile(
    ctx: &ObjectContext<'_>,
    schematic: &ComponentSchematicSpec,
    params: &ParameterMap,
    traits: &TraitSet,
) -> Result<CompiledMysql, CompilationError> {
    let invalid = |setting: &str, message: String| {
        CompilationError::invalid_setting(ctx.instance, setting, message)
    };

    let raw = schematic
        .setting(SPEC_SETTING)
        .and_then(|s| s.value.clone())
        .ok_or_else(|| invalid(SPEC_SETTING, "missing value".to_string()))?;
    let mut spec: MysqlClusterSpec =
        serde_json::from_value(raw).map_err(|e| invalid(SPEC_SETTING, e.to_string()))?;

    let cm_name = spec
        .cm_name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid(SPEC_SETTING, "cmName is required".to_string()))?;
    let quota = spec
        .volume_quota
        .clone()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| invalid(SPEC_SETTING, "volumeQuota is required".to_string()))?;

    let config = schematic
        .setting(CONFIG_SETTING)
        .and_then(|s| {
            param_value(s.from_param.as_deref(), params)
                .cloned()
                .or_else(|| s.value.as_ref().and_then(Value::as_str).map(String::from))
                .or_else(|| s.default.clone())
        })
        .unwrap_or_default();

    if let Some(replicas) = traits.manual_replicas() {
        spec.replicas = Some(replicas);
    }
    if spec.pvc_name.is_none() {
        spec.pvc_name = Some(ctx.instance.to_string());
    }

    let mut cluster = MysqlCluster::new(ctx.instance, spec);
    cluster.metadata = ctx
        .workload_meta(ctx.instance)
        .with_label(OPERATOR_LABEL.0, OPERATOR_LABEL.1)
        .into_kube();

    let config_map = ConfigMap::new(ctx.workload_meta(&cm_name)).with_data(CONFIG_KEY, config);

    let pvc = PersistentVolumeClaim::new(
        ctx.workload_meta(ctx.instance),
        DATA_ACCESS_MODE,
        format!("{quota}G"),
        traits.storage_class().map(String::from),
    );

    Ok(CompiledMysql {
        cluster,
        config_map,
        pvc,
    })
}
