//! MysqlCluster custom resource, owned by the mysql-operator
//!
//! Only the fields the controller reads or sets are typed; everything else
//! in the component's `spec` setting passes through untouched.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::kube_utils::HasApiResource;

/// MysqlCluster deployment spec
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "mysql.middleware.harmonycloud.cn",
    version = "v1alpha1",
    kind = "MysqlCluster",
    plural = "mysqlclusters",
    namespaced,
    status = "MysqlClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MysqlClusterSpec {
    /// Desired instance count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Image version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Image repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Replication topology (`master-master` or `master-slave`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<String>,

    /// Claim holding the data, created by the controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvc_name: Option<String>,

    /// Size of the data claim in gigabytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_quota: Option<String>,

    /// ConfigMap holding `my.cnf.tmpl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cm_name: Option<String>,

    /// Secret with credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    /// Remaining operator fields, passed through verbatim
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// MysqlCluster status as reported by the mysql-operator
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MysqlClusterStatus {
    /// Current instance count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Failed instance count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_count: Option<i64>,
    /// Creating, Running, Failed or Error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Reason for the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Current statefulset revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_revision: Option<String>,
    /// Target statefulset revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_revision: Option<String>,
    /// Master switch-overs performed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_switched_num: Option<i32>,
}

impl HasApiResource for MysqlCluster {
    const API_VERSION: &'static str = "mysql.middleware.harmonycloud.cn/v1alpha1";
    const KIND: &'static str = "MysqlCluster";
}
