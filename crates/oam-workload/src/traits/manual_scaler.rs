//! `manual-scaler`: fixed replica count

use serde::Deserialize;

use super::lenient_i32;

/// Replicas for Deployments and MysqlClusters, parallelism for Jobs
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManualScaler {
    /// Desired count, 1 when unset
    #[serde(default = "default_replica_count", deserialize_with = "lenient_i32")]
    pub replica_count: i32,
}

fn default_replica_count() -> i32 {
    1
}
