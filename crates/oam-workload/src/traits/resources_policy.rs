//! `resources-policy`: override one container's limits

use std::collections::BTreeMap;

use serde::Deserialize;

use super::quantity_map;
use crate::k8s::PodSpec;

/// Replacement limits for a named container
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesPolicy {
    /// Container to change
    pub container: String,
    /// New limits; requests are left alone
    #[serde(default, deserialize_with = "quantity_map")]
    pub limits: BTreeMap<String, String>,
}

impl ResourcesPolicy {
    /// Replace the limits of the matching container, if any
    pub fn apply(&self, pod: &mut PodSpec) {
        for container in pod.containers.iter_mut().filter(|c| c.name == self.container) {
            container.resources.get_or_insert_with(Default::default).limits = self.limits.clone();
        }
    }
}
