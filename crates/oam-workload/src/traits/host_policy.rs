//! `host-policy`: host namespaces for the pod

use serde::Deserialize;

use crate::k8s::PodSpec;

/// Host network, PID and IPC namespace flags
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostPolicy {
    /// Use the host network
    #[serde(default)]
    pub host_network: bool,
    /// Share the host PID namespace
    #[serde(default)]
    pub host_pid: bool,
    /// Share the host IPC namespace
    #[serde(default)]
    pub host_ipc: bool,
}

impl HostPolicy {
    /// Set the pod's host namespace fields
    pub fn apply(&self, pod: &mut PodSpec) {
        pod.host_network = Some(self.host_network);
        pod.host_pid = Some(self.host_pid);
        pod.host_ipc = Some(self.host_ipc);
    }
}
