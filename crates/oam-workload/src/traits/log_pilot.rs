//! `log-pilot`: expose a container's log directory to a log-pilot agent
//!
//! log-pilot discovers log sources through `<prefix>_logs_<name>` env vars
//! on the container. The directory itself is an emptyDir so the agent can
//! read it from the node.

use serde::Deserialize;

use crate::helpers::log_volume_name;
use crate::k8s::{EnvVar, PodSpec, Volume, VolumeMount};

fn default_prefix() -> String {
    "aliyun".to_string()
}

/// Log collection settings for one container
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogPilot {
    /// Container writing the logs
    pub container: String,
    /// Log directory inside the container
    pub path: String,
    /// Log source name (index)
    pub name: String,
    /// Extra tags, `k=v,k=v`
    #[serde(default)]
    pub tags: String,
    /// Env var prefix the agent looks for
    #[serde(default = "default_prefix")]
    pub pilot_log_prefix: String,
}

impl LogPilot {
    /// Glob of the log files under `path`
    fn log_glob(&self) -> String {
        if self.path.ends_with('/') {
            format!("{}*", self.path)
        } else {
            format!("{}/*", self.path)
        }
    }

    /// Add env vars, mount and volume to the matching container
    pub fn apply(&self, pod: &mut PodSpec) {
        let volume = log_volume_name(&self.container);
        let mut matched = false;
        for container in pod.containers.iter_mut() {
            if container.name != self.container {
                continue;
            }
            matched = true;
            let env_name = format!("{}_logs_{}", self.pilot_log_prefix, self.name);
            container.env.push(EnvVar::literal(&env_name, self.log_glob()));
            container
                .env
                .push(EnvVar::literal(format!("{env_name}_tags"), &self.tags));
            container
                .volume_mounts
                .push(VolumeMount::new(&volume, &self.path, false));
        }
        if matched {
            pod.add_volume(Volume::from_empty_dir(volume));
        }
    }
}
