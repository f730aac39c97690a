//! ApplicationConfiguration status: per-resource records and per-component health
//!
//! Each derived object has one [`ResourceRecord`]. The reconciler fills in
//! how the last write went (`sync`), child watchers fill in what the object
//! reports (`observed`, plus a human-readable `status` line). Module health
//! is computed from the records by the status aggregator.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Phase and health
// =============================================================================

/// Lifecycle phase of an ApplicationConfiguration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub enum ApplicationPhase {
    /// No pass has completed yet
    #[default]
    Pending,
    /// Every component was converted and its objects applied
    Synced,
    /// The last pass aborted
    Failed,
}

impl fmt::Display for ApplicationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Synced => write!(f, "Synced"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Coarse health of a component
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum Health {
    /// Every child reports ready
    Healthy,
    /// Some child failed to apply or is not ready
    #[default]
    Unhealthy,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Unhealthy => write!(f, "Unhealthy"),
        }
    }
}

/// Outcome of the last write of a derived object
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SyncState {
    /// Created, patched or already up to date
    #[default]
    Synced,
    /// Create was rejected
    CreateFailed,
    /// Patch was rejected
    PatchFailed,
    /// The existing object could not be read
    ReadFailed,
}

impl SyncState {
    /// True for any failed outcome
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Synced)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced => write!(f, "Synced"),
            Self::CreateFailed => write!(f, "Create Failed"),
            Self::PatchFailed => write!(f, "Patch Failed"),
            Self::ReadFailed => write!(f, "Read Failed"),
        }
    }
}

// =============================================================================
// Observations
// =============================================================================

/// Deployment replica counts
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentObservation {
    /// Desired replicas
    pub replicas: i32,
    /// Ready replicas
    pub ready_replicas: i32,
    /// Replicas on the latest template
    pub updated_replicas: i32,
    /// Available replicas
    pub available_replicas: i32,
}

/// Job pod counts
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobObservation {
    /// Running pods
    pub active: i32,
    /// Succeeded pods
    pub succeeded: i32,
    /// Failed pods
    pub failed: i32,
}

/// Autoscaler replica counts, for both autoscaler variants
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerObservation {
    /// Replicas currently running
    pub current_replicas: i32,
    /// Replicas the autoscaler wants
    pub desired_replicas: i32,
}

/// PersistentVolumeClaim binding state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimObservation {
    /// Pending, Bound or Lost
    pub phase: String,
    /// Bound volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Bound capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<String>,
    /// Granted access modes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,
    /// Storage class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// Service addressing
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceObservation {
    /// ClusterIP, NodePort or LoadBalancer
    pub service_type: String,
    /// Allocated cluster IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
    /// Ports as `port/protocol` or `port:nodePort/protocol`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

/// ConfigMap size
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapObservation {
    /// Number of data keys
    pub keys: i32,
}

/// Ingress routing
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressObservation {
    /// Hosts served
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
}

/// MysqlCluster state
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MysqlClusterObservation {
    /// Creating, Running, Failed or Error
    pub phase: String,
    /// Current instance count
    pub replicas: i32,
    /// Failed instance count
    #[serde(default)]
    pub failed_count: i64,
    /// Reason for the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Structured state of a derived object, computed when it is observed
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(tag = "type")]
pub enum ObservedState {
    /// Deployment counts
    Deployment(DeploymentObservation),
    /// Job counts
    Job(JobObservation),
    /// Autoscaler counts
    Autoscaler(AutoscalerObservation),
    /// Claim binding
    Claim(ClaimObservation),
    /// Service addressing
    Service(ServiceObservation),
    /// ConfigMap size
    ConfigMap(ConfigMapObservation),
    /// Ingress hosts
    Ingress(IngressObservation),
    /// MysqlCluster state
    MysqlCluster(MysqlClusterObservation),
}

impl ObservedState {
    /// One-line summary shown in the `status` column of a record
    pub fn summary(&self) -> String {
        match self {
            Self::Deployment(d) => format!(
                "Ready: {}/{}, Up-to-date: {}, Available: {}",
                d.ready_replicas, d.replicas, d.updated_replicas, d.available_replicas
            ),
            Self::Job(j) => format!(
                "Active: {}, Succeeded: {}, Failed: {}.",
                j.active, j.succeeded, j.failed
            ),
            Self::Autoscaler(a) => format!(
                "CurrentReplicas: {}, DesiredReplicas: {}.",
                a.current_replicas, a.desired_replicas
            ),
            Self::Claim(c) if c.phase == "Bound" => {
                let mut parts = Vec::new();
                if let Some(v) = &c.volume {
                    parts.push(format!("Volume: {v}"));
                }
                if let Some(cap) = &c.capacity {
                    parts.push(format!("Capacity: {cap}"));
                }
                if !c.access_modes.is_empty() {
                    parts.push(format!("AccessModes: {}", c.access_modes.join(",")));
                }
                if let Some(sc) = &c.storage_class {
                    parts.push(format!("StorageClass: {sc}"));
                }
                parts.push("Status: Bound.".to_string());
                parts.join(", ")
            }
            Self::Claim(c) => format!("Status: {}.", c.phase),
            Self::Service(s) => format!(
                "Type: {}, Cluster-IP: {}, Port(s): {}",
                s.service_type,
                s.cluster_ip.as_deref().unwrap_or("<none>"),
                if s.ports.is_empty() {
                    "<none>".to_string()
                } else {
                    s.ports.join(",")
                }
            ),
            Self::ConfigMap(c) => format!("Data: {}", c.keys),
            Self::Ingress(i) => format!("Hosts: {}", i.hosts.join(",")),
            Self::MysqlCluster(m) => {
                let mut line = format!(
                    "Phase: {}, Replicas: {}, FailedCount: {}",
                    m.phase, m.replicas, m.failed_count
                );
                if let Some(reason) = &m.reason {
                    line.push_str(&format!(", Reason: {reason}"));
                }
                line
            }
        }
    }
}

// =============================================================================
// Records
// =============================================================================

/// Identity of a record: one per `(kind, namespacedName, groupVersion)`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Object kind
    pub kind: String,
    /// `namespace/name`
    pub namespaced_name: String,
    /// Object group version
    pub group_version: String,
}

impl RecordKey {
    /// Build a key from its parts
    pub fn new(
        kind: impl Into<String>,
        namespace: &str,
        name: &str,
        group_version: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespaced_name: format!("{namespace}/{name}"),
            group_version: group_version.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.namespaced_name, self.group_version)
    }
}

/// Status of one derived object
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    /// `namespace/name`
    pub namespaced_name: String,
    /// Object kind
    pub kind: String,
    /// Object group version
    pub group_version: String,
    /// Component instance the object belongs to
    pub component: String,
    /// `workload` or `trait`
    #[serde(default)]
    pub role: String,
    /// Outcome of the last write
    #[serde(default)]
    pub sync: SyncState,
    /// Human-readable state, e.g. `Ready: 3/3, Up-to-date: 3, Available: 3`
    #[serde(default)]
    pub status: String,
    /// Structured state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<ObservedState>,
    /// Error from the last failed write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResourceRecord {
    /// The record's identity
    pub fn key(&self) -> RecordKey {
        RecordKey {
            kind: self.kind.clone(),
            namespaced_name: self.namespaced_name.clone(),
            group_version: self.group_version.clone(),
        }
    }

    fn matches(&self, key: &RecordKey) -> bool {
        self.kind == key.kind
            && self.namespaced_name == key.namespaced_name
            && self.group_version == key.group_version
    }
}

/// Health of one component instance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    /// `namespace/instance`
    pub namespaced_name: String,
    /// Canonical workload kind, e.g. `Server`
    pub kind: String,
    /// Workload group version
    pub group_version: String,
    /// Derived health
    pub status: Health,
}

/// Status of an ApplicationConfiguration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfigurationStatus {
    /// Current phase
    #[serde(default)]
    pub phase: ApplicationPhase,

    /// Human-readable message about the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Generation the last full pass ran against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// One record per derived object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceRecord>,

    /// One entry per component instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleStatus>,
}

/// Status keys that serialization omits when empty
const CLEARABLE_FIELDS: [&str; 4] = ["message", "observedGeneration", "resources", "modules"];

impl ApplicationConfigurationStatus {
    /// JSON merge patch that turns any stored status into this one.
    ///
    /// Fields omitted by serialization are sent as `null` so a cleared
    /// message or emptied list is removed on the server.
    pub fn merge_patch(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut patch = serde_json::to_value(self)?;
        if let serde_json::Value::Object(fields) = &mut patch {
            for key in CLEARABLE_FIELDS {
                fields.entry(key).or_insert(serde_json::Value::Null);
            }
        }
        Ok(patch)
    }

    /// Find a record by key
    pub fn record(&self, key: &RecordKey) -> Option<&ResourceRecord> {
        self.resources.iter().find(|r| r.matches(key))
    }

    fn record_mut(&mut self, key: &RecordKey, component: &str, role: &str) -> &mut ResourceRecord {
        let idx = match self.resources.iter().position(|r| r.matches(key)) {
            Some(idx) => idx,
            None => {
                self.resources.push(ResourceRecord {
                    namespaced_name: key.namespaced_name.clone(),
                    kind: key.kind.clone(),
                    group_version: key.group_version.clone(),
                    ..Default::default()
                });
                self.resources.len() - 1
            }
        };
        let record = &mut self.resources[idx];
        if !component.is_empty() {
            record.component = component.to_string();
        }
        if !role.is_empty() {
            record.role = role.to_string();
        }
        record
    }

    /// Upsert the write outcome of a derived object, keeping its observation.
    ///
    /// Failures replace the display text; a later success restores the
    /// observation summary if one exists.
    pub fn record_sync(
        &mut self,
        key: &RecordKey,
        component: &str,
        role: &str,
        sync: SyncState,
        message: Option<String>,
    ) {
        let record = self.record_mut(key, component, role);
        record.sync = sync;
        record.message = message;
        record.status = match (&record.observed, sync.is_failure()) {
            (_, true) => sync.to_string(),
            (Some(observed), false) => observed.summary(),
            (None, false) => String::new(),
        };
    }

    /// Upsert the observed state of a derived object, keeping its write outcome
    pub fn record_observation(
        &mut self,
        key: &RecordKey,
        component: &str,
        role: &str,
        observed: ObservedState,
    ) {
        let record = self.record_mut(key, component, role);
        if !record.sync.is_failure() {
            record.status = observed.summary();
        }
        record.observed = Some(observed);
    }

    /// Records belonging to one component instance
    pub fn records_for<'a>(
        &'a self,
        component: &'a str,
    ) -> impl Iterator<Item = &'a ResourceRecord> + 'a {
        self.resources.iter().filter(move |r| r.component == component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment_key() -> RecordKey {
        RecordKey::new("Deployment", "default", "web", "apps/v1")
    }

    fn ready(n: i32) -> ObservedState {
        ObservedState::Deployment(DeploymentObservation {
            replicas: n,
            ready_replicas: n,
            updated_replicas: n,
            available_replicas: n,
        })
    }

    // ==========================================================================
    // Story Tests: Status patches
    // ==========================================================================

    /// Story: Clearing a field after a failed pass removes it on the server
    #[test]
    fn story_merge_patch_nulls_cleared_fields() {
        let status = ApplicationConfigurationStatus {
            phase: ApplicationPhase::Synced,
            ..Default::default()
        };

        let patch = status.merge_patch().unwrap();

        assert_eq!(patch["phase"], serde_json::json!("Synced"));
        for key in ["message", "observedGeneration", "resources", "modules"] {
            assert!(patch[key].is_null(), "{key} should be sent as null");
            assert!(patch.get(key).is_some());
        }
    }

    /// Story: Populated fields are sent as-is
    #[test]
    fn story_merge_patch_keeps_populated_fields() {
        let mut status = ApplicationConfigurationStatus {
            message: Some("undefined kind Secret".to_string()),
            observed_generation: Some(4),
            ..Default::default()
        };
        status.record_sync(&deployment_key(), "web", "workload", SyncState::Synced, None);

        let patch = status.merge_patch().unwrap();

        assert_eq!(patch["message"], serde_json::json!("undefined kind Secret"));
        assert_eq!(patch["observedGeneration"], serde_json::json!(4));
        assert_eq!(patch["resources"].as_array().map(Vec::len), Some(1));
        assert!(patch["modules"].is_null());
    }

    // ==========================================================================
    // Story Tests: Record upserts
    // ==========================================================================

    /// Story: Reconciler and watchers share one record per object
    ///
    /// The reconciler reports write outcomes and watchers report observed
    /// state; neither erases what the other wrote and no duplicates appear.
    #[test]
    fn story_sync_and_observation_share_a_record() {
        let mut status = ApplicationConfigurationStatus::default();
        let key = deployment_key();

        status.record_sync(&key, "web", "workload", SyncState::Synced, None);
        status.record_observation(&key, "web", "workload", ready(3));
        status.record_sync(&key, "web", "workload", SyncState::Synced, None);

        assert_eq!(status.resources.len(), 1);
        let record = status.record(&key).unwrap();
        assert_eq!(record.namespaced_name, "default/web");
        assert_eq!(record.status, "Ready: 3/3, Up-to-date: 3, Available: 3");
        assert_eq!(record.observed, Some(ready(3)));
    }

    /// Story: A failed write is visible until a later write succeeds
    #[test]
    fn story_failures_override_display_until_recovered() {
        let mut status = ApplicationConfigurationStatus::default();
        let key = deployment_key();
        status.record_observation(&key, "web", "workload", ready(2));
        status.record_sync(
            &key,
            "web",
            "workload",
            SyncState::PatchFailed,
            Some("admission webhook denied".to_string()),
        );

        let record = status.record(&key).unwrap();
        assert_eq!(record.status, "Patch Failed");
        assert_eq!(record.message.as_deref(), Some("admission webhook denied"));

        // observations while failed keep the failure text
        status.record_observation(&key, "web", "workload", ready(3));
        assert_eq!(status.record(&key).unwrap().status, "Patch Failed");

        status.record_sync(&key, "web", "workload", SyncState::Synced, None);
        let record = status.record(&key).unwrap();
        assert_eq!(record.status, "Ready: 3/3, Up-to-date: 3, Available: 3");
        assert!(record.message.is_none());
    }

    /// Story: Same name under different kinds or groups are distinct records
    #[test]
    fn story_records_are_keyed_by_kind_name_and_group() {
        let mut status = ApplicationConfigurationStatus::default();
        let hpa = RecordKey::new("HorizontalPodAutoscaler", "default", "web", "autoscaling/v2");
        let hc = RecordKey::new(
            "HorizontalPodAutoscaler",
            "default",
            "web",
            "harmonycloud.cn/v1beta1",
        );
        status.record_sync(&deployment_key(), "web", "workload", SyncState::Synced, None);
        status.record_sync(&hpa, "web", "trait", SyncState::Synced, None);
        status.record_sync(&hc, "web", "trait", SyncState::Synced, None);
        status.record_sync(&hc, "web", "trait", SyncState::Synced, None);
        assert_eq!(status.resources.len(), 3);
        assert_eq!(status.records_for("web").count(), 3);
        assert_eq!(status.records_for("other").count(), 0);
    }

    #[test]
    fn test_summaries() {
        let job = ObservedState::Job(JobObservation {
            active: 1,
            succeeded: 0,
            failed: 0,
        });
        assert_eq!(job.summary(), "Active: 1, Succeeded: 0, Failed: 0.");

        let pending = ObservedState::Claim(ClaimObservation {
            phase: "Pending".to_string(),
            ..Default::default()
        });
        assert_eq!(pending.summary(), "Status: Pending.");

        let bound = ObservedState::Claim(ClaimObservation {
            phase: "Bound".to_string(),
            volume: Some("pv-1".to_string()),
            capacity: Some("10Gi".to_string()),
            access_modes: vec!["RWX".to_string()],
            storage_class: Some("nfs".to_string()),
        });
        assert_eq!(
            bound.summary(),
            "Volume: pv-1, Capacity: 10Gi, AccessModes: RWX, StorageClass: nfs, Status: Bound."
        );

        let svc = ObservedState::Service(ServiceObservation {
            service_type: "NodePort".to_string(),
            cluster_ip: Some("10.0.0.1".to_string()),
            ports: vec!["80:30080/TCP".to_string()],
        });
        assert_eq!(
            svc.summary(),
            "Type: NodePort, Cluster-IP: 10.0.0.1, Port(s): 80:30080/TCP"
        );
    }

    #[test]
    fn test_observed_state_is_tagged() {
        let value = serde_json::to_value(ready(1)).unwrap();
        assert_eq!(value["type"], "Deployment");
        assert_eq!(value["readyReplicas"], 1);
        let back: ObservedState = serde_json::from_value(value).unwrap();
        assert_eq!(back, ready(1));
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(SyncState::CreateFailed.to_string(), "Create Failed");
        assert!(SyncState::ReadFailed.is_failure());
        assert!(!SyncState::Synced.is_failure());
        assert_eq!(Health::Healthy.to_string(), "Healthy");
        assert_eq!(ApplicationPhase::Synced.to_string(), "Synced");
    }
}
