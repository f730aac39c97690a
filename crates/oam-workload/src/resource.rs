//! Type-erased desired objects
//!
//! Every derived object, whatever its Rust type, is applied the same way:
//! serialized to JSON and written through a `DynamicObject` API. A
//! [`ManagedResource`] describes the per-kind rules the applier needs
//! (scale field, exclusive maps, create-only) and [`DesiredObject`] carries
//! them together with the serialized body.

use kube::discovery::ApiResource;
use oam_common::crd::{HcHorizontalPodAutoscaler, MysqlCluster, RecordKey};
use oam_common::kube_utils::{is_json_subset, json_path, set_json_path, HasApiResource};
use oam_common::ROLE_KEY;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CompilationError;
use crate::k8s::{
    ConfigMap, Deployment, HorizontalPodAutoscaler, Ingress, Job, PersistentVolumeClaim, Service,
};

const REPLICAS_PATH: &[&str] = &["spec", "replicas"];
const PARALLELISM_PATH: &[&str] = &["spec", "parallelism"];

/// A derived object kind the controller writes
pub trait ManagedResource: Serialize + HasApiResource {
    /// Field an autoscaler owns at runtime, preserved from the live object
    const SCALE_PATH: Option<&'static [&'static str]> = None;
    /// Top-level maps whose keys must match the live object exactly
    const EXCLUSIVE_MAPS: &'static [&'static str] = &[];
    /// Existing objects are never patched
    const CREATE_ONLY: bool = false;
}

impl ManagedResource for ConfigMap {
    const EXCLUSIVE_MAPS: &'static [&'static str] = &["data"];
}

impl ManagedResource for PersistentVolumeClaim {
    const CREATE_ONLY: bool = true;
}

impl ManagedResource for Deployment {
    const SCALE_PATH: Option<&'static [&'static str]> = Some(REPLICAS_PATH);
}

impl ManagedResource for Job {
    const SCALE_PATH: Option<&'static [&'static str]> = Some(PARALLELISM_PATH);
}

impl ManagedResource for MysqlCluster {
    const SCALE_PATH: Option<&'static [&'static str]> = Some(REPLICAS_PATH);
}

impl ManagedResource for Service {}
impl ManagedResource for Ingress {}
impl ManagedResource for HorizontalPodAutoscaler {}
impl ManagedResource for HcHorizontalPodAutoscaler {}

/// A serialized derived object with the rules for applying it
#[derive(Clone, Debug)]
pub struct DesiredObject {
    /// API coordinates
    pub api_resource: ApiResource,
    /// Object name
    pub name: String,
    /// Object namespace
    pub namespace: String,
    /// `workload` or `trait`
    pub role: String,
    /// Serialized object, usable as a merge patch
    pub body: Value,
    /// Field an autoscaler owns
    pub scale_path: Option<&'static [&'static str]>,
    /// Maps that must match exactly
    pub exclusive_maps: &'static [&'static str],
    /// Never patch an existing object
    pub create_only: bool,
}

impl DesiredObject {
    /// Serialize a typed resource
    pub fn from_resource<T: ManagedResource>(resource: &T) -> Result<Self, CompilationError> {
        let body = serde_json::to_value(resource)?;
        let meta = |key: &str| {
            json_path(&body, &["metadata", key])
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let role = json_path(&body, &["metadata", "labels", ROLE_KEY])
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            api_resource: T::api_resource(),
            name: meta("name"),
            namespace: meta("namespace"),
            role,
            scale_path: T::SCALE_PATH,
            exclusive_maps: T::EXCLUSIVE_MAPS,
            create_only: T::CREATE_ONLY,
            body,
        })
    }

    /// Object kind
    pub fn kind(&self) -> &str {
        &self.api_resource.kind
    }

    /// Object apiVersion
    pub fn group_version(&self) -> &str {
        &self.api_resource.api_version
    }

    /// Lowercase plural, as used in event notes
    pub fn plural(&self) -> &str {
        &self.api_resource.plural
    }

    /// Key of this object's status record
    pub fn record_key(&self) -> RecordKey {
        RecordKey::new(
            self.kind(),
            &self.namespace,
            &self.name,
            self.group_version(),
        )
    }

    /// Copy the live value of the autoscaler-owned field into the desired body
    pub fn preserve_scale(&mut self, live: &Value) {
        let Some(path) = self.scale_path else {
            return;
        };
        if let Some(current) = json_path(live, path) {
            if !current.is_null() {
                set_json_path(&mut self.body, path, current.clone());
            }
        }
    }

    /// True if merge-patching this object onto `live` would change nothing
    pub fn is_satisfied_by(&self, live: &Value) -> bool {
        if !is_json_subset(&self.body, live) {
            return false;
        }
        self.exclusive_maps.iter().all(|field| {
            let desired = self.body.get(*field).and_then(Value::as_object);
            let live = live.get(*field).and_then(Value::as_object);
            match (desired, live) {
                (Some(d), Some(l)) => l.keys().all(|k| d.contains_key(k)),
                (None, Some(l)) => l.is_empty(),
                (_, None) => true,
            }
        })
    }

    /// Merge patch bringing `live` to this object, deleting stale exclusive-map keys
    pub fn merge_patch(&self, live: &Value) -> Value {
        let mut patch = self.body.clone();
        for field in self.exclusive_maps {
            let Some(stale) = live.get(*field).and_then(Value::as_object) else {
                continue;
            };
            let desired = patch.get(*field).and_then(Value::as_object).cloned().unwrap_or_default();
            let mut merged: Map<String, Value> = desired.clone();
            for key in stale.keys().filter(|k| !desired.contains_key(*k)) {
                merged.insert(key.clone(), Value::Null);
            }
            if let Some(obj) = patch.as_object_mut() {
                obj.insert(field.to_string(), Value::Object(merged));
            }
        }
        patch
    }
}
