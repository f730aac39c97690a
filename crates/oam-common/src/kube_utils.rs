//! Shared Kubernetes helpers for derived objects
//!
//! Desired objects are built as plain serde types and applied through
//! `DynamicObject`, so the helpers here deal in API coordinates, owner
//! references and raw JSON comparison rather than typed clients.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta as KubeObjectMeta, OwnerReference};
use kube::discovery::ApiResource;
use serde_json::Value;

// =============================================================================
// ObjectMeta - metadata for every derived object
// =============================================================================

/// Kubernetes ObjectMeta for derived objects.
///
/// Only the fields the controller sets are modelled so that merge patches
/// never touch server-managed metadata.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,
    /// Resource namespace
    pub namespace: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Owner references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    /// Create new metadata without labels
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add every entry of `labels` as both label and annotation
    pub fn with_tags(mut self, labels: &BTreeMap<String, String>) -> Self {
        for (k, v) in labels {
            self.labels.insert(k.clone(), v.clone());
            self.annotations.insert(k.clone(), v.clone());
        }
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Set the controller owner reference
    pub fn with_owner(mut self, owner: Option<&OwnerReference>) -> Self {
        if let Some(owner) = owner {
            self.owner_references.push(owner.clone());
        }
        self
    }

    /// Convert to k8s-openapi metadata for kube-derived custom resources
    pub fn into_kube(self) -> KubeObjectMeta {
        let non_empty = |m: BTreeMap<String, String>| (!m.is_empty()).then_some(m);
        KubeObjectMeta {
            name: Some(self.name),
            namespace: Some(self.namespace),
            labels: non_empty(self.labels),
            annotations: non_empty(self.annotations),
            owner_references: (!self.owner_references.is_empty())
                .then_some(self.owner_references),
            ..Default::default()
        }
    }
}

// =============================================================================
// HasApiResource Trait
// =============================================================================

/// Trait for types that have a known API group, version, and kind.
///
/// # Example
/// ```ignore
/// impl HasApiResource for Deployment {
///     const API_VERSION: &'static str = "apps/v1";
///     const KIND: &'static str = "Deployment";
/// }
///
/// let ar = Deployment::api_resource();
/// ```
pub trait HasApiResource {
    /// Full API version (e.g., "apps/v1", "v1")
    const API_VERSION: &'static str;
    /// Resource kind (e.g., "Deployment")
    const KIND: &'static str;

    /// Build an ApiResource from the type's constants.
    fn api_resource() -> ApiResource {
        build_api_resource(Self::API_VERSION, Self::KIND)
    }
}

/// Build an ApiResource from an apiVersion string and kind.
///
/// The plural is derived from the kind; every kind the controller writes
/// pluralizes regularly.
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Split an apiVersion into group and version (`v1` has an empty group)
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Lowercase plural resource name for a kind
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

// =============================================================================
// Ownership
// =============================================================================

/// True if `refs` contains a controller reference pointing at `owner`.
///
/// UIDs are compared when both sides carry one; otherwise the reference must
/// match by apiVersion, kind and name.
pub fn is_controlled_by(refs: &[OwnerReference], owner: &OwnerReference) -> bool {
    refs.iter().any(|r| {
        if r.controller != Some(true) {
            return false;
        }
        if !r.uid.is_empty() && !owner.uid.is_empty() {
            return r.uid == owner.uid;
        }
        r.api_version == owner.api_version && r.kind == owner.kind && r.name == owner.name
    })
}

/// True if the annotations mark an object as derived from `application`
pub fn annotated_for(annotations: Option<&BTreeMap<String, String>>, application: &str) -> bool {
    annotations
        .and_then(|a| a.get(crate::APPLICATION_KEY))
        .is_some_and(|v| v == application)
}

// =============================================================================
// JSON comparison
// =============================================================================

/// True if merge-patching `desired` onto `live` would change nothing.
///
/// Objects recurse key by key and ignore keys only present in `live`.
/// Arrays are replaced wholesale by a merge patch, so they must match
/// element-wise with equal length. A `null` in `desired` means deletion and
/// only matches an absent key.
pub fn is_json_subset(desired: &Value, live: &Value) -> bool {
    match (desired, live) {
        (Value::Object(d), Value::Object(l)) => d.iter().all(|(k, dv)| match l.get(k) {
            Some(lv) => !dv.is_null() && is_json_subset(dv, lv),
            None => dv.is_null(),
        }),
        (Value::Array(d), Value::Array(l)) => {
            d.len() == l.len() && d.iter().zip(l).all(|(dv, lv)| is_json_subset(dv, lv))
        }
        (Value::Number(d), Value::Number(l)) => d.as_f64() == l.as_f64(),
        _ => desired == live,
    }
}

/// Read a nested field by path
pub fn json_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

/// Overwrite a nested field by path, creating intermediate objects
pub fn set_json_path(value: &mut Value, path: &[&str], new: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cursor = value;
    for key in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Default::default());
        }
        cursor = match cursor.as_object_mut() {
            Some(map) => map.entry(key.to_string()).or_insert(Value::Null),
            None => return,
        };
    }
    if !cursor.is_object() {
        *cursor = Value::Object(Default::default());
    }
    if let Some(map) = cursor.as_object_mut() {
        map.insert(last.to_string(), new);
    }
}
