//! In-memory cluster for reconcile tests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use kube::error::ErrorResponse;
use kube::runtime::events::EventType;
use serde_json::Value;

use oam_common::crd::{ApplicationConfiguration, ApplicationConfigurationStatus, ComponentSchematic};
use oam_common::events::EventPublisher;
use oam_common::Error;
use oam_controller::OamKubeClient;

type ObjectKey = (String, String, String, String);

fn api_error(code: u16, reason: &str) -> Error {
    Error::from(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("fake cluster: {reason}"),
        reason: reason.to_string(),
        code,
    }))
}

fn key(ar: &ApiResource, namespace: &str, name: &str) -> ObjectKey {
    (
        ar.api_version.clone(),
        ar.kind.clone(),
        namespace.to_string(),
        name.to_string(),
    )
}

/// RFC 7386 merge patch
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Default::default());
    }
    if let Value::Object(target) = target {
        for (k, v) in fields {
            if v.is_null() {
                target.remove(k);
            } else {
                merge_patch(target.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
    }
}

/// Object store with write counters and injectable status conflicts
#[derive(Default)]
pub struct FakeCluster {
    objects: Mutex<BTreeMap<ObjectKey, Value>>,
    schematics: Mutex<BTreeMap<(String, String), ComponentSchematic>>,
    apps: Mutex<BTreeMap<(String, String), ApplicationConfiguration>>,
    pub creates: AtomicUsize,
    pub patches: AtomicUsize,
    pub status_writes: AtomicUsize,
    pending_conflicts: AtomicUsize,
}

impl FakeCluster {
    pub fn add_schematic(&self, namespace: &str, schematic: ComponentSchematic) {
        let name = schematic.metadata.name.clone().unwrap_or_default();
        self.schematics
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name), schematic);
    }

    pub fn add_application(&self, mut app: ApplicationConfiguration) {
        app.metadata.resource_version = Some("1".to_string());
        let id = (
            app.metadata.namespace.clone().unwrap_or_default(),
            app.metadata.name.clone().unwrap_or_default(),
        );
        self.apps.lock().unwrap().insert(id, app);
    }

    pub fn application(&self, namespace: &str, name: &str) -> ApplicationConfiguration {
        self.apps
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .expect("application present")
    }

    /// Edit a stored status directly, as another writer would
    pub fn edit_status(&self, namespace: &str, name: &str, edit: impl FnOnce(&mut ApplicationConfigurationStatus)) {
        let mut apps = self.apps.lock().unwrap();
        let app = apps
            .get_mut(&(namespace.to_string(), name.to_string()))
            .expect("application present");
        let mut status = app.status.clone().unwrap_or_default();
        edit(&mut status);
        app.status = Some(status);
        let next: u64 = app
            .metadata
            .resource_version
            .as_deref()
            .unwrap_or("0")
            .parse()
            .unwrap_or(0)
            + 1;
        app.metadata.resource_version = Some(next.to_string());
    }

    pub fn put_object(&self, ar: &ApiResource, namespace: &str, name: &str, body: Value) {
        self.objects
            .lock()
            .unwrap()
            .insert(key(ar, namespace, name), body);
    }

    pub fn object(&self, ar: &ApiResource, namespace: &str, name: &str) -> Option<Value> {
        self.objects
            .lock()
            .unwrap()
            .get(&key(ar, namespace, name))
            .cloned()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .map(|(_, kind, _, _)| kind.clone())
            .collect()
    }

    /// Fail the next `n` status writes with a 409
    pub fn inject_status_conflicts(&self, n: usize) {
        self.pending_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.creates.load(Ordering::SeqCst) + self.patches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OamKubeClient for FakeCluster {
    async fn get_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, Error> {
        match self.object(api_resource, namespace, name) {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    async fn create_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        body: &Value,
    ) -> Result<(), Error> {
        let name = body["metadata"]["name"].as_str().unwrap_or_default().to_string();
        let mut objects = self.objects.lock().unwrap();
        let id = key(api_resource, namespace, &name);
        if objects.contains_key(&id) {
            return Err(api_error(409, "AlreadyExists"));
        }
        // The API server drops nulls on create
        let mut stored = Value::Object(Default::default());
        merge_patch(&mut stored, body);
        objects.insert(id, stored);
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn patch_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<(), Error> {
        let mut objects = self.objects.lock().unwrap();
        let Some(live) = objects.get_mut(&key(api_resource, namespace, name)) else {
            return Err(api_error(404, "NotFound"));
        };
        merge_patch(live, patch);
        self.patches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_schematic(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ComponentSchematic>, Error> {
        Ok(self
            .schematics
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationConfiguration>, Error> {
        Ok(self
            .apps
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn patch_application_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<String>,
        status: &ApplicationConfigurationStatus,
    ) -> Result<(), Error> {
        let mut apps = self.apps.lock().unwrap();
        let Some(app) = apps.get_mut(&(namespace.to_string(), name.to_string())) else {
            return Err(api_error(404, "NotFound"));
        };

        let pending = self.pending_conflicts.load(Ordering::SeqCst);
        let current = app.metadata.resource_version.clone();
        let stale = resource_version.is_some() && resource_version != current;
        if pending > 0 || stale {
            self.pending_conflicts.store(pending.saturating_sub(1), Ordering::SeqCst);
            // Someone else wrote in between
            let next: u64 = current.as_deref().unwrap_or("0").parse().unwrap_or(0) + 1;
            app.metadata.resource_version = Some(next.to_string());
            return Err(api_error(409, "Conflict"));
        }

        let mut stored = serde_json::to_value(app.status.clone().unwrap_or_default())?;
        merge_patch(&mut stored, &status.merge_patch()?);
        app.status = Some(serde_json::from_value(stored)?);

        let next: u64 = current.as_deref().unwrap_or("0").parse().unwrap_or(0) + 1;
        app.metadata.resource_version = Some(next.to_string());
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Event sink that keeps `(reason, note)` pairs
#[derive(Default)]
pub struct RecordingEvents {
    pub events: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingEvents {
    pub fn reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(reason, _)| reason.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingEvents {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events
            .lock()
            .unwrap()
            .push((reason.to_string(), note));
    }
}
