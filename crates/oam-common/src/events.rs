//! Kubernetes Event recording for the OAM controller.
//!
//! Every create, patch or failed write of a derived object is reported as an
//! Event on the owning ApplicationConfiguration, visible via
//! `kubectl describe appconfig`.
//!
//! Events are **fire-and-forget**: failures are logged as warnings and never
//! propagate errors.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Trait for publishing Kubernetes Events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a Kubernetes Event on the given resource.
    ///
    /// # Arguments
    ///
    /// * `resource_ref` - The Kubernetes object this event is about
    /// * `type_` - Normal or Warning
    /// * `reason` - Machine-readable reason string (e.g. "Created")
    /// * `action` - What action was taken (e.g. "Reconcile")
    /// * `note` - Optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Production implementation wrapping `kube::runtime::events::Recorder`.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a new publisher reporting as `controller_name`.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = kube::runtime::events::Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                reason,
                action,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// No-op implementation for tests.
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Well-known event reason strings.
pub mod reasons {
    /// A derived object was created
    pub const CREATED: &str = "Created";
    /// A derived object was merge-patched
    pub const PATCHED: &str = "Patched";
    /// A read or write of a derived object failed
    pub const FAILED: &str = "Failed";
    /// A reconciliation pass changed the cluster and completed
    pub const SYNCED: &str = "Synced";
    /// A reconciliation pass aborted or a component could not be converted
    pub const SYNC_FAILED: &str = "Sync Failed";
}

/// Well-known event action strings.
pub mod actions {
    /// Standard reconciliation loop
    pub const RECONCILE: &str = "Reconcile";
    /// Creating a derived object
    pub const CREATE: &str = "Create";
    /// Patching a derived object
    pub const PATCH: &str = "Patch";
    /// Converting a component into derived objects
    pub const CONVERT: &str = "Convert";
}

/// Event note for a successful create, e.g. `Resource deployments/web created successfully`
pub fn created_note(plural: &str, name: &str) -> String {
    format!("Resource {plural}/{name} created successfully")
}

/// Event note for a successful patch
pub fn patched_note(plural: &str, name: &str) -> String {
    format!("Resource {plural}/{name} patched successfully")
}

/// Event note summarising a pass that wrote something
pub const SYNC_SUCCESSFULLY: &str = "Sync Successfully";
