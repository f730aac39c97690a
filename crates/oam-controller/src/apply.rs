//! Reconciliation engine: one create-or-patch routine for every derived kind
//!
//! For each desired object the live object is read, ownership is checked,
//! and the object is created, patched, or left alone. Outcomes are reported
//! as events on the application and collected as [`SyncRecord`]s, which the
//! caller folds into the application status.

use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::runtime::events::EventType;
use tracing::{debug, info, warn};

use oam_common::crd::{ApplicationConfigurationStatus, RecordKey, SyncState};
use oam_common::events::{actions, created_note, patched_note, reasons, EventPublisher};
use oam_common::kube_utils::{annotated_for, is_controlled_by};
use oam_common::Error;
use oam_workload::{DesiredObject, ManagedResource};

use crate::client::OamKubeClient;

/// What happened to one desired object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The object did not exist and was created
    Created,
    /// An owned object differed and was patched
    Patched,
    /// An owned object already matched
    Unchanged,
    /// A create-only object already exists and was left alone
    Retained,
    /// Reading or writing failed
    Failed(SyncState),
}

impl ApplyOutcome {
    /// True if the object was written
    pub fn is_write(&self) -> bool {
        matches!(self, ApplyOutcome::Created | ApplyOutcome::Patched)
    }
}

/// Sync result for one status record
#[derive(Clone, Debug, PartialEq)]
pub struct SyncRecord {
    /// Record identity
    pub key: RecordKey,
    /// Component instance
    pub component: String,
    /// `workload` or `trait`
    pub role: String,
    /// Write result
    pub sync: SyncState,
    /// Error text for failures
    pub message: Option<String>,
}

/// Fold sync results into a status
pub fn record_syncs(status: &mut ApplicationConfigurationStatus, records: &[SyncRecord]) {
    for r in records {
        status.record_sync(&r.key, &r.component, &r.role, r.sync, r.message.clone());
    }
}

/// Applies the derived objects of one application
pub struct Applier<'a> {
    client: &'a dyn OamKubeClient,
    events: &'a dyn EventPublisher,
    app_ref: &'a ObjectReference,
    owner: &'a OwnerReference,
    application: &'a str,
    records: Vec<SyncRecord>,
    writes: usize,
}

impl<'a> Applier<'a> {
    /// Create an applier writing on behalf of `owner`
    pub fn new(
        client: &'a dyn OamKubeClient,
        events: &'a dyn EventPublisher,
        app_ref: &'a ObjectReference,
        owner: &'a OwnerReference,
    ) -> Self {
        Self {
            client,
            events,
            app_ref,
            owner,
            application: &owner.name,
            records: Vec::new(),
            writes: 0,
        }
    }

    /// Apply a typed resource
    pub async fn apply<T: ManagedResource>(
        &mut self,
        component: &str,
        resource: &T,
        preserve_scale: bool,
    ) -> Result<ApplyOutcome, Error> {
        let desired = DesiredObject::from_resource(resource)?;
        Ok(self.apply_object(component, desired, preserve_scale).await)
    }

    /// Apply one serialized object.
    ///
    /// With `preserve_scale` the autoscaler-owned field is copied from the
    /// live object before comparing.
    pub async fn apply_object(
        &mut self,
        component: &str,
        mut desired: DesiredObject,
        preserve_scale: bool,
    ) -> ApplyOutcome {
        let ar = desired.api_resource.clone();
        let live = match self
            .client
            .get_object(&ar, &desired.namespace, &desired.name)
            .await
        {
            Ok(live) => live,
            Err(e) => return self.fail(component, &desired, SyncState::ReadFailed, actions::RECONCILE, &e).await,
        };

        let Some(live) = live else {
            return self.create(component, &desired).await;
        };

        let owner_refs = live.metadata.owner_references.as_deref().unwrap_or_default();
        let owned = is_controlled_by(owner_refs, self.owner);
        let adopted = desired.create_only
            && annotated_for(live.metadata.annotations.as_ref(), self.application);
        if !owned && !adopted {
            return self.create(component, &desired).await;
        }

        if desired.create_only {
            debug!(kind = desired.kind(), name = %desired.name, "create-only object exists, leaving it");
            self.record(component, &desired, SyncState::Synced, None);
            return ApplyOutcome::Retained;
        }

        let live = match serde_json::to_value(&live) {
            Ok(value) => value,
            Err(e) => {
                let e = Error::from(e);
                return self
                    .fail(component, &desired, SyncState::ReadFailed, actions::RECONCILE, &e)
                    .await;
            }
        };
        if preserve_scale {
            desired.preserve_scale(&live);
        }
        if desired.is_satisfied_by(&live) {
            self.record(component, &desired, SyncState::Synced, None);
            return ApplyOutcome::Unchanged;
        }

        let patch = desired.merge_patch(&live);
        match self
            .client
            .patch_object(&ar, &desired.namespace, &desired.name, &patch)
            .await
        {
            Ok(()) => {
                info!(kind = desired.kind(), name = %desired.name, "patched");
                self.writes += 1;
                self.events
                    .publish(
                        self.app_ref,
                        EventType::Normal,
                        reasons::PATCHED,
                        actions::PATCH,
                        Some(patched_note(desired.plural(), &desired.name)),
                    )
                    .await;
                self.record(component, &desired, SyncState::Synced, None);
                ApplyOutcome::Patched
            }
            Err(e) => self.fail(component, &desired, SyncState::PatchFailed, actions::PATCH, &e).await,
        }
    }

    async fn create(&mut self, component: &str, desired: &DesiredObject) -> ApplyOutcome {
        match self
            .client
            .create_object(&desired.api_resource, &desired.namespace, &desired.body)
            .await
        {
            Ok(()) => {
                info!(kind = desired.kind(), name = %desired.name, "created");
                self.writes += 1;
                self.events
                    .publish(
                        self.app_ref,
                        EventType::Normal,
                        reasons::CREATED,
                        actions::CREATE,
                        Some(created_note(desired.plural(), &desired.name)),
                    )
                    .await;
                self.record(component, desired, SyncState::Synced, None);
                ApplyOutcome::Created
            }
            Err(e) if e.is_api_conflict() => {
                let e = Error::foreign_object(desired.kind(), &desired.name);
                self.fail(component, desired, SyncState::CreateFailed, actions::CREATE, &e).await
            }
            Err(e) => self.fail(component, desired, SyncState::CreateFailed, actions::CREATE, &e).await,
        }
    }

    async fn fail(
        &mut self,
        component: &str,
        desired: &DesiredObject,
        sync: SyncState,
        action: &str,
        error: &Error,
    ) -> ApplyOutcome {
        warn!(kind = desired.kind(), name = %desired.name, %sync, error = %error, "write failed");
        self.events
            .publish(
                self.app_ref,
                EventType::Warning,
                reasons::FAILED,
                action,
                Some(error.to_string()),
            )
            .await;
        self.record(component, desired, sync, Some(error.to_string()));
        ApplyOutcome::Failed(sync)
    }

    fn record(&mut self, component: &str, desired: &DesiredObject, sync: SyncState, message: Option<String>) {
        self.records.push(SyncRecord {
            key: desired.record_key(),
            component: component.to_string(),
            role: desired.role.clone(),
            sync,
            message,
        });
    }

    /// Objects created or patched so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Sync results and the number of writes
    pub fn finish(self) -> (Vec<SyncRecord>, usize) {
        (self.records, self.writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockOamKubeClient;
    use kube::api::DynamicObject;
    use kube::error::ErrorResponse;
    use oam_common::events::NoopEventPublisher;
    use oam_workload::k8s::{ConfigMap, Deployment, LabelSelector, PersistentVolumeClaim, PodTemplateSpec};
    use oam_common::kube_utils::ObjectMeta;
    use serde_json::{json, Value};

    fn owner() -> OwnerReference {
        OwnerReference {
            api_version: "core.oam.dev/v1alpha1".to_string(),
            kind: "ApplicationConfiguration".to_string(),
            name: "shop".to_string(),
            uid: "uid-shop".to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    fn api_error(code: u16) -> Error {
        Error::from(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "Test".to_string(),
            code,
        }))
    }

    fn meta(name: &str, owner: &OwnerReference) -> ObjectMeta {
        ObjectMeta::new(name, "retail")
            .with_label("role", "workload")
            .with_owner(Some(owner))
    }

    fn deployment(owner: &OwnerReference, replicas: i32) -> DesiredObject {
        let deploy = Deployment::new(
            meta("shop-frontend", owner),
            replicas,
            LabelSelector::default(),
            PodTemplateSpec::default(),
        );
        DesiredObject::from_resource(&deploy).unwrap()
    }

    fn live_from(body: &Value) -> DynamicObject {
        serde_json::from_value(body.clone()).unwrap()
    }

    async fn run(mock: MockOamKubeClient, desired: DesiredObject, preserve_scale: bool) -> (ApplyOutcome, Vec<SyncRecord>) {
        let owner = owner();
        let app_ref = ObjectReference::default();
        let mut applier = Applier::new(&mock, &NoopEventPublisher, &app_ref, &owner);
        let outcome = applier.apply_object("shop-frontend", desired, preserve_scale).await;
        (outcome, applier.finish().0)
    }

    // =========================================================================
    // Create and patch
    // =========================================================================

    /// Story: an absent object is created and recorded as synced
    #[tokio::test]
    async fn story_absent_object_is_created() {
        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(|_, _, _| Ok(None));
        mock.expect_create_object().times(1).returning(|_, _, _| Ok(()));

        let (outcome, records) = run(mock, deployment(&owner(), 3), false).await;
        assert_eq!(outcome, ApplyOutcome::Created);
        assert_eq!(records[0].sync, SyncState::Synced);
        assert_eq!(records[0].role, "workload");
        assert_eq!(records[0].key.namespaced_name, "retail/shop-frontend");
    }

    /// Story: an owned object that already matches is not written
    #[tokio::test]
    async fn story_matching_object_is_untouched() {
        let desired = deployment(&owner(), 3);
        let live = live_from(&desired.body);
        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(move |_, _, _| Ok(Some(live.clone())));
        mock.expect_create_object().never();
        mock.expect_patch_object().never();

        let (outcome, _) = run(mock, desired, false).await;
        assert_eq!(outcome, ApplyOutcome::Unchanged);
    }

    /// Story: with an autoscaler bound, the live replica count wins
    #[tokio::test]
    async fn story_autoscaled_replicas_are_preserved() {
        let owner = owner();
        let mut live_body = deployment(&owner, 7).body;
        live_body["status"] = json!({"readyReplicas": 7});
        let live = live_from(&live_body);

        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(move |_, _, _| Ok(Some(live.clone())));
        mock.expect_patch_object().never();

        let (outcome, _) = run(mock, deployment(&owner, 3), true).await;
        assert_eq!(outcome, ApplyOutcome::Unchanged);
    }

    /// Story: without an autoscaler, drift is patched back
    #[tokio::test]
    async fn story_drift_is_patched() {
        let owner = owner();
        let live = live_from(&deployment(&owner, 7).body);

        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(move |_, _, _| Ok(Some(live.clone())));
        mock.expect_patch_object()
            .withf(|_, _, name, patch| name == "shop-frontend" && patch["spec"]["replicas"] == 3)
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let (outcome, _) = run(mock, deployment(&owner, 3), false).await;
        assert_eq!(outcome, ApplyOutcome::Patched);
    }

    /// Story: keys removed from a ConfigMap are deleted by the patch
    #[tokio::test]
    async fn story_stale_config_keys_are_removed() {
        let owner = owner();
        let cm = ConfigMap::new(meta("shop-frontend-web", &owner)).with_data("a.conf", "x");
        let desired = DesiredObject::from_resource(&cm).unwrap();
        let mut live_body = desired.body.clone();
        live_body["data"]["old.conf"] = json!("y");
        let live = live_from(&live_body);

        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(move |_, _, _| Ok(Some(live.clone())));
        mock.expect_patch_object()
            .withf(|_, _, _, patch| patch["data"]["old.conf"].is_null() && patch["data"]["a.conf"] == "x")
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let (outcome, _) = run(mock, desired, false).await;
        assert_eq!(outcome, ApplyOutcome::Patched);
    }

    // =========================================================================
    // Ownership and failures
    // =========================================================================

    /// Story: a same-named object owned by someone else is refused
    #[tokio::test]
    async fn story_foreign_object_is_refused() {
        let stranger = OwnerReference {
            name: "other".to_string(),
            uid: "uid-other".to_string(),
            ..owner()
        };
        let live = live_from(&deployment(&stranger, 3).body);

        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(move |_, _, _| Ok(Some(live.clone())));
        mock.expect_patch_object().never();
        mock.expect_create_object().returning(|_, _, _| Err(api_error(409)));

        let (outcome, records) = run(mock, deployment(&owner(), 3), false).await;
        assert_eq!(outcome, ApplyOutcome::Failed(SyncState::CreateFailed));
        assert!(records[0].message.as_deref().unwrap().contains("not managed by this application"));
    }

    /// Story: an existing annotated claim is adopted, never patched
    #[tokio::test]
    async fn story_retained_claim_is_left_alone() {
        let claim = PersistentVolumeClaim::new(
            ObjectMeta::new("data", "retail").with_annotation("application", "shop"),
            "ReadWriteOnce",
            "10Gi".to_string(),
            None,
        );
        let desired = DesiredObject::from_resource(&claim).unwrap();
        let mut live_body = desired.body.clone();
        live_body["spec"]["resources"]["requests"]["storage"] = json!("20Gi");
        let live = live_from(&live_body);

        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(move |_, _, _| Ok(Some(live.clone())));
        mock.expect_patch_object().never();
        mock.expect_create_object().never();

        let (outcome, records) = run(mock, desired, false).await;
        assert_eq!(outcome, ApplyOutcome::Retained);
        assert_eq!(records[0].sync, SyncState::Synced);
    }

    /// Story: read and patch failures are recorded, not raised
    #[tokio::test]
    async fn story_failures_are_recorded() {
        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(|_, _, _| Err(api_error(500)));
        let (outcome, records) = run(mock, deployment(&owner(), 3), false).await;
        assert_eq!(outcome, ApplyOutcome::Failed(SyncState::ReadFailed));
        assert_eq!(records[0].sync, SyncState::ReadFailed);

        let owner = owner();
        let live = live_from(&deployment(&owner, 1).body);
        let mut mock = MockOamKubeClient::new();
        mock.expect_get_object().returning(move |_, _, _| Ok(Some(live.clone())));
        mock.expect_patch_object().returning(|_, _, _, _| Err(api_error(422)));
        let (outcome, records) = run(mock, deployment(&owner, 3), false).await;
        assert_eq!(outcome, ApplyOutcome::Failed(SyncState::PatchFailed));
        assert!(records[0].message.is_some());
    }
}
