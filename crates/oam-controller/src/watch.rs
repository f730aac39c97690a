//! Child watchers
//!
//! One watcher per derived kind, restricted to objects carrying the
//! `application` label. Every applied object is observed and the observation
//! upserted onto the owning application's status, after which module health
//! is recomputed.

use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use kube::api::{Api, DynamicObject};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, info, warn};

use oam_common::crd::RecordKey;
use oam_common::kube_utils::{annotated_for, is_controlled_by};
use oam_common::{Error, APPLICATION_KEY, DERIVED_LABEL_SELECTOR, INSTANCE_KEY, ROLE_KEY};

use crate::controller::{update_status, Context};
use crate::observe::ChildKind;
use crate::status;

/// Watch every derived kind until the streams end
pub async fn run_child_watchers(client: Client, ctx: Arc<Context>) {
    let config = watcher::Config::default().labels(DERIVED_LABEL_SELECTOR);
    let streams: Vec<BoxStream<'static, (ChildKind, Result<DynamicObject, watcher::Error>)>> =
        ChildKind::ALL
            .into_iter()
            .map(|kind| {
                let ar = kind.api_resource();
                let api: Api<DynamicObject> = match &ctx.config.namespace {
                    Some(ns) => Api::namespaced_with(client.clone(), ns, &ar),
                    None => Api::all_with(client.clone(), &ar),
                };
                watcher(api, config.clone())
                    .default_backoff()
                    .applied_objects()
                    .map(move |event| (kind, event))
                    .boxed()
            })
            .collect();

    info!(kinds = ChildKind::ALL.len(), "child watchers started");
    let mut events = stream::select_all(streams);
    while let Some((kind, event)) = events.next().await {
        match event {
            Ok(obj) => {
                if let Err(e) = observe_child(&ctx, kind, &obj).await {
                    warn!(?kind, object = %obj.name_any(), error = %e, "failed to record observation");
                }
            }
            Err(e) => warn!(?kind, error = %e, "watcher error, will retry"),
        }
    }
}

/// Record the observed state of one derived object.
///
/// Returns whether the owning application's status was written. Objects
/// whose application is gone, or that the application does not own, are
/// ignored.
pub async fn observe_child(ctx: &Context, kind: ChildKind, obj: &DynamicObject) -> Result<bool, Error> {
    let labels = obj.labels();
    let (Some(application), Some(namespace)) = (labels.get(APPLICATION_KEY), obj.namespace()) else {
        return Ok(false);
    };
    let name = obj.name_any();
    let instance = labels.get(INSTANCE_KEY).cloned().unwrap_or_default();
    let role = labels.get(ROLE_KEY).cloned().unwrap_or_default();

    let observed = kind.observe(obj)?;

    let Some(app) = ctx.client.get_application(&namespace, application).await? else {
        debug!(%application, object = %name, "application gone, ignoring child");
        return Ok(false);
    };
    let owned = app
        .controller_owner_ref(&())
        .is_some_and(|owner| is_controlled_by(obj.owner_references(), &owner));
    if !owned && !annotated_for(obj.metadata.annotations.as_ref(), application) {
        debug!(%application, object = %name, "child not derived from application");
        return Ok(false);
    }

    let ar = kind.api_resource();
    let group_version = ar.api_version.clone();
    let key = RecordKey::new(ar.kind, &namespace, &name, group_version);

    let mut refreshed: Result<(), Error> = Ok(());
    let written = update_status(ctx, &namespace, application, app, |status| {
        status.record_observation(&key, &instance, &role, observed.clone());
        refreshed = status::refresh_modules(status);
    })
    .await?;
    refreshed?;

    if written {
        debug!(record = %key, "observation recorded");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockOamKubeClient;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
    use kube::api::TypeMeta;
    use oam_common::crd::{
        ApplicationConfiguration, ApplicationConfigurationSpec, ApplicationConfigurationStatus,
        Health, ModuleStatus, ObservedState,
    };
    use serde_json::json;
    use std::collections::BTreeMap;

    fn app() -> ApplicationConfiguration {
        ApplicationConfiguration {
            metadata: ObjectMeta {
                name: Some("shop".to_string()),
                namespace: Some("retail".to_string()),
                uid: Some("uid-shop".to_string()),
                resource_version: Some("7".to_string()),
                ..Default::default()
            },
            spec: ApplicationConfigurationSpec::default(),
            status: Some(ApplicationConfigurationStatus {
                modules: vec![ModuleStatus {
                    namespaced_name: "retail/web".to_string(),
                    kind: "Server".to_string(),
                    group_version: "core.oam.dev/v1alpha1".to_string(),
                    status: Health::Unhealthy,
                }],
                ..Default::default()
            }),
        }
    }

    fn owner_ref() -> OwnerReference {
        OwnerReference {
            api_version: "core.oam.dev/v1alpha1".to_string(),
            kind: "ApplicationConfiguration".to_string(),
            name: "shop".to_string(),
            uid: "uid-shop".to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    fn deployment(owner: Option<OwnerReference>, ready: i32) -> DynamicObject {
        let labels = BTreeMap::from([
            (APPLICATION_KEY.to_string(), "shop".to_string()),
            (INSTANCE_KEY.to_string(), "web".to_string()),
            (ROLE_KEY.to_string(), "workload".to_string()),
        ]);
        DynamicObject {
            types: Some(TypeMeta {
                api_version: "apps/v1".to_string(),
                kind: "Deployment".to_string(),
            }),
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("retail".to_string()),
                labels: Some(labels),
                owner_references: owner.map(|o| vec![o]),
                ..Default::default()
            },
            data: json!({
                "spec": {"replicas": 2, "selector": {}, "template": {}},
                "status": {"replicas": 2, "readyReplicas": ready, "updatedReplicas": 2, "availableReplicas": ready}
            }),
        }
    }

    // =========================================================================
    // Observation Story Tests
    // =========================================================================

    /// Story: a ready Deployment turns its module healthy
    #[tokio::test]
    async fn story_ready_deployment_marks_module_healthy() {
        let mut mock = MockOamKubeClient::new();
        mock.expect_get_application().returning(|_, _| Ok(Some(app())));
        mock.expect_patch_application_status()
            .withf(|ns, name, rv, status| {
                let record = &status.resources[0];
                ns == "retail"
                    && name == "shop"
                    && rv.as_deref() == Some("7")
                    && record.kind == "Deployment"
                    && record.component == "web"
                    && matches!(record.observed, Some(ObservedState::Deployment(_)))
                    && status.modules[0].status == Health::Healthy
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let ctx = Context::for_testing(Arc::new(mock));

        let written = observe_child(&ctx, ChildKind::Deployment, &deployment(Some(owner_ref()), 2))
            .await
            .unwrap();
        assert!(written);
    }

    /// Story: a labelled object the application does not own is ignored
    #[tokio::test]
    async fn story_foreign_child_is_ignored() {
        let mut mock = MockOamKubeClient::new();
        mock.expect_get_application().returning(|_, _| Ok(Some(app())));
        mock.expect_patch_application_status().never();
        let ctx = Context::for_testing(Arc::new(mock));

        let written = observe_child(&ctx, ChildKind::Deployment, &deployment(None, 2))
            .await
            .unwrap();
        assert!(!written);
    }

    /// Story: a child whose application was deleted is ignored
    #[tokio::test]
    async fn story_orphaned_child_is_ignored() {
        let mut mock = MockOamKubeClient::new();
        mock.expect_get_application().returning(|_, _| Ok(None));
        mock.expect_patch_application_status().never();
        let ctx = Context::for_testing(Arc::new(mock));

        let written = observe_child(&ctx, ChildKind::Deployment, &deployment(Some(owner_ref()), 0))
            .await
            .unwrap();
        assert!(!written);
    }

    /// Story: an object routed to the wrong handler is a type mismatch
    #[tokio::test]
    async fn story_wrong_handler_is_type_mismatch() {
        let mut mock = MockOamKubeClient::new();
        mock.expect_get_application().never();
        let ctx = Context::for_testing(Arc::new(mock));

        let err = observe_child(&ctx, ChildKind::Job, &deployment(Some(owner_ref()), 2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
