//! ApplicationConfiguration controller
//!
//! One reconcile pass compiles every component instance, applies the derived
//! objects in order, and writes the aggregated status back with a
//! conditional update.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use oam_common::crd::{
    ApplicationConfiguration, ApplicationConfigurationStatus, ApplicationPhase, WorkloadType,
};
use oam_common::events::{actions, reasons, EventPublisher, KubeEventPublisher, SYNC_SUCCESSFULLY};
#[cfg(test)]
use oam_common::events::NoopEventPublisher;
use oam_common::{Error, CONTROLLER_NAME};
use oam_workload::WorkloadCompiler;

use crate::apply::{record_syncs, Applier, SyncRecord};
use crate::client::{KubeClient, OamKubeClient};
use crate::config::ControllerConfig;
use crate::status;

const APPLICATION_KIND: &str = "ApplicationConfiguration";
const RETRY_DELAY: Duration = Duration::from_secs(30);

/// Shared controller state
pub struct Context {
    /// API access
    pub client: Arc<dyn OamKubeClient>,
    /// Event sink for the reconciled applications
    pub events: Arc<dyn EventPublisher>,
    /// Runtime settings
    pub config: ControllerConfig,
}

impl Context {
    /// Create a context from explicit dependencies
    pub fn new(
        client: Arc<dyn OamKubeClient>,
        events: Arc<dyn EventPublisher>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            client,
            events,
            config,
        }
    }

    /// Create a context backed by a real cluster
    pub fn from_client(client: Client, config: ControllerConfig) -> Self {
        let events = Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME));
        Self::new(Arc::new(KubeClient::new(client)), events, config)
    }

    /// Create a context for testing with a mock client
    #[cfg(test)]
    pub fn for_testing(client: Arc<dyn OamKubeClient>) -> Self {
        Self::new(client, Arc::new(NoopEventPublisher), ControllerConfig::default())
    }
}

/// Reconcile an ApplicationConfiguration
#[instrument(skip(app, ctx), fields(application = %app.name_any()))]
pub async fn reconcile(
    app: Arc<ApplicationConfiguration>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    let name = app.name_any();
    let namespace = app
        .namespace()
        .ok_or_else(|| Error::validation("ApplicationConfiguration has no namespace"))?;
    let owner = app
        .controller_owner_ref(&())
        .ok_or_else(|| Error::internal("ApplicationConfiguration has no uid"))?;
    let app_ref = app.object_ref(&());
    info!("reconciling application");

    let mut applier = Applier::new(ctx.client.as_ref(), ctx.events.as_ref(), &app_ref, &owner);
    let mut components: Vec<(String, WorkloadType)> = Vec::new();

    for component in &app.spec.components {
        let instance = component.instance();
        let schematic = match ctx
            .client
            .get_schematic(&namespace, &component.component_name)
            .await?
        {
            Some(schematic) => schematic,
            None => {
                let e = Error::not_found("ComponentSchematic", &namespace, &component.component_name);
                ctx.events
                    .publish(
                        &app_ref,
                        EventType::Warning,
                        reasons::SYNC_FAILED,
                        actions::RECONCILE,
                        Some(e.to_string()),
                    )
                    .await;
                return Err(e);
            }
        };

        let compiled = match WorkloadCompiler::new(&name, &namespace, &owner, component, &schematic.spec)
            .with_variables(&app.spec.variables)
            .compile()
        {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(instance = %instance, error = %e, "skipping component");
                ctx.events
                    .publish(
                        &app_ref,
                        EventType::Warning,
                        reasons::FAILED,
                        actions::CONVERT,
                        Some(e.to_string()),
                    )
                    .await;
                continue;
            }
        };

        for object in compiled.desired_objects()? {
            applier
                .apply_object(instance, object, compiled.has_autoscaler)
                .await;
        }
        components.push((instance.to_string(), compiled.workload_type));
    }

    let (records, writes) = applier.finish();
    debug!(records = records.len(), writes, "applied derived objects");

    let generation = app.metadata.generation;
    let mut aggregation: Result<(), Error> = Ok(());
    update_status(&ctx, &namespace, &name, (*app).clone(), |status| {
        aggregation = apply_pass(status, &records, &namespace, &components, generation);
    })
    .await?;

    match aggregation {
        Ok(()) => {
            if writes > 0 {
                ctx.events
                    .publish(
                        &app_ref,
                        EventType::Normal,
                        reasons::SYNCED,
                        actions::RECONCILE,
                        Some(SYNC_SUCCESSFULLY.to_string()),
                    )
                    .await;
            }
            Ok(Action::requeue(ctx.config.requeue()))
        }
        Err(e) => {
            ctx.events
                .publish(
                    &app_ref,
                    EventType::Warning,
                    reasons::SYNC_FAILED,
                    actions::RECONCILE,
                    Some(e.to_string()),
                )
                .await;
            Err(e)
        }
    }
}

/// Fold one pass into a status: records, modules, phase
fn apply_pass(
    status: &mut ApplicationConfigurationStatus,
    records: &[SyncRecord],
    namespace: &str,
    components: &[(String, WorkloadType)],
    generation: Option<i64>,
) -> Result<(), Error> {
    record_syncs(status, records);
    status.observed_generation = generation;
    match status::aggregate(status, namespace, components) {
        Ok(modules) => {
            status.modules = modules;
            status.phase = ApplicationPhase::Synced;
            status.message = None;
            Ok(())
        }
        Err(e) => {
            status.phase = ApplicationPhase::Failed;
            status.message = Some(e.to_string());
            Err(e)
        }
    }
}

/// Write an application's status with a conditional update.
///
/// `mutate` is applied to the status read with `app`; on a 409 the
/// application is re-read and `mutate` applied again, up to the configured
/// number of attempts. Returns false when the status was already current.
pub async fn update_status<F>(
    ctx: &Context,
    namespace: &str,
    name: &str,
    mut app: ApplicationConfiguration,
    mut mutate: F,
) -> Result<bool, Error>
where
    F: FnMut(&mut ApplicationConfigurationStatus),
{
    let attempts = ctx.config.status_attempts();
    for attempt in 1..=attempts {
        let mut status = app.status.clone().unwrap_or_default();
        mutate(&mut status);
        if app.status.as_ref() == Some(&status) {
            debug!("status unchanged");
            return Ok(false);
        }

        match ctx
            .client
            .patch_application_status(namespace, name, app.resource_version(), &status)
            .await
        {
            Ok(()) => return Ok(true),
            Err(e) if e.is_api_conflict() && attempt < attempts => {
                debug!(attempt, "status write conflicted, re-reading application");
                app = ctx
                    .client
                    .get_application(namespace, name)
                    .await?
                    .ok_or_else(|| Error::not_found(APPLICATION_KIND, namespace, name))?;
            }
            Err(e) if e.is_api_conflict() => break,
            Err(e) => return Err(e),
        }
    }
    Err(Error::update_conflict(APPLICATION_KIND, name, attempts))
}

/// Error policy for the application controller
///
/// Retryable errors requeue after 30 seconds; the rest wait for a spec change.
pub fn error_policy(app: Arc<ApplicationConfiguration>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        application = %app.name_any(),
        retryable = error.is_retryable(),
        "reconciliation failed"
    );

    if error.is_retryable() {
        Action::requeue(RETRY_DELAY)
    } else {
        Action::await_change()
    }
}
