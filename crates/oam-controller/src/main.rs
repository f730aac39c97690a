//! OAM controller - reconciles ApplicationConfigurations into Kubernetes objects

use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oam_common::crd::{ApplicationConfiguration, ComponentSchematic};
use oam_common::FIELD_MANAGER;
use oam_controller::{error_policy, reconcile, run_child_watchers, Context, ControllerConfig};

/// OAM controller - turns ApplicationConfigurations into workloads and traits
#[derive(Parser, Debug)]
#[command(name = "oam-controller", version, about, long_about = None)]
struct Cli {
    /// Print CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    config: ControllerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches ApplicationConfigurations and every derived kind labelled
    /// with `application`.
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if cli.crd {
        for crd in [ApplicationConfiguration::crd(), ComponentSchematic::crd()] {
            let yaml = serde_yaml::to_string(&crd)
                .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
            println!("---\n{yaml}");
        }
        return Ok(());
    }

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

/// Ensure the OAM CRDs are installed
///
/// Installed with server-side apply so the CRD versions always match the
/// controller version.
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    tracing::info!("Installing ApplicationConfiguration CRD...");
    crds.patch(
        "applicationconfigurations.core.oam.dev",
        &params,
        &Patch::Apply(&ApplicationConfiguration::crd()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to install ApplicationConfiguration CRD: {}", e))?;

    tracing::info!("Installing ComponentSchematic CRD...");
    crds.patch(
        "componentschematics.core.oam.dev",
        &params,
        &Patch::Apply(&ComponentSchematic::crd()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to install ComponentSchematic CRD: {}", e))?;

    tracing::info!("All OAM CRDs installed/updated");
    Ok(())
}

async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if config.install_crds {
        ensure_crds_installed(&client).await?;
    }

    let apps: Api<ApplicationConfiguration> = match &config.namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    tracing::info!(
        namespace = config.namespace.as_deref().unwrap_or("*"),
        requeue_secs = config.requeue_secs,
        "Starting ApplicationConfiguration controller"
    );

    let ctx = Arc::new(Context::from_client(client.clone(), config));

    let app_controller = Controller::new(apps, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx.clone())
        .for_each(log_reconcile_result("ApplicationConfiguration"));

    // The app controller owns shutdown; watchers stop with it
    tokio::select! {
        _ = app_controller => {}
        _ = run_child_watchers(client, ctx) => {
            tracing::warn!("Child watchers ended unexpectedly");
        }
    }

    tracing::info!("Controller shut down");
    Ok(())
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
