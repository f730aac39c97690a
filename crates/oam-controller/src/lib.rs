//! Kubernetes controller reconciling OAM ApplicationConfigurations
//!
//! The controller compiles every component instance with `oam-workload`,
//! applies the derived objects and keeps the application's status in step
//! with what it wrote and what the child watchers observe.

#![deny(missing_docs)]

/// Reconcile loop for derived objects: GET, compare, create or patch
pub mod apply;
/// Kubernetes API seam
pub mod client;
/// Runtime configuration
pub mod config;
/// ApplicationConfiguration reconciler and status writes
pub mod controller;
/// Live object to observation parsing
pub mod observe;
/// Health evaluation and module aggregation
pub mod status;
/// Watchers over derived kinds
pub mod watch;

pub use client::{KubeClient, OamKubeClient};
pub use config::ControllerConfig;
pub use controller::{error_policy, reconcile, Context};
pub use oam_common::Error;
pub use observe::ChildKind;
pub use watch::run_child_watchers;
