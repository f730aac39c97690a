//! Common types for the OAM controller: CRDs, errors, events and Kubernetes helpers

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod kube_utils;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager used for every write made by the controller
pub const FIELD_MANAGER: &str = "hc-oam-controller";

/// Reporting component name shown on Kubernetes Events
pub const CONTROLLER_NAME: &str = "hc-oam-controller";

/// Label/annotation key naming the owning ApplicationConfiguration
pub const APPLICATION_KEY: &str = "application";

/// Label/annotation key naming the ComponentSchematic an object was derived from
pub const COMPONENT_KEY: &str = "component";

/// Label/annotation key naming the component instance an object belongs to
pub const INSTANCE_KEY: &str = "instance";

/// Label/annotation key describing what part an object plays (`workload` or `trait`)
pub const ROLE_KEY: &str = "role";

/// Pod label used by workload selectors and Services
pub const APP_LABEL_KEY: &str = "app";

/// Role value for workload objects and their ConfigMaps/claims
pub const ROLE_WORKLOAD: &str = "workload";

/// Role value for objects produced by traits (Service, Ingress, autoscalers)
pub const ROLE_TRAIT: &str = "trait";

/// Label selector matching every object derived by the controller
pub const DERIVED_LABEL_SELECTOR: &str = APPLICATION_KEY;
