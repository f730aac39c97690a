//! Workload compilation for OAM components
//!
//! Turns one component instance of an `ApplicationConfiguration` into the
//! Kubernetes objects that realize it: the base workload (Deployment, Job or
//! MysqlCluster), its Service, config ConfigMaps, and whatever the bound
//! traits add (PVCs, Ingress, autoscalers, pod mutations).
//!
//! # Usage
//!
//! ```rust,ignore
//! let compiled = WorkloadCompiler::new(app, namespace, &owner, &component, &schematic)
//!     .with_variables(&app_spec.variables)
//!     .compile()?;
//! for object in compiled.desired_objects()? {
//!     // GET, compare, create or patch
//! }
//! ```

mod compiled;
mod compiler;
pub mod error;
pub mod helpers;
pub mod k8s;
pub mod params;
pub mod resource;
pub mod traits;

mod pipeline;

pub use compiled::{CompiledComponent, ObjectContext, ScaleTarget, WorkloadObject};
pub use compiler::WorkloadCompiler;
pub use error::CompilationError;
pub use params::{resolve_parameters, ParameterMap, ResolvedParameters};
pub use resource::{DesiredObject, ManagedResource};
pub use traits::{Trait, TraitSet};

/// Result type for workload compilation
pub type Result<T> = std::result::Result<T, CompilationError>;
