//! Controller configuration
//!
//! Parsed from the command line with environment fallbacks, then passed to
//! every reconcile through [`Context`](crate::Context).

use std::time::Duration;

use clap::Args;

/// Default periodic resync of an ApplicationConfiguration
pub const DEFAULT_REQUEUE_SECS: u64 = 300;

/// Default attempts for a conditional status write
pub const DEFAULT_STATUS_RETRIES: u32 = 5;

/// Runtime settings of the controller
#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch (all namespaces if unset)
    #[arg(long, env = "OAM_NAMESPACE")]
    pub namespace: Option<String>,

    /// Seconds between periodic resyncs of a healthy application
    #[arg(long, env = "OAM_REQUEUE_SECS", default_value_t = DEFAULT_REQUEUE_SECS)]
    pub requeue_secs: u64,

    /// Attempts for a status write that keeps hitting conflicts
    #[arg(long, env = "OAM_STATUS_RETRIES", default_value_t = DEFAULT_STATUS_RETRIES)]
    pub status_retries: u32,

    /// Install the controller's CRDs at startup
    #[arg(
        long,
        env = "OAM_INSTALL_CRDS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub install_crds: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            requeue_secs: DEFAULT_REQUEUE_SECS,
            status_retries: DEFAULT_STATUS_RETRIES,
            install_crds: true,
        }
    }
}

impl ControllerConfig {
    /// Periodic resync interval
    pub fn requeue(&self) -> Duration {
        Duration::from_secs(self.requeue_secs)
    }

    /// Status write attempts, never less than one
    pub fn status_attempts(&self) -> u32 {
        self.status_retries.max(1)
    }
}
