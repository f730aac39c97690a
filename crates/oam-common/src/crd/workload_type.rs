//! Workload types a ComponentSchematic can declare

use std::fmt;

/// Group version of the core OAM workload types
pub const CORE_GROUP_VERSION: &str = "core.oam.dev/v1alpha1";

/// Group version reported for MysqlCluster components
pub const MYSQL_GROUP_VERSION: &str = "mysql.middleware.harmonycloud.cn/v1alpha1";

/// Prefix used by the MysqlCluster workload type string
const MYSQL_TYPE_PREFIX: &str = "harmonycloud.cn/v1alpha1";

/// Category of runtime workload a component represents
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkloadType {
    /// Replicated, network-exposed service
    Server,
    /// Single-instance network-exposed service
    SingletonServer,
    /// Replicated background worker
    Worker,
    /// Single-instance background worker
    SingletonWorker,
    /// Parallel run-to-completion task
    Task,
    /// Single run-to-completion task
    SingletonTask,
    /// MySQL cluster managed by the mysql-operator
    MysqlCluster,
}

impl WorkloadType {
    /// Every supported workload type
    pub const ALL: [WorkloadType; 7] = [
        Self::Server,
        Self::SingletonServer,
        Self::Worker,
        Self::SingletonWorker,
        Self::Task,
        Self::SingletonTask,
        Self::MysqlCluster,
    ];

    /// Parse a workload type string.
    ///
    /// Accepts the fully qualified form (`core.oam.dev/v1alpha1.Server`) and
    /// the bare kind (`Server`).
    pub fn parse(s: &str) -> Option<Self> {
        let (prefix, kind) = match s.rsplit_once('.') {
            Some((prefix, kind)) if prefix.contains('/') => (Some(prefix), kind),
            _ => (None, s),
        };
        let ty = Self::ALL.into_iter().find(|t| t.kind() == kind)?;
        match prefix {
            None => Some(ty),
            Some(p) if p == ty.type_prefix() => Some(ty),
            Some(_) => None,
        }
    }

    /// Canonical kind name reported in module status
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Server => "Server",
            Self::SingletonServer => "SingletonServer",
            Self::Worker => "Worker",
            Self::SingletonWorker => "SingletonWorker",
            Self::Task => "Task",
            Self::SingletonTask => "SingletonTask",
            Self::MysqlCluster => "MysqlCluster",
        }
    }

    /// Group version reported in module status
    pub fn group_version(&self) -> &'static str {
        match self {
            Self::MysqlCluster => MYSQL_GROUP_VERSION,
            _ => CORE_GROUP_VERSION,
        }
    }

    fn type_prefix(&self) -> &'static str {
        match self {
            Self::MysqlCluster => MYSQL_TYPE_PREFIX,
            _ => CORE_GROUP_VERSION,
        }
    }

    /// Singletons always run exactly one replica
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            Self::SingletonServer | Self::SingletonWorker | Self::SingletonTask
        )
    }

    /// Servers get a Service and may get an Ingress
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server | Self::SingletonServer)
    }

    /// Tasks run as Jobs
    pub fn is_task(&self) -> bool {
        matches!(self, Self::Task | Self::SingletonTask)
    }

    /// Autoscalers are only attached to replicated workloads
    pub fn supports_autoscaling(&self) -> bool {
        matches!(self, Self::Server | Self::Worker | Self::Task)
    }
}

impl fmt::Display for WorkloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_prefix(), self.kind())
    }
}
