//! Workload compilation errors

/// Errors raised while converting a component instance into derived objects
#[derive(Debug, thiserror::Error)]
pub enum CompilationError {
    /// The schematic names a workload type the controller cannot convert
    #[error("WorkloadType {workload_type} is undefined (component {component})")]
    UndefinedWorkloadType {
        /// Raw workload type string
        workload_type: String,
        /// Component instance
        component: String,
    },

    /// Trait properties do not decode into the trait's shape
    #[error("invalid properties for trait '{name}': {source}")]
    InvalidTrait {
        /// Trait name
        name: String,
        /// Decode failure
        source: serde_json::Error,
    },

    /// A workload setting is missing or malformed
    #[error("invalid workload setting '{setting}' of component {component}: {message}")]
    InvalidSetting {
        /// Component instance
        component: String,
        /// Setting name
        setting: String,
        /// What is wrong with it
        message: String,
    },

    /// A derived object could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CompilationError {
    /// Unknown workload type for a component instance
    pub fn undefined_workload_type(
        workload_type: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self::UndefinedWorkloadType {
            workload_type: workload_type.into(),
            component: component.into(),
        }
    }

    /// Missing or malformed workload setting
    pub fn invalid_setting(
        component: impl Into<String>,
        setting: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidSetting {
            component: component.into(),
            setting: setting.into(),
            message: message.into(),
        }
    }
}

impl From<CompilationError> for oam_common::Error {
    fn from(err: CompilationError) -> Self {
        match err {
            CompilationError::UndefinedWorkloadType {
                workload_type,
                component,
            } => oam_common::Error::undefined_workload_type(workload_type, component),
            CompilationError::InvalidTrait { name, source } => oam_common::Error::validation_for_field(
                oam_common::error::UNKNOWN_CONTEXT,
                format!("traits.{name}"),
                source.to_string(),
            ),
            CompilationError::InvalidSetting {
                component,
                setting,
                message,
            } => oam_common::Error::validation_for_field(component, setting, message),
            CompilationError::Serialization(e) => oam_common::Error::from(e),
        }
    }
}
