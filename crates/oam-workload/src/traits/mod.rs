//! Trait decoding and application
//!
//! A `TraitBinding` carries free-form JSON properties. Each binding is decoded
//! once into the closed [`Trait`] enum; the appliers in the submodules then
//! work on typed values only. Bindings that fail to decode are logged and
//! skipped, unknown trait names are kept as [`Trait::Unknown`] and ignored.

mod auto_scaler;
mod better_auto_scaler;
mod host_policy;
pub(crate) mod ingress;
mod log_pilot;
mod manual_scaler;
mod resources_policy;
mod schedule_policy;
mod volume_mounter;

use std::collections::BTreeMap;
use std::fmt;

use oam_common::crd::TraitBinding;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CompilationError;
use crate::helpers::canonical_quantity;

pub use auto_scaler::AutoScaler;
pub use better_auto_scaler::BetterAutoScaler;
pub use host_policy::HostPolicy;
pub use ingress::IngressRoute;
pub use log_pilot::LogPilot;
pub use manual_scaler::ManualScaler;
pub use resources_policy::ResourcesPolicy;
pub use schedule_policy::{AffinityRule, SchedulePolicy};
pub use volume_mounter::VolumeMounter;

/// Trait names as they appear in bindings
pub mod names {
    /// Sets replicas or parallelism
    pub const MANUAL_SCALER: &str = "manual-scaler";
    /// Claims a declared volume
    pub const VOLUME_MOUNTER: &str = "volume-mounter";
    /// Exposes container logs to log-pilot
    pub const LOG_PILOT: &str = "log-pilot";
    /// Host namespaces
    pub const HOST_POLICY: &str = "host-policy";
    /// Per-container limits override
    pub const RESOURCES_POLICY: &str = "resources-policy";
    /// Node and pod affinity
    pub const SCHEDULE_POLICY: &str = "schedule-policy";
    /// autoscaling/v2 HPA
    pub const AUTO_SCALER: &str = "auto-scaler";
    /// harmonycloud.cn/v1beta1 HPA
    pub const BETTER_AUTO_SCALER: &str = "better-auto-scaler";
    /// Ingress rule to the component Service
    pub const INGRESS: &str = "ingress";
}

/// A decoded trait binding
#[derive(Clone, Debug, PartialEq)]
pub enum Trait {
    /// `manual-scaler`
    ManualScaler(ManualScaler),
    /// `volume-mounter`
    VolumeMounter(VolumeMounter),
    /// `log-pilot`
    LogPilot(LogPilot),
    /// `host-policy`
    HostPolicy(HostPolicy),
    /// `resources-policy`
    ResourcesPolicy(ResourcesPolicy),
    /// `schedule-policy`
    SchedulePolicy(SchedulePolicy),
    /// `auto-scaler`
    AutoScaler(AutoScaler),
    /// `better-auto-scaler`
    BetterAutoScaler(BetterAutoScaler),
    /// `ingress`
    Ingress(IngressRoute),
    /// Any other name; ignored
    Unknown(String),
}

impl Trait {
    /// Decode a binding by name
    pub fn decode(binding: &TraitBinding) -> Result<Self, CompilationError> {
        fn props<T: for<'de> Deserialize<'de>>(
            binding: &TraitBinding,
        ) -> Result<T, CompilationError> {
            let value = if binding.properties.is_null() {
                serde_json::Value::Object(Default::default())
            } else {
                binding.properties.clone()
            };
            serde_json::from_value(value).map_err(|source| CompilationError::InvalidTrait {
                name: binding.name.clone(),
                source,
            })
        }

        Ok(match binding.name.as_str() {
            names::MANUAL_SCALER => Trait::ManualScaler(props(binding)?),
            names::VOLUME_MOUNTER => Trait::VolumeMounter(props(binding)?),
            names::LOG_PILOT => Trait::LogPilot(props(binding)?),
            names::HOST_POLICY => Trait::HostPolicy(props(binding)?),
            names::RESOURCES_POLICY => Trait::ResourcesPolicy(props(binding)?),
            names::SCHEDULE_POLICY => Trait::SchedulePolicy(props(binding)?),
            names::AUTO_SCALER => Trait::AutoScaler(props(binding)?),
            names::BETTER_AUTO_SCALER => Trait::BetterAutoScaler(props(binding)?),
            names::INGRESS => Trait::Ingress(props(binding)?),
            other => Trait::Unknown(other.to_string()),
        })
    }

    /// Binding name
    pub fn name(&self) -> &str {
        match self {
            Trait::ManualScaler(_) => names::MANUAL_SCALER,
            Trait::VolumeMounter(_) => names::VOLUME_MOUNTER,
            Trait::LogPilot(_) => names::LOG_PILOT,
            Trait::HostPolicy(_) => names::HOST_POLICY,
            Trait::ResourcesPolicy(_) => names::RESOURCES_POLICY,
            Trait::SchedulePolicy(_) => names::SCHEDULE_POLICY,
            Trait::AutoScaler(_) => names::AUTO_SCALER,
            Trait::BetterAutoScaler(_) => names::BETTER_AUTO_SCALER,
            Trait::Ingress(_) => names::INGRESS,
            Trait::Unknown(name) => name,
        }
    }
}

/// All decoded traits of one component instance, in binding order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraitSet {
    traits: Vec<Trait>,
}

impl TraitSet {
    /// Decode every binding, skipping malformed ones
    pub fn decode(bindings: &[TraitBinding]) -> Self {
        let mut traits = Vec::with_capacity(bindings.len());
        for binding in bindings {
            match Trait::decode(binding) {
                Ok(Trait::Unknown(name)) => {
                    debug!(name = %name, "ignoring unknown trait");
                }
                Ok(t) => traits.push(t),
                Err(e) => warn!(error = %e, "skipping malformed trait binding"),
            }
        }
        Self { traits }
    }

    /// Replica count of the last manual-scaler, if any
    pub fn manual_replicas(&self) -> Option<i32> {
        self.last(|t| match t {
            Trait::ManualScaler(s) => Some(s.replica_count),
            _ => None,
        })
    }

    /// Replica count; the last manual-scaler wins, default 1
    pub fn replicas(&self) -> i32 {
        self.manual_replicas().unwrap_or(1)
    }

    /// Every volume-mounter binding
    pub fn volume_mounters(&self) -> impl Iterator<Item = &VolumeMounter> {
        self.traits.iter().filter_map(|t| match t {
            Trait::VolumeMounter(v) => Some(v),
            _ => None,
        })
    }

    /// Every log-pilot binding
    pub fn log_pilots(&self) -> impl Iterator<Item = &LogPilot> {
        self.traits.iter().filter_map(|t| match t {
            Trait::LogPilot(v) => Some(v),
            _ => None,
        })
    }

    /// Every host-policy binding
    pub fn host_policies(&self) -> impl Iterator<Item = &HostPolicy> {
        self.traits.iter().filter_map(|t| match t {
            Trait::HostPolicy(v) => Some(v),
            _ => None,
        })
    }

    /// Every resources-policy binding
    pub fn resources_policies(&self) -> impl Iterator<Item = &ResourcesPolicy> {
        self.traits.iter().filter_map(|t| match t {
            Trait::ResourcesPolicy(v) => Some(v),
            _ => None,
        })
    }

    /// The last schedule-policy binding
    pub fn schedule_policy(&self) -> Option<&SchedulePolicy> {
        self.last(|t| match t {
            Trait::SchedulePolicy(v) => Some(v),
            _ => None,
        })
    }

    /// The last auto-scaler binding
    pub fn auto_scaler(&self) -> Option<&AutoScaler> {
        self.last(|t| match t {
            Trait::AutoScaler(v) => Some(v),
            _ => None,
        })
    }

    /// The last better-auto-scaler binding
    pub fn better_auto_scaler(&self) -> Option<&BetterAutoScaler> {
        self.last(|t| match t {
            Trait::BetterAutoScaler(v) => Some(v),
            _ => None,
        })
    }

    /// Every ingress binding
    pub fn ingresses(&self) -> impl Iterator<Item = &IngressRoute> {
        self.traits.iter().filter_map(|t| match t {
            Trait::Ingress(v) => Some(v),
            _ => None,
        })
    }

    /// Storage class of the last volume-mounter that names one
    pub fn storage_class(&self) -> Option<&str> {
        self.volume_mounters()
            .filter_map(|v| v.storage_class.as_deref())
            .filter(|s| !s.is_empty())
            .last()
    }

    fn last<'a, T>(&'a self, pick: impl Fn(&'a Trait) -> Option<T>) -> Option<T> {
        self.traits.iter().rev().find_map(pick)
    }
}

// =============================================================================
// Lenient property decoding
// =============================================================================

/// Accepts an integer, a float with no fraction, or a numeric string
pub(crate) fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    deserializer.deserialize_any(LenientI32)
}

/// Like [`lenient_i32`], with `null` or an empty string meaning absent
pub(crate) fn lenient_opt_i32<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i32>, D::Error> {
    Option::<LenientValue>::deserialize(deserializer)?
        .map(|v| v.into_i32().map_err(de::Error::custom))
        .transpose()
        .map(Option::flatten)
}

/// Map of quantities where values may be strings or bare numbers
pub(crate) fn quantity_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => Ok((k, canonical_quantity(&s))),
            serde_json::Value::Number(n) => Ok((k, canonical_quantity(&n.to_string()))),
            other => Err(de::Error::custom(format!(
                "quantity {k} must be a string or number, got {other}"
            ))),
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl LenientValue {
    fn into_i32(self) -> Result<Option<i32>, String> {
        match self {
            LenientValue::Int(n) => i32::try_from(n).map(Some).map_err(|e| e.to_string()),
            LenientValue::Float(f) if f.fract() == 0.0 && f.abs() <= i32::MAX as f64 => {
                Ok(Some(f as i32))
            }
            LenientValue::Float(f) => Err(format!("{f} is not an integer")),
            LenientValue::Str(s) if s.trim().is_empty() => Ok(None),
            LenientValue::Str(s) => s
                .trim()
                .parse::<i32>()
                .map(Some)
                .map_err(|_| format!("{s:?} is not an integer")),
        }
    }
}

struct LenientI32;

impl<'de> Visitor<'de> for LenientI32 {
    type Value = i32;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i32, E> {
        i32::try_from(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i32, E> {
        i32::try_from(v).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i32, E> {
        LenientValue::Float(v)
            .into_i32()
            .and_then(|n| n.ok_or_else(|| "missing".to_string()))
            .map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i32, E> {
        v.trim()
            .parse::<i32>()
            .map_err(|_| E::custom(format!("{v:?} is not an integer")))
    }
}
