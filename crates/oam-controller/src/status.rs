//! Status aggregation
//!
//! Derives per-component health from the component's resource records.
//! Records normally carry a structured observation; records written before
//! observations existed only have display text, which is parsed as a
//! fallback.

use oam_common::crd::{
    ApplicationConfigurationStatus, Health, ModuleStatus, ObservedState, ResourceRecord,
    WorkloadType,
};
use oam_common::Error;

const PHASE_RUNNING: &str = "Running";
const PHASE_BOUND: &str = "Bound";

/// Kinds health is defined for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HealthKind {
    Deployment,
    Job,
    Autoscaler,
    Claim,
    MysqlCluster,
    Passive,
}

impl HealthKind {
    fn of(kind: &str) -> Result<Self, Error> {
        Ok(match kind {
            "Deployment" => HealthKind::Deployment,
            "Job" => HealthKind::Job,
            "HorizontalPodAutoscaler" => HealthKind::Autoscaler,
            "PersistentVolumeClaim" => HealthKind::Claim,
            "MysqlCluster" => HealthKind::MysqlCluster,
            "Service" | "ConfigMap" | "Ingress" => HealthKind::Passive,
            other => return Err(Error::undefined_kind(other)),
        })
    }
}

fn healthy_if(condition: bool) -> Health {
    if condition {
        Health::Healthy
    } else {
        Health::Unhealthy
    }
}

/// Health of one record
pub fn record_health(record: &ResourceRecord) -> Result<Health, Error> {
    let kind = HealthKind::of(&record.kind)?;
    if record.sync.is_failure() {
        return Ok(Health::Unhealthy);
    }
    if kind == HealthKind::Passive {
        return Ok(Health::Healthy);
    }
    match &record.observed {
        Some(observed) => observed_health(kind, &record.kind, observed),
        None if !record.status.is_empty() => Ok(text_health(kind, &record.status)),
        None => Ok(Health::Unhealthy),
    }
}

fn observed_health(kind: HealthKind, kind_name: &str, observed: &ObservedState) -> Result<Health, Error> {
    Ok(match (kind, observed) {
        (HealthKind::Deployment, ObservedState::Deployment(d)) => {
            healthy_if(d.ready_replicas == d.replicas && d.ready_replicas != 0)
        }
        (HealthKind::Job, ObservedState::Job(j)) => healthy_if(j.failed == 0),
        (HealthKind::Autoscaler, ObservedState::Autoscaler(a)) => {
            healthy_if(a.current_replicas == a.desired_replicas)
        }
        (HealthKind::Claim, ObservedState::Claim(c)) => healthy_if(c.phase == PHASE_BOUND),
        (HealthKind::MysqlCluster, ObservedState::MysqlCluster(m)) => {
            healthy_if(m.phase == PHASE_RUNNING)
        }
        (HealthKind::Passive, _) => Health::Healthy,
        (_, other) => {
            return Err(Error::type_mismatch(kind_name, observation_kind(other)));
        }
    })
}

fn observation_kind(observed: &ObservedState) -> &'static str {
    match observed {
        ObservedState::Deployment(_) => "Deployment",
        ObservedState::Job(_) => "Job",
        ObservedState::Autoscaler(_) => "HorizontalPodAutoscaler",
        ObservedState::Claim(_) => "PersistentVolumeClaim",
        ObservedState::Service(_) => "Service",
        ObservedState::ConfigMap(_) => "ConfigMap",
        ObservedState::Ingress(_) => "Ingress",
        ObservedState::MysqlCluster(_) => "MysqlCluster",
    }
}

/// Value following `label: ` up to the next comma, without a trailing period
fn text_field<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let start = text.find(&format!("{label}: "))? + label.len() + 2;
    let rest = &text[start..];
    let value = rest.split(',').next().unwrap_or(rest).trim();
    Some(value.trim_end_matches('.'))
}

fn text_number(text: &str, label: &str) -> Option<i64> {
    text_field(text, label)?.parse().ok()
}

/// Health from a display text; anything unparseable is Unhealthy
pub fn text_health_for_kind(kind: &str, text: &str) -> Result<Health, Error> {
    Ok(text_health(HealthKind::of(kind)?, text))
}

fn text_health(kind: HealthKind, text: &str) -> Health {
    match kind {
        HealthKind::Deployment => {
            let ready = text_field(text, "Ready").and_then(|r| r.split_once('/'));
            match ready.map(|(r, n)| (r.trim().parse::<i64>(), n.trim().parse::<i64>())) {
                Some((Ok(ready), Ok(desired))) => healthy_if(ready == desired && ready != 0),
                _ => Health::Unhealthy,
            }
        }
        HealthKind::Job => healthy_if(text_number(text, "Failed") == Some(0)),
        HealthKind::Autoscaler => {
            match (text_number(text, "CurrentReplicas"), text_number(text, "DesiredReplicas")) {
                (Some(current), Some(desired)) => healthy_if(current == desired),
                _ => Health::Unhealthy,
            }
        }
        HealthKind::Claim => healthy_if(text.trim_end().ends_with("Bound.")),
        HealthKind::MysqlCluster => healthy_if(text_field(text, "Phase") == Some(PHASE_RUNNING)),
        HealthKind::Passive => Health::Healthy,
    }
}

/// Health of a component instance: Healthy iff it has records and all are healthy
pub fn component_health(status: &ApplicationConfigurationStatus, instance: &str) -> Result<Health, Error> {
    let mut seen = false;
    let mut health = Health::Healthy;
    for record in status.records_for(instance) {
        seen = true;
        if record_health(record)? == Health::Unhealthy {
            health = Health::Unhealthy;
        }
    }
    Ok(if seen { health } else { Health::Unhealthy })
}

/// One module entry per component instance
pub fn aggregate(
    status: &ApplicationConfigurationStatus,
    namespace: &str,
    components: &[(String, WorkloadType)],
) -> Result<Vec<ModuleStatus>, Error> {
    components
        .iter()
        .map(|(instance, workload_type)| {
            Ok(ModuleStatus {
                namespaced_name: format!("{namespace}/{instance}"),
                kind: workload_type.kind().to_string(),
                group_version: workload_type.group_version().to_string(),
                status: component_health(status, instance)?,
            })
        })
        .collect()
}

/// Recompute the health of every module already listed in `status`
pub fn refresh_modules(status: &mut ApplicationConfigurationStatus) -> Result<(), Error> {
    let mut updated = Vec::with_capacity(status.modules.len());
    for module in &status.modules {
        let instance = module
            .namespaced_name
            .split_once('/')
            .map_or(module.namespaced_name.as_str(), |(_, name)| name);
        updated.push(component_health(status, instance)?);
    }
    for (module, health) in status.modules.iter_mut().zip(updated) {
        module.status = health;
    }
    Ok(())
}
