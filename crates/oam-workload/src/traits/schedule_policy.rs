//! `schedule-policy`: node affinity, pod affinity and pod anti-affinity
//!
//! Each rule is either `required` (hard constraint) or anything else (soft,
//! weight 50). A rule's selector becomes one term whose entries are ANDed
//! `In` expressions. Pod rules are scoped to the component's namespace and
//! co-locate per node.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::k8s::{
    Affinity, LabelSelector, NodeAffinity, NodeSelector, NodeSelectorTerm, PodAffinity,
    PodAffinityTerm, PodSpec, PreferredSchedulingTerm, SelectorRequirement,
    WeightedPodAffinityTerm,
};

const REQUIRED: &str = "required";
const PREFERRED_WEIGHT: i32 = 50;
const HOSTNAME_TOPOLOGY: &str = "kubernetes.io/hostname";

/// One affinity rule
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct AffinityRule {
    /// `required` or `preferred`
    #[serde(default, rename = "type")]
    pub type_: String,
    /// Labels to match
    #[serde(default)]
    pub selector: BTreeMap<String, String>,
}

impl AffinityRule {
    fn is_required(&self) -> bool {
        self.type_ == REQUIRED
    }

    fn expressions(&self) -> Vec<SelectorRequirement> {
        self.selector
            .iter()
            .map(|(k, v)| SelectorRequirement::is_in(k, v))
            .collect()
    }

    fn pod_term(&self, namespace: &str) -> PodAffinityTerm {
        PodAffinityTerm {
            label_selector: LabelSelector {
                match_expressions: self.expressions(),
                ..Default::default()
            },
            namespaces: vec![namespace.to_string()],
            topology_key: HOSTNAME_TOPOLOGY.to_string(),
        }
    }

    fn pod_affinity(&self, namespace: &str) -> Option<PodAffinity> {
        if self.selector.is_empty() {
            return None;
        }
        let mut affinity = PodAffinity::default();
        if self.is_required() {
            affinity
                .required_during_scheduling_ignored_during_execution
                .push(self.pod_term(namespace));
        } else {
            affinity
                .preferred_during_scheduling_ignored_during_execution
                .push(WeightedPodAffinityTerm {
                    weight: PREFERRED_WEIGHT,
                    pod_affinity_term: self.pod_term(namespace),
                });
        }
        Some(affinity)
    }

    fn node_affinity(&self) -> Option<NodeAffinity> {
        if self.selector.is_empty() {
            return None;
        }
        let term = NodeSelectorTerm {
            match_expressions: self.expressions(),
        };
        let mut affinity = NodeAffinity::default();
        if self.is_required() {
            affinity.required_during_scheduling_ignored_during_execution = Some(NodeSelector {
                node_selector_terms: vec![term],
            });
        } else {
            affinity
                .preferred_during_scheduling_ignored_during_execution
                .push(PreferredSchedulingTerm {
                    weight: PREFERRED_WEIGHT,
                    preference: term,
                });
        }
        Some(affinity)
    }
}

/// Scheduling constraints for the component's pods
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePolicy {
    /// Nodes to run on
    #[serde(default)]
    pub node_affinity: AffinityRule,
    /// Pods to run next to
    #[serde(default)]
    pub pod_affinity: AffinityRule,
    /// Pods to stay away from
    #[serde(default)]
    pub pod_anti_affinity: AffinityRule,
}

impl SchedulePolicy {
    /// Replace the pod's affinity; a policy with only empty selectors clears it
    pub fn apply(&self, pod: &mut PodSpec, namespace: &str) {
        let affinity = Affinity {
            node_affinity: self.node_affinity.node_affinity(),
            pod_affinity: self.pod_affinity.pod_affinity(namespace),
            pod_anti_affinity: self.pod_anti_affinity.pod_affinity(namespace),
        };
        pod.affinity = (affinity != Affinity::default()).then_some(affinity);
    }
}
