//! Parameter resolution
//!
//! Folds schematic defaults, literal bindings and variable indirections into
//! one flat `name -> value` map. Resolution never fails: anything that cannot
//! be resolved is reported as a warning and the default stays in place.

use std::collections::BTreeMap;

use oam_common::crd::{Parameter, ParameterValue, Variable};
use tracing::warn;

/// Resolved parameter values by name
pub type ParameterMap = BTreeMap<String, String>;

const FROM_VARIABLE_PREFIX: &str = "[fromVariable(";
const FROM_VARIABLE_SUFFIX: &str = ")]";

/// Outcome of parameter resolution
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedParameters {
    /// Resolved values
    pub values: ParameterMap,
    /// Non-fatal problems found while resolving
    pub warnings: Vec<String>,
}

/// Extract `NAME` from a `[fromVariable(NAME)]` reference
pub fn variable_reference(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix(FROM_VARIABLE_PREFIX)?
        .strip_suffix(FROM_VARIABLE_SUFFIX)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Resolve a component instance's parameter bindings.
///
/// Precedence for each binding: a literal `value` wins, otherwise `from` or a
/// `[fromVariable(NAME)]` value names a variable. Bindings for parameters the
/// schematic does not declare are still resolved so that `fromParam`
/// references can see them.
pub fn resolve_parameters(
    parameters: &[Parameter],
    bindings: &[ParameterValue],
    variables: &[Variable],
) -> ResolvedParameters {
    let mut resolved = ResolvedParameters::default();

    for param in parameters {
        if let Some(default) = &param.default {
            resolved.values.insert(param.name.clone(), default.clone());
        }
    }

    let lookup = |name: &str| variables.iter().find(|v| v.name == name).map(|v| v.value.clone());

    for binding in bindings {
        let variable = match (binding.value.as_deref(), binding.from.as_deref()) {
            (Some(value), _) => match variable_reference(value) {
                Some(name) => name,
                None => {
                    resolved.values.insert(binding.name.clone(), value.to_string());
                    continue;
                }
            },
            (None, Some(from)) if !from.is_empty() => from,
            _ => continue,
        };

        match lookup(variable) {
            Some(value) => {
                resolved.values.insert(binding.name.clone(), value);
            }
            None => {
                warn!(parameter = %binding.name, variable = %variable, "unresolved variable reference");
                resolved.warnings.push(format!(
                    "parameter {} references undefined variable {}",
                    binding.name, variable
                ));
            }
        }
    }

    for param in parameters.iter().filter(|p| p.required) {
        if !resolved.values.contains_key(&param.name) {
            warn!(parameter = %param.name, "required parameter has no value");
            resolved
                .warnings
                .push(format!("required parameter {} has no value", param.name));
        }
    }

    resolved
}
