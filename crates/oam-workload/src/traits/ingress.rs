//! `ingress`: route a host and path to the component Service
//!
//! All bindings of one component collapse into a single Ingress named after
//! the instance, one rule per binding.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use oam_common::kube_utils::HasApiResource;
use serde::Deserialize;

use crate::compiled::ObjectContext;
use crate::k8s::{
    HttpIngressPath, HttpIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};

const PATH_TYPE: &str = "ImplementationSpecific";

fn default_path() -> String {
    "/".to_string()
}

/// One host rule
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressRoute {
    /// Host to match
    pub hostname: String,
    /// Path to match
    #[serde(default = "default_path")]
    pub path: String,
    /// Service port, by number or name
    pub service_port: IntOrString,
    /// Ingress class
    #[serde(default)]
    pub ingress_class: Option<String>,
}

impl IngressRoute {
    fn rule(&self, service: &str) -> IngressRule {
        IngressRule {
            host: (!self.hostname.is_empty()).then(|| self.hostname.clone()),
            http: HttpIngressRuleValue {
                paths: vec![HttpIngressPath {
                    path: if self.path.is_empty() { default_path() } else { self.path.clone() },
                    path_type: PATH_TYPE.to_string(),
                    backend: IngressBackend {
                        service: IngressServiceBackend {
                            name: service.to_string(),
                            port: ServiceBackendPort::from(&self.service_port),
                        },
                    },
                }],
            },
        }
    }
}

/// Build the component Ingress, `None` without any binding
pub fn compile<'r>(
    ctx: &ObjectContext<'_>,
    routes: impl IntoIterator<Item = &'r IngressRoute>,
) -> Option<Ingress> {
    let routes: Vec<&IngressRoute> = routes.into_iter().collect();
    if routes.is_empty() {
        return None;
    }

    let ingress_class_name = routes
        .iter()
        .filter_map(|r| r.ingress_class.as_deref())
        .find(|c| !c.is_empty())
        .map(String::from);

    Some(Ingress {
        api_version: Ingress::API_VERSION.to_string(),
        kind: Ingress::KIND.to_string(),
        metadata: ctx.trait_meta(ctx.instance),
        spec: IngressSpec {
            ingress_class_name,
            rules: routes.iter().map(|r| r.rule(ctx.instance)).collect(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::tests::{context, owner};
    use serde_json::json;

    fn route(props: serde_json::Value) -> IngressRoute {
        serde_json::from_value(props).unwrap()
    }

    /// Story: each binding becomes one rule on a single Ingress
    #[test]
    fn story_bindings_collapse_into_one_ingress() {
        let owner = owner();
        let ctx = context(&owner);
        let routes = vec![
            route(json!({"hostname": "shop.example.com", "servicePort": 80})),
            route(json!({"hostname": "api.example.com", "path": "/v1", "servicePort": "http", "ingressClass": "nginx"})),
        ];
        let ingress = compile(&ctx, &routes).unwrap();

        assert_eq!(ingress.metadata.name, ctx.instance);
        assert_eq!(ingress.spec.ingress_class_name.as_deref(), Some("nginx"));
        assert_eq!(ingress.spec.rules.len(), 2);

        let first = &ingress.spec.rules[0];
        assert_eq!(first.host.as_deref(), Some("shop.example.com"));
        assert_eq!(first.http.paths[0].path, "/");
        assert_eq!(first.http.paths[0].backend.service.name, ctx.instance);
        assert_eq!(first.http.paths[0].backend.service.port.number, Some(80));

        let second = &ingress.spec.rules[1].http.paths[0];
        assert_eq!(second.path, "/v1");
        assert_eq!(second.backend.service.port.name.as_deref(), Some("http"));
    }

    /// Story: no bindings, no Ingress
    #[test]
    fn story_no_bindings_no_ingress() {
        let owner = owner();
        let ctx = context(&owner);
        assert!(compile(&ctx, std::iter::empty()).is_none());
    }
}
