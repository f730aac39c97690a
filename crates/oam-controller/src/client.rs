//! Kubernetes client seam
//!
//! Every API call the controller makes goes through [`OamKubeClient`], so the
//! reconciler and the status writer can run against mocks or an in-memory
//! cluster in tests.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde_json::{json, Value};

#[cfg(test)]
use mockall::automock;

use oam_common::crd::{ApplicationConfiguration, ApplicationConfigurationStatus, ComponentSchematic};
use oam_common::{Error, FIELD_MANAGER};

/// Operations the controller needs from the API server.
///
/// Reads return `Ok(None)` on 404; every other API failure is an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OamKubeClient: Send + Sync {
    /// Get any object by API coordinates
    async fn get_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, Error>;

    /// Create an object from its serialized body
    async fn create_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        body: &Value,
    ) -> Result<(), Error>;

    /// JSON merge-patch an existing object
    async fn patch_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<(), Error>;

    /// Get a ComponentSchematic
    async fn get_schematic(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ComponentSchematic>, Error>;

    /// Get an ApplicationConfiguration
    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationConfiguration>, Error>;

    /// Write an application's status, conditional on `resource_version` when given.
    ///
    /// A stale version fails with a 409 API error.
    async fn patch_application_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<String>,
        status: &ApplicationConfigurationStatus,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic(&self, api_resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, api_resource)
    }
}

#[async_trait]
impl OamKubeClient for KubeClient {
    async fn get_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DynamicObject>, Error> {
        match self.dynamic(api_resource, namespace).get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        body: &Value,
    ) -> Result<(), Error> {
        let obj: DynamicObject = serde_json::from_value(body.clone())?;
        self.dynamic(api_resource, namespace)
            .create(&PostParams::default(), &obj)
            .await?;
        Ok(())
    }

    async fn patch_object(
        &self,
        api_resource: &ApiResource,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<(), Error> {
        self.dynamic(api_resource, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn get_schematic(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ComponentSchematic>, Error> {
        let api: Api<ComponentSchematic> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(schematic) => Ok(Some(schematic)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationConfiguration>, Error> {
        let api: Api<ApplicationConfiguration> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(app) => Ok(Some(app)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn patch_application_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<String>,
        status: &ApplicationConfigurationStatus,
    ) -> Result<(), Error> {
        let api: Api<ApplicationConfiguration> = Api::namespaced(self.client.clone(), namespace);
        let status = status.merge_patch()?;
        let status_patch = match resource_version {
            Some(rv) => json!({ "metadata": { "resourceVersion": rv }, "status": status }),
            None => json!({ "status": status }),
        };
        api.patch_status(
            name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&status_patch),
        )
        .await?;
        Ok(())
    }
}
