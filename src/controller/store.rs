//! Object store access used by the reconcilers
//!
//! Reconcilers never talk to `kube::Api` directly. They go through
//! [`AddonStore`] so the pipeline can be driven against an in-memory store in
//! tests. [`KubeStore`] is the API server backed implementation.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::controller::error::{Error, Result};
use crate::crd::{
    Addon, AddonInstance, AddonOperator, CatalogSource, InstallPlan, Operator, OperatorGroup,
    Subscription,
};
use crate::resources::FIELD_MANAGER;

#[async_trait]
pub trait AddonStore: Send + Sync {
    /// Fresh list of every Addon, bypassing any cache
    async fn list_addons(&self) -> Result<Vec<Addon>>;

    /// Replace the finalizer list of an Addon
    async fn update_addon_finalizers(&self, addon: &Addon, finalizers: Vec<String>) -> Result<()>;

    /// Persist the status subresource; a vanished Addon is not an error
    async fn update_addon_status(&self, addon: &Addon) -> Result<()>;

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>>;
    async fn create_namespace(&self, namespace: &Namespace) -> Result<()>;

    async fn get_addon_instance(&self, namespace: &str, name: &str)
    -> Result<Option<AddonInstance>>;
    async fn create_addon_instance(&self, instance: &AddonInstance) -> Result<()>;
    async fn update_addon_instance(&self, instance: &AddonInstance) -> Result<()>;

    async fn get_operator_group(&self, namespace: &str, name: &str)
    -> Result<Option<OperatorGroup>>;
    async fn create_operator_group(&self, group: &OperatorGroup) -> Result<()>;
    async fn update_operator_group(&self, group: &OperatorGroup) -> Result<()>;

    async fn get_catalog_source(&self, namespace: &str, name: &str)
    -> Result<Option<CatalogSource>>;
    async fn create_catalog_source(&self, catalog: &CatalogSource) -> Result<()>;
    async fn update_catalog_source(&self, catalog: &CatalogSource) -> Result<()>;

    async fn get_subscription(&self, namespace: &str, name: &str) -> Result<Option<Subscription>>;
    async fn create_subscription(&self, subscription: &Subscription) -> Result<()>;
    async fn update_subscription(&self, subscription: &Subscription) -> Result<()>;

    async fn get_network_policy(&self, namespace: &str, name: &str)
    -> Result<Option<NetworkPolicy>>;
    async fn create_network_policy(&self, policy: &NetworkPolicy) -> Result<()>;
    async fn update_network_policy(&self, policy: &NetworkPolicy) -> Result<()>;

    async fn get_install_plan(&self, namespace: &str, name: &str) -> Result<Option<InstallPlan>>;

    /// Cluster scoped OLM Operator aggregate, named `<package>.<namespace>`
    async fn get_operator(&self, name: &str) -> Result<Option<Operator>>;

    /// ConfigMaps carrying the given label key, read straight from the API server
    async fn list_config_maps_uncached(
        &self,
        namespace: &str,
        label_key: &str,
    ) -> Result<Vec<ConfigMap>>;
    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<()>;

    async fn get_addon_operator(&self, name: &str) -> Result<Option<AddonOperator>>;
    async fn update_addon_operator_status(&self, operator: &AddonOperator) -> Result<()>;
}

/// [`AddonStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_namespaced<K>(&self, namespace: &str, name: &str) -> Result<Option<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_namespaced<K>(&self, obj: &K) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + Serialize
            + DeserializeOwned
            + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let namespace = obj.namespace().ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        api.create(&PostParams::default(), obj).await?;
        debug!("Created {}/{}", namespace, obj.name_any());
        Ok(())
    }

    /// Merge the desired object into the stored one
    ///
    /// The resourceVersion of `obj` is sent along so a concurrent writer
    /// surfaces as a conflict.
    async fn update_namespaced<K>(&self, obj: &K) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + Serialize
            + DeserializeOwned
            + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let namespace = obj.namespace().ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        api.patch(
            &obj.name_any(),
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(obj),
        )
        .await?;
        debug!("Updated {}/{}", namespace, obj.name_any());
        Ok(())
    }
}

#[async_trait]
impl AddonStore for KubeStore {
    async fn list_addons(&self) -> Result<Vec<Addon>> {
        let api: Api<Addon> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn update_addon_finalizers(&self, addon: &Addon, finalizers: Vec<String>) -> Result<()> {
        let api: Api<Addon> = Api::all(self.client.clone());
        let mut metadata = serde_json::json!({ "finalizers": finalizers });
        if let Some(rv) = addon.resource_version() {
            metadata["resourceVersion"] = serde_json::Value::String(rv);
        }
        let patch = serde_json::json!({ "metadata": metadata });
        api.patch(
            &addon.name_any(),
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }

    async fn update_addon_status(&self, addon: &Addon) -> Result<()> {
        let api: Api<Addon> = Api::all(self.client.clone());
        let patch = serde_json::json!({ "status": addon.status });
        match api
            .patch_status(
                &addon.name_any(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                debug!("Addon {} is gone, dropping status update", addon.name_any());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), namespace).await?;
        Ok(())
    }

    async fn get_addon_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<AddonInstance>> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_addon_instance(&self, instance: &AddonInstance) -> Result<()> {
        self.create_namespaced(instance).await
    }

    async fn update_addon_instance(&self, instance: &AddonInstance) -> Result<()> {
        self.update_namespaced(instance).await
    }

    async fn get_operator_group(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<OperatorGroup>> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_operator_group(&self, group: &OperatorGroup) -> Result<()> {
        self.create_namespaced(group).await
    }

    async fn update_operator_group(&self, group: &OperatorGroup) -> Result<()> {
        self.update_namespaced(group).await
    }

    async fn get_catalog_source(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<CatalogSource>> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_catalog_source(&self, catalog: &CatalogSource) -> Result<()> {
        self.create_namespaced(catalog).await
    }

    async fn update_catalog_source(&self, catalog: &CatalogSource) -> Result<()> {
        self.update_namespaced(catalog).await
    }

    async fn get_subscription(&self, namespace: &str, name: &str) -> Result<Option<Subscription>> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.create_namespaced(subscription).await
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.update_namespaced(subscription).await
    }

    async fn get_network_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<NetworkPolicy>> {
        self.get_namespaced(namespace, name).await
    }

    async fn create_network_policy(&self, policy: &NetworkPolicy) -> Result<()> {
        self.create_namespaced(policy).await
    }

    async fn update_network_policy(&self, policy: &NetworkPolicy) -> Result<()> {
        self.update_namespaced(policy).await
    }

    async fn get_install_plan(&self, namespace: &str, name: &str) -> Result<Option<InstallPlan>> {
        self.get_namespaced(namespace, name).await
    }

    async fn get_operator(&self, name: &str) -> Result<Option<Operator>> {
        let api: Api<Operator> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn list_config_maps_uncached(
        &self,
        namespace: &str,
        label_key: &str,
    ) -> Result<Vec<ConfigMap>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default().labels(label_key)).await?.items)
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<()> {
        self.create_namespaced(config_map).await
    }

    async fn get_addon_operator(&self, name: &str) -> Result<Option<AddonOperator>> {
        let api: Api<AddonOperator> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    async fn update_addon_operator_status(&self, operator: &AddonOperator) -> Result<()> {
        let api: Api<AddonOperator> = Api::all(self.client.clone());
        let patch = serde_json::json!({ "status": operator.status });
        api.patch_status(
            &operator.name_any(),
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }
}
