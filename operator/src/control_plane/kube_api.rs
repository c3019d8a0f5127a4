use async_trait::async_trait;
use kube::{
    api::{DeleteParams, DynamicObject, ListParams, Patch, PatchParams},
    core::GroupVersionKind,
    discovery::{self, Scope},
    Api, Client, ResourceExt,
};
use tracing::{debug, info};

use crate::{
    control_plane::{
        ControlPlane, Deletion, ResourceKind, SubscriptionRef, FIELD_MANAGER, OLM_GROUP,
    },
    manifest::Manifest,
    Error,
};

/// [`ControlPlane`] backed by a live Kubernetes API server.
pub struct KubeControlPlane {
    client: Client,
}

impl KubeControlPlane {
    /// Wrap an existing client without checking the cluster.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the ambient kubeconfig or in-cluster configuration.
    ///
    /// Fails when the cluster cannot be reached or does not serve the OLM API.
    pub async fn connect() -> Result<Self, Error> {
        let client = Client::try_default()
            .await
            .map_err(|err| Error::PrerequisiteMissing {
                reason: format!("no usable cluster configuration: {err}"),
            })?;
        let control_plane = Self::new(client);
        control_plane.check_prerequisites().await?;
        Ok(control_plane)
    }

    /// Verify the API server answers and serves the OLM Operator kind.
    pub async fn check_prerequisites(&self) -> Result<(), Error> {
        let version =
            self.client
                .apiserver_version()
                .await
                .map_err(|err| Error::PrerequisiteMissing {
                    reason: format!("control plane is unreachable: {err}"),
                })?;
        debug!(version = %version.git_version, "control plane reachable");

        let gvk = GroupVersionKind::gvk(OLM_GROUP, "v1", "Operator");
        discovery::pinned_kind(&self.client, &gvk)
            .await
            .map_err(|err| Error::PrerequisiteMissing {
                reason: format!("{OLM_GROUP}/v1 Operator is not served: {err}"),
            })?;
        Ok(())
    }

    fn api(&self, kind: ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = kind.api_resource();
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }

    async fn apply_object(&self, manifest: &Manifest, object: &DynamicObject) -> Result<(), Error> {
        let Some(types) = &object.types else {
            return Err(Error::MalformedManifest {
                path: manifest.path().to_owned(),
                reason: "resource without apiVersion and kind".to_owned(),
            });
        };
        let (group, version) = types
            .api_version
            .split_once('/')
            .unwrap_or(("", types.api_version.as_str()));
        let gvk = GroupVersionKind::gvk(group, version, &types.kind);
        let (ar, caps) = discovery::pinned_kind(&self.client, &gvk).await?;

        let api: Api<DynamicObject> = match (caps.scope, object.namespace()) {
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), &ar),
            (Scope::Namespaced, Some(ns)) => Api::namespaced_with(self.client.clone(), &ns, &ar),
            (Scope::Namespaced, None) => Api::default_namespaced_with(self.client.clone(), &ar),
        };
        let name = object.name_any();
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(object),
        )
        .await?;
        info!(kind = %types.kind, %name, "applied");
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn operator_exists(&self, name: &str) -> Result<bool, Error> {
        let operators = self.api(ResourceKind::Operator, None);
        let found = operators.get_opt(name).await?.is_some();
        debug!(name, found, "operator lookup");
        Ok(found)
    }

    async fn list_subscriptions(&self, name: &str) -> Result<Vec<SubscriptionRef>, Error> {
        let subscriptions = self.api(ResourceKind::Subscription, None);
        let params = ListParams::default().fields(&format!("metadata.name={name}"));
        let list = subscriptions.list(&params).await?;
        debug!(name, count = list.items.len(), "subscription lookup");
        Ok(list
            .items
            .into_iter()
            .map(|subscription| SubscriptionRef {
                name: subscription.name_any(),
                namespace: subscription.namespace(),
            })
            .collect())
    }

    async fn apply_manifest(&self, manifest: &Manifest) -> Result<(), Error> {
        for object in manifest.documents() {
            self.apply_object(manifest, object).await?;
        }
        Ok(())
    }

    async fn delete(&self, deletion: &Deletion) -> Result<(), Error> {
        let params = DeleteParams::default();
        let result = match deletion {
            Deletion::AllInNamespace { kind, namespace } => self
                .api(*kind, Some(namespace))
                .delete_collection(&params, &ListParams::default())
                .await
                .map(|_| ()),
            Deletion::Namespaced {
                kind,
                namespace,
                name,
            } => self
                .api(*kind, Some(namespace))
                .delete(name, &params)
                .await
                .map(|_| ()),
            Deletion::Cluster { kind, name } => {
                self.api(*kind, None).delete(name, &params).await.map(|_| ())
            }
        };
        match result {
            Ok(()) => {
                info!(?deletion, "deleted");
                Ok(())
            }
            Err(kube::Error::Api(err)) if err.reason == "NotFound" => {
                debug!(?deletion, "already absent");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
