//! The slice of the Kubernetes API the tool consumes.
//!
//! Everything the lifecycle operations do to the cluster goes through [`ControlPlane`], which
//! lets tests substitute a mock for the API server.
mod kube_api;

pub use kube_api::KubeControlPlane;

use async_trait::async_trait;
use kube::{core::GroupVersionKind, discovery::ApiResource};
#[cfg(test)]
use mockall::automock;

use crate::{manifest::Manifest, Error};

/// Field manager used for server side apply.
pub const FIELD_MANAGER: &str = "olmctl";

const OLM_GROUP: &str = "operators.coreos.com";

/// OLM resource kinds the tool reads or deletes.
///
/// Namespaces are not listed, they are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A specific installed version of an operator.
    ClusterServiceVersion,
    /// Intent to install and keep an operator package up to date.
    Subscription,
    /// Scope of namespaces an operator may target.
    OperatorGroup,
    /// Cluster scoped aggregate OLM keeps for every installed operator.
    Operator,
}

impl ResourceKind {
    /// API resource used to address the kind through a dynamic API.
    pub fn api_resource(&self) -> ApiResource {
        let (version, kind, plural) = match self {
            ResourceKind::ClusterServiceVersion => {
                ("v1alpha1", "ClusterServiceVersion", "clusterserviceversions")
            }
            ResourceKind::Subscription => ("v1alpha1", "Subscription", "subscriptions"),
            ResourceKind::OperatorGroup => ("v1", "OperatorGroup", "operatorgroups"),
            ResourceKind::Operator => ("v1", "Operator", "operators"),
        };
        ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(OLM_GROUP, version, kind), plural)
    }

    /// Whether resources of this kind live in a namespace.
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, ResourceKind::Operator)
    }
}

/// A single delete request, absent resources are not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// Delete every resource of the kind within the namespace.
    AllInNamespace {
        /// Kind to delete.
        kind: ResourceKind,
        /// Namespace to delete from.
        namespace: String,
    },
    /// Delete one resource in a namespace.
    Namespaced {
        /// Kind to delete.
        kind: ResourceKind,
        /// Namespace of the resource.
        namespace: String,
        /// Name of the resource.
        name: String,
    },
    /// Delete one cluster scoped resource.
    Cluster {
        /// Kind to delete.
        kind: ResourceKind,
        /// Name of the resource.
        name: String,
    },
}

impl Deletion {
    /// Kind targeted by the deletion.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Deletion::AllInNamespace { kind, .. }
            | Deletion::Namespaced { kind, .. }
            | Deletion::Cluster { kind, .. } => *kind,
        }
    }
}

/// A subscription as found on the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRef {
    /// Name of the subscription.
    pub name: String,
    /// Namespace the subscription lives in, if reported.
    pub namespace: Option<String>,
}

/// Define the behavior we consume from the Kubernetes API.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControlPlane {
    /// Report whether the cluster scoped Operator resource exists.
    async fn operator_exists(&self, name: &str) -> Result<bool, Error>;
    /// List subscriptions in all namespaces with the given name.
    async fn list_subscriptions(&self, name: &str) -> Result<Vec<SubscriptionRef>, Error>;
    /// Apply every resource of the manifest.
    async fn apply_manifest(&self, manifest: &Manifest) -> Result<(), Error>;
    /// Delete resources, ignoring any that are already gone.
    async fn delete(&self, deletion: &Deletion) -> Result<(), Error>;
}
