//! Removes an operator through OLM while leaving its namespace in place.
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    control_plane::{ControlPlane, Deletion, ResourceKind},
    locator::locate_namespace,
    manifest::{Manifest, OPERATOR_GROUP_KIND},
    registry::CanonicalOperatorId,
    utils::{Clock, Context},
    Error,
};

/// What an uninstall did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    /// Namespace the operator was removed from, it still exists.
    pub namespace: String,
    /// Deletions issued, in order.
    pub deletions: Vec<Deletion>,
    /// Deletions the control plane rejected.
    pub failures: Vec<DeletionFailure>,
}

impl UninstallReport {
    /// Report whether every deletion succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A deletion that failed for a reason other than the resource being absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    /// The rejected deletion.
    pub deletion: Deletion,
    /// Error reported for it.
    pub reason: String,
}

/// Remove the operator, its subscription, operator group and cluster service versions.
///
/// CSVs go first so OLM does not recreate anything once the subscription is gone, the
/// cluster scoped Operator goes last. Resources that are already absent are skipped, the
/// namespace is never deleted.
///
/// Only resolving the subscription and its namespace can fail the call. Every planned deletion is
/// issued, rejected ones are collected in [`UninstallReport::failures`].
#[tracing::instrument(skip_all, fields(id = %id, manifest = %manifest.path().display()))]
pub async fn uninstall(
    cx: Arc<Context<impl ControlPlane, impl Clock>>,
    id: &CanonicalOperatorId,
    manifest: &Manifest,
) -> Result<UninstallReport, Error> {
    let subscription = manifest.subscription_name()?;
    let namespace = locate_namespace(cx.clone(), subscription).await?;

    let deletions = deletion_plan(id, manifest, subscription, &namespace);
    let mut failures = Vec::new();
    for deletion in &deletions {
        if let Err(err) = cx.control_plane.delete(deletion).await {
            warn!(?deletion, %err, "deletion failed, continuing");
            failures.push(DeletionFailure {
                deletion: deletion.clone(),
                reason: err.to_string(),
            });
        }
    }
    if failures.is_empty() {
        info!(namespace, "operator removed, namespace preserved");
    } else {
        warn!(
            namespace,
            failed = failures.len(),
            "operator partially removed, namespace preserved"
        );
    }
    Ok(UninstallReport {
        namespace,
        deletions,
        failures,
    })
}

/// Build the ordered deletions for an operator installed in `namespace`.
pub fn deletion_plan(
    id: &CanonicalOperatorId,
    manifest: &Manifest,
    subscription: &str,
    namespace: &str,
) -> Vec<Deletion> {
    let mut plan = vec![
        Deletion::AllInNamespace {
            kind: ResourceKind::ClusterServiceVersion,
            namespace: namespace.to_owned(),
        },
        Deletion::Namespaced {
            kind: ResourceKind::Subscription,
            namespace: namespace.to_owned(),
            name: subscription.to_owned(),
        },
    ];

    let operator_groups = manifest.names_of_kind(OPERATOR_GROUP_KIND);
    if operator_groups.is_empty() {
        plan.push(Deletion::AllInNamespace {
            kind: ResourceKind::OperatorGroup,
            namespace: namespace.to_owned(),
        });
    } else {
        plan.extend(
            operator_groups
                .into_iter()
                .map(|name| Deletion::Namespaced {
                    kind: ResourceKind::OperatorGroup,
                    namespace: namespace.to_owned(),
                    name: name.to_owned(),
                }),
        );
    }

    plan.push(Deletion::Cluster {
        kind: ResourceKind::Operator,
        name: id.to_string(),
    });
    plan
}
