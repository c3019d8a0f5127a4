//! Finds the namespace an operator's subscription actually lives in.
use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    control_plane::ControlPlane,
    utils::{Clock, Context},
    Error,
};

/// Locate the single namespace holding a subscription with the given name.
///
/// Fails when the subscription is missing or present in more than one namespace.
#[tracing::instrument(skip(cx))]
pub async fn locate_namespace(
    cx: Arc<Context<impl ControlPlane, impl Clock>>,
    subscription: &str,
) -> Result<String, Error> {
    let found = cx.control_plane.list_subscriptions(subscription).await?;
    debug!(?found, "subscriptions");

    let mut namespaces: Vec<String> = found
        .into_iter()
        .filter(|s| s.name == subscription)
        .filter_map(|s| s.namespace)
        .collect();
    namespaces.sort();
    namespaces.dedup();

    if let [namespace] = namespaces.as_mut_slice() {
        let namespace = std::mem::take(namespace);
        info!(%namespace, "located subscription");
        return Ok(namespace);
    }
    Err(Error::NamespaceResolution {
        subscription: subscription.to_owned(),
        namespaces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::control_plane::{MockControlPlane, SubscriptionRef};

    fn subscription(name: &str, namespace: &str) -> SubscriptionRef {
        SubscriptionRef {
            name: name.to_owned(),
            namespace: Some(namespace.to_owned()),
        }
    }

    fn listing(found: Vec<SubscriptionRef>) -> MockControlPlane {
        let mut control_plane = MockControlPlane::new();
        control_plane
            .expect_list_subscriptions()
            .times(1)
            .returning(move |_| Ok(found.clone()));
        control_plane
    }

    #[tokio::test]
    async fn finds_single_namespace() {
        let cx = Context::test(listing(vec![subscription(
            "tempo-product",
            "openshift-tempo-operator",
        )]));
        assert_eq!(
            locate_namespace(cx, "tempo-product").await.expect("locate"),
            "openshift-tempo-operator"
        );
    }

    #[tokio::test]
    async fn ignores_subscriptions_with_other_names() {
        let cx = Context::test(listing(vec![
            subscription("tempo-product-old", "legacy"),
            subscription("tempo-product", "observability"),
        ]));
        assert_eq!(
            locate_namespace(cx, "tempo-product").await.expect("locate"),
            "observability"
        );
    }

    #[tokio::test]
    async fn missing_subscription_fails() {
        let cx = Context::test(listing(vec![]));
        match locate_namespace(cx, "x").await {
            Err(Error::NamespaceResolution {
                subscription,
                namespaces,
            }) => {
                assert_eq!(subscription, "x");
                assert!(namespaces.is_empty());
            }
            other => panic!("expected namespace resolution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn subscription_in_two_namespaces_is_ambiguous() {
        let cx = Context::test(listing(vec![
            subscription("x", "team-b"),
            subscription("x", "team-a"),
        ]));
        match locate_namespace(cx, "x").await {
            Err(Error::NamespaceResolution { namespaces, .. }) => {
                assert_eq!(namespaces, vec!["team-a".to_owned(), "team-b".to_owned()]);
            }
            other => panic!("expected namespace resolution error, got {other:?}"),
        }
    }
}
