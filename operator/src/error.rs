use std::path::PathBuf;

/// Errors produced while resolving and managing an operator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The alias is not registered under any spelling.
    #[error("unknown operator alias {alias:?}, valid aliases are: {}", .valid.join(", "))]
    UnknownAlias {
        /// Alias as typed by the user.
        alias: String,
        /// Every registered spelling.
        valid: Vec<String>,
    },
    /// The registry table is not injective or otherwise unusable.
    #[error("invalid operator registry: {reason}")]
    InvalidRegistry {
        /// What makes the table unusable.
        reason: String,
    },
    /// The manifest reference does not point at an existing file.
    #[error("manifest not found: {}", .path.display())]
    ManifestNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// The manifest could not be parsed or lacks a Subscription.
    #[error("malformed manifest {}: {reason}", .path.display())]
    MalformedManifest {
        /// Manifest that failed to parse.
        path: PathBuf,
        /// Parse or validation failure.
        reason: String,
    },
    /// Zero or several subscriptions carry the requested name.
    #[error("{}", namespace_resolution_message(.subscription, .namespaces))]
    NamespaceResolution {
        /// Subscription name that was searched for.
        subscription: String,
        /// Namespaces holding a subscription of that name, sorted.
        namespaces: Vec<String>,
    },
    /// The cluster cannot be reached or does not serve the OLM API.
    #[error("prerequisite missing: {reason}")]
    PrerequisiteMissing {
        /// Which prerequisite failed and why.
        reason: String,
    },
    /// A request to the API server failed.
    #[error("Kube error: {source}")]
    Kube {
        /// Error reported by the kube client.
        #[from]
        source: kube::Error,
    },
}

fn namespace_resolution_message(subscription: &str, namespaces: &[String]) -> String {
    if namespaces.is_empty() {
        format!("subscription {subscription:?} was not found in any namespace")
    } else {
        format!(
            "subscription {subscription:?} is ambiguous, found in namespaces: {}",
            namespaces.join(", ")
        )
    }
}
