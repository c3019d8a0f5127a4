//! Defines the record describing one operator known to the alias registry.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of an OLM subscription, also the package the operator is installed from.
pub type SubscriptionName = String;

/// Describes how a short alias maps onto an operator managed through OLM.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperatorInfo {
    /// User facing spellings of the operator, the first one is the primary alias.
    pub aliases: Vec<String>,
    /// Name of the subscription declared by the manifest.
    pub subscription: SubscriptionName,
    /// Namespace slug used to build the canonical identifier.
    ///
    /// This is a naming convention only, the namespace the operator actually runs in is always
    /// discovered from the cluster.
    pub namespace: String,
    /// Manifest file name, relative to the operators directory.
    pub manifest: String,
}

impl OperatorInfo {
    /// Report the primary alias of the operator.
    pub fn primary_alias(&self) -> &str {
        self.aliases
            .first()
            .map(String::as_str)
            .unwrap_or(self.subscription.as_str())
    }

    /// Report whether the given spelling names this operator.
    ///
    /// The input is expected to already be normalized to lower case.
    pub fn answers_to(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias))
    }
}

/// Top level document of a registry file.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    /// All operators known to the registry.
    pub operators: Vec<OperatorInfo>,
}
