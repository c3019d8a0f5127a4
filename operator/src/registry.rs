//! Registry mapping short operator aliases onto their cluster identity and manifest.
use std::{collections::BTreeSet, fmt, path::Path};

use olmctl_common::operator_info::{OperatorInfo, RegistryFile};

use crate::Error;

/// Name of the cluster scoped `Operator` resource OLM creates for an installed operator.
///
/// Built as `<subscription>.<namespace>`. The namespace segment is a lookup convention and must
/// never be used as the namespace the operator runs in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalOperatorId(String);

impl CanonicalOperatorId {
    /// Build the identifier from a subscription name and a namespace slug.
    pub fn new(subscription: &str, namespace: &str) -> Self {
        Self(format!("{subscription}.{namespace}"))
    }
    /// The identifier as used for the resource name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalOperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Manifest file name, relative to the operators directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManifestReference(String);

impl ManifestReference {
    /// The file name of the manifest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ManifestReference {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for ManifestReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data driven table of every operator the tool can manage.
#[derive(Debug, Clone)]
pub struct AliasRegistry {
    operators: Vec<OperatorInfo>,
}

impl AliasRegistry {
    /// Create a registry, rejecting tables that are not one to one.
    pub fn new(operators: Vec<OperatorInfo>) -> Result<Self, Error> {
        validate(&operators)?;
        Ok(Self { operators })
    }

    /// The registry compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            operators: builtin_operators(),
        }
    }

    /// Load a registry from a YAML file shaped like [`RegistryFile`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| Error::InvalidRegistry {
            reason: format!("{}: {err}", path.display()),
        })?;
        let file: RegistryFile =
            serde_yaml::from_str(&data).map_err(|err| Error::InvalidRegistry {
                reason: format!("{}: {err}", path.display()),
            })?;
        Self::new(file.operators)
    }

    /// Resolve an alias, or any of its synonyms, to the operator identity and manifest.
    pub fn resolve(&self, alias: &str) -> Result<(CanonicalOperatorId, ManifestReference), Error> {
        let normalized = alias.trim().to_ascii_lowercase();
        self.operators
            .iter()
            .find(|info| info.answers_to(&normalized))
            .map(|info| {
                (
                    canonical_id(info),
                    ManifestReference(info.manifest.clone()),
                )
            })
            .ok_or_else(|| Error::UnknownAlias {
                alias: alias.to_owned(),
                valid: self.aliases(),
            })
    }

    /// Every accepted spelling, in registry order.
    pub fn aliases(&self) -> Vec<String> {
        self.operators
            .iter()
            .flat_map(|info| info.aliases.iter().cloned())
            .collect()
    }

    /// All registered operators.
    pub fn entries(&self) -> &[OperatorInfo] {
        &self.operators
    }

    /// The registry as a serializable document.
    pub fn to_file(&self) -> RegistryFile {
        RegistryFile {
            operators: self.operators.clone(),
        }
    }
}

/// Report the canonical identifier of a registry entry.
pub fn canonical_id(info: &OperatorInfo) -> CanonicalOperatorId {
    CanonicalOperatorId::new(&info.subscription, &info.namespace)
}

fn validate(operators: &[OperatorInfo]) -> Result<(), Error> {
    let invalid = |reason: String| Err(Error::InvalidRegistry { reason });

    let mut aliases = BTreeSet::new();
    let mut ids = BTreeSet::new();
    let mut manifests = BTreeSet::new();
    for info in operators {
        if info.aliases.is_empty() {
            return invalid(format!("operator {} has no aliases", info.subscription));
        }
        if info.subscription.is_empty() || info.namespace.is_empty() || info.manifest.is_empty() {
            return invalid(format!(
                "operator {} must declare a subscription, namespace and manifest",
                info.primary_alias()
            ));
        }
        for alias in &info.aliases {
            if !aliases.insert(alias.to_ascii_lowercase()) {
                return invalid(format!("alias {alias} is registered more than once"));
            }
        }
        let id = canonical_id(info);
        if !ids.insert(id.clone()) {
            return invalid(format!("canonical id {id} is registered more than once"));
        }
        if !manifests.insert(info.manifest.as_str()) {
            return invalid(format!(
                "manifest {} is registered more than once",
                info.manifest
            ));
        }
    }
    Ok(())
}

fn entry(aliases: &[&str], subscription: &str, namespace: &str, manifest: &str) -> OperatorInfo {
    OperatorInfo {
        aliases: aliases.iter().map(|a| (*a).to_owned()).collect(),
        subscription: subscription.to_owned(),
        namespace: namespace.to_owned(),
        manifest: manifest.to_owned(),
    }
}

fn builtin_operators() -> Vec<OperatorInfo> {
    vec![
        entry(
            &["observability", "cluster-observability", "coo"],
            "cluster-observability-operator",
            "openshift-cluster-observability-operator",
            "cluster-observability.yaml",
        ),
        entry(
            &["otel", "opentelemetry"],
            "opentelemetry-product",
            "openshift-opentelemetry-operator",
            "opentelemetry.yaml",
        ),
        entry(
            &["tempo"],
            "tempo-product",
            "openshift-tempo-operator",
            "tempo.yaml",
        ),
        entry(
            &["logging", "cluster-logging"],
            "cluster-logging",
            "openshift-logging",
            "logging.yaml",
        ),
        entry(
            &["loki"],
            "loki-operator",
            "openshift-operators-redhat",
            "loki.yaml",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn builtin_registry_is_one_to_one() {
        AliasRegistry::new(builtin_operators()).expect("builtin registry should be valid");
    }

    #[test]
    fn otel_and_opentelemetry_resolve_identically() {
        let registry = AliasRegistry::builtin();
        let (id, manifest) = registry.resolve("otel").expect("otel should resolve");
        assert_eq!(
            id.as_str(),
            "opentelemetry-product.openshift-opentelemetry-operator"
        );
        assert_eq!(manifest.as_str(), "opentelemetry.yaml");
        assert_eq!(
            registry.resolve("opentelemetry").expect("should resolve"),
            (id, manifest)
        );
    }

    #[test]
    fn every_synonym_resolves_to_its_entry() {
        let registry = AliasRegistry::builtin();
        for info in registry.entries() {
            let expected = (
                canonical_id(info),
                ManifestReference::from(info.manifest.as_str()),
            );
            for alias in &info.aliases {
                assert_eq!(registry.resolve(alias).expect("alias"), expected);
                // Resolution is deterministic
                assert_eq!(registry.resolve(alias).expect("alias"), expected);
            }
        }
    }

    #[test]
    fn resolve_ignores_case_and_whitespace() {
        let registry = AliasRegistry::builtin();
        let (id, _) = registry.resolve("  Tempo ").expect("tempo should resolve");
        assert_eq!(id.as_str(), "tempo-product.openshift-tempo-operator");
    }

    #[test]
    fn unknown_alias_fails() {
        let registry = AliasRegistry::builtin();
        for alias in ["", "grafana", "otel2", "tempo-product"] {
            match registry.resolve(alias) {
                Err(Error::UnknownAlias { alias: a, valid }) => {
                    assert_eq!(a, alias);
                    assert!(valid.contains(&"otel".to_owned()));
                }
                other => panic!("expected unknown alias, got {other:?}"),
            }
        }
    }

    #[test]
    fn duplicate_alias_is_rejected() {
        let mut operators = builtin_operators();
        operators[2].aliases.push("OTEL".to_owned());
        assert!(matches!(
            AliasRegistry::new(operators),
            Err(Error::InvalidRegistry { .. })
        ));
    }

    #[test]
    fn shared_manifest_is_rejected() {
        let mut operators = builtin_operators();
        operators[1].manifest = "tempo.yaml".to_owned();
        let err = AliasRegistry::new(operators).expect_err("manifest is shared");
        assert_eq!(
            err.to_string(),
            "invalid operator registry: manifest tempo.yaml is registered more than once"
        );
    }

    #[test]
    fn shared_canonical_id_is_rejected() {
        let mut operators = builtin_operators();
        operators[3].subscription = "loki-operator".to_owned();
        operators[3].namespace = "openshift-operators-redhat".to_owned();
        assert!(matches!(
            AliasRegistry::new(operators),
            Err(Error::InvalidRegistry { .. })
        ));
    }

    #[test]
    fn loads_registry_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
operators:
  - aliases: [grafana, dashboards]
    subscription: grafana-operator
    namespace: grafana
    manifest: grafana.yaml
"#
        )
        .expect("write registry");

        let registry = AliasRegistry::from_file(file.path()).expect("registry should load");
        let (id, manifest) = registry.resolve("dashboards").expect("should resolve");
        assert_eq!(id.as_str(), "grafana-operator.grafana");
        assert_eq!(manifest.as_str(), "grafana.yaml");
        assert!(registry.resolve("otel").is_err());
    }

    #[test]
    fn unreadable_registry_file_is_invalid() {
        let err = AliasRegistry::from_file("/does/not/exist.yaml").expect_err("missing file");
        assert!(matches!(err, Error::InvalidRegistry { .. }));
    }
}
