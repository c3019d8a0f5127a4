//! Locates operator manifests on disk and reads the resources they declare.
use std::path::{Path, PathBuf};

use kube::api::DynamicObject;
use serde::Deserialize;
use tracing::debug;

use crate::{registry::ManifestReference, Error};

/// Kind of the OLM resource that names the operator package to install.
pub const SUBSCRIPTION_KIND: &str = "Subscription";
/// Kind of the OLM resource that scopes the namespaces a subscription targets.
pub const OPERATOR_GROUP_KIND: &str = "OperatorGroup";

/// Finds manifest files below the operators directory.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    operators_dir: PathBuf,
}

impl ManifestResolver {
    /// Create a resolver rooted at the operators directory.
    pub fn new(operators_dir: impl Into<PathBuf>) -> Self {
        Self {
            operators_dir: operators_dir.into(),
        }
    }

    /// Resolve a registry manifest reference to an existing file.
    ///
    /// Relative references are looked up in the operators directory.
    pub fn resolve(&self, reference: &ManifestReference) -> Result<PathBuf, Error> {
        let path = Path::new(reference.as_str());
        if path.is_absolute() {
            existing_file(path.to_owned())
        } else {
            existing_file(self.operators_dir.join(path))
        }
    }

    /// Resolve a manifest given on the command line.
    ///
    /// The path is used as given, relative paths are taken from the working directory.
    pub fn resolve_override(&self, path: impl AsRef<Path>) -> Result<PathBuf, Error> {
        existing_file(path.as_ref().to_owned())
    }

    /// Read the subscription name declared by the manifest at `path`.
    pub fn extract_subscription_name(&self, path: impl AsRef<Path>) -> Result<String, Error> {
        Ok(Manifest::load(path)?.subscription_name()?.to_owned())
    }
}

fn existing_file(path: PathBuf) -> Result<PathBuf, Error> {
    debug!(path = %path.display(), "resolve manifest");
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::ManifestNotFound { path })
    }
}

/// The parsed resources of a manifest file.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    documents: Vec<DynamicObject>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::ManifestNotFound {
                path: path.to_owned(),
            },
            _ => Error::MalformedManifest {
                path: path.to_owned(),
                reason: err.to_string(),
            },
        })?;
        Self::parse(path, &text)
    }

    /// Parse multi document YAML, every document must be a named Kubernetes resource.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self, Error> {
        let path = path.into();
        let malformed = |reason: String| Error::MalformedManifest {
            path: path.clone(),
            reason,
        };

        let mut documents = Vec::new();
        for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|err| malformed(format!("document {index}: {err}")))?;
            // Skip empty documents between separators
            if value.is_null() {
                continue;
            }
            let object: DynamicObject = serde_yaml::from_value(value)
                .map_err(|err| malformed(format!("document {index}: {err}")))?;
            let Some(types) = &object.types else {
                return Err(malformed(format!(
                    "document {index} does not declare apiVersion and kind"
                )));
            };
            if object.metadata.name.is_none() {
                return Err(malformed(format!(
                    "document {index} ({}) does not declare metadata.name",
                    types.kind
                )));
            }
            documents.push(object);
        }
        if documents.is_empty() {
            return Err(malformed("no resources declared".to_owned()));
        }
        Ok(Self { path, documents })
    }

    /// Name of the first declared Subscription.
    pub fn subscription_name(&self) -> Result<&str, Error> {
        self.names_of_kind(SUBSCRIPTION_KIND)
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedManifest {
                path: self.path.clone(),
                reason: format!("no resource of kind {SUBSCRIPTION_KIND} declared"),
            })
    }

    /// Names of every declared resource of the given kind, in document order.
    pub fn names_of_kind(&self, kind: &str) -> Vec<&str> {
        self.documents
            .iter()
            .filter(|object| object.types.as_ref().is_some_and(|t| t.kind == kind))
            .filter_map(|object| object.metadata.name.as_deref())
            .collect()
    }

    /// All declared resources.
    pub fn documents(&self) -> &[DynamicObject] {
        &self.documents
    }

    /// Where the manifest was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::registry::AliasRegistry;

    const TEMPO: &str = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: openshift-tempo-operator
---
apiVersion: operators.coreos.com/v1
kind: OperatorGroup
metadata:
  name: openshift-tempo-operator
  namespace: openshift-tempo-operator
spec:
  upgradeStrategy: Default
---
apiVersion: operators.coreos.com/v1alpha1
kind: Subscription
metadata:
  name: tempo-product
  namespace: openshift-tempo-operator
spec:
  channel: stable
  name: tempo-product
  source: redhat-operators
  sourceNamespace: openshift-marketplace
"#;

    fn shipped_operators_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../operators")
    }

    #[test]
    fn extracts_subscription_name() {
        let manifest = Manifest::parse("tempo.yaml", TEMPO).expect("manifest should parse");
        assert_eq!(manifest.documents().len(), 3);
        assert_eq!(manifest.subscription_name().expect("subscription"), "tempo-product");
        assert_eq!(
            manifest.names_of_kind(OPERATOR_GROUP_KIND),
            vec!["openshift-tempo-operator"]
        );
    }

    #[test]
    fn subscription_name_is_independent_of_layout() {
        // Package name differs from the subscription name and appears first, with the kind
        // declared last and metadata in flow style.
        let text = r#"
# leading comment
spec: {name: some-package, channel: stable}
metadata: {namespace: ns, name: my-subscription}
apiVersion: operators.coreos.com/v1alpha1
kind: Subscription
"#;
        let manifest = Manifest::parse("x.yaml", text).expect("manifest should parse");
        assert_eq!(
            manifest.subscription_name().expect("subscription"),
            "my-subscription"
        );
    }

    #[test]
    fn missing_subscription_is_malformed() {
        let text = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: lonely
"#;
        let manifest = Manifest::parse("ns.yaml", text).expect("manifest should parse");
        let err = manifest.subscription_name().expect_err("no subscription");
        assert_eq!(
            err.to_string(),
            "malformed manifest ns.yaml: no resource of kind Subscription declared"
        );
    }

    #[test]
    fn rejects_unparsable_documents() {
        for text in [
            "kind: [unterminated",
            "---\n---\n",
            "kind: Subscription\nmetadata:\n  name: x\n",
            "apiVersion: v1\nkind: ConfigMap\nmetadata: {}\n",
        ] {
            assert!(
                matches!(
                    Manifest::parse("bad.yaml", text),
                    Err(Error::MalformedManifest { .. })
                ),
                "{text:?} should be malformed"
            );
        }
    }

    #[test]
    fn resolver_requires_existing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("tempo.yaml"), TEMPO).expect("write manifest");
        let resolver = ManifestResolver::new(dir.path());

        let path = resolver
            .resolve(&ManifestReference::from("tempo.yaml"))
            .expect("manifest exists");
        assert_eq!(path, dir.path().join("tempo.yaml"));
        assert_eq!(
            resolver
                .extract_subscription_name(&path)
                .expect("subscription"),
            "tempo-product"
        );

        match resolver.resolve(&ManifestReference::from("loki.yaml")) {
            Err(Error::ManifestNotFound { path }) => assert_eq!(path, dir.path().join("loki.yaml")),
            other => panic!("expected manifest not found, got {other:?}"),
        }
    }

    #[test]
    fn override_paths_ignore_operators_dir() {
        let operators = tempfile::tempdir().expect("temp dir");
        let name = "olmctl-only-in-operators-dir.yaml";
        std::fs::write(operators.path().join(name), TEMPO).expect("write manifest");
        let elsewhere = tempfile::tempdir().expect("temp dir");
        let custom = elsewhere.path().join("custom.yaml");
        std::fs::write(&custom, TEMPO).expect("write manifest");
        let resolver = ManifestResolver::new(operators.path());

        assert_eq!(
            resolver.resolve_override(&custom).expect("absolute path"),
            custom
        );
        // Registry references resolve under the operators directory, overrides do not
        assert!(resolver.resolve(&ManifestReference::from(name)).is_ok());
        match resolver.resolve_override(name) {
            Err(Error::ManifestNotFound { path }) => assert_eq!(path, Path::new(name)),
            other => panic!("expected manifest not found, got {other:?}"),
        }
    }

    #[test]
    fn shipped_manifests_match_registry() {
        let resolver = ManifestResolver::new(shipped_operators_dir());
        for info in AliasRegistry::builtin().entries() {
            let path = resolver
                .resolve(&ManifestReference::from(info.manifest.as_str()))
                .expect("shipped manifest should exist");
            assert_eq!(
                resolver
                    .extract_subscription_name(&path)
                    .expect("subscription"),
                info.subscription,
                "{}",
                info.manifest
            );
        }
    }
}
