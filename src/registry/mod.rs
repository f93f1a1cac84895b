//! Module registry
//!
//! One [`ModuleNode`] per configured module, owned by the registry and
//! addressed by module path. Validity starts `Unknown` and is settled once
//! per session by [`probe`]; after that the rewrite only reads it.

pub mod probe;

use crate::cache::Fingerprint;
use crate::config::{Config, ModuleConfig};
use crate::model::{Dependency, ProjectModel};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use probe::{probe, ProbeOutcome};

/// Cache validity of a module's artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    /// Not probed yet
    #[default]
    Unknown,
    /// Artifact present and sources unchanged
    Valid,
    /// Module must be rebuilt from source
    Invalid,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// One module participating in substitution
#[derive(Debug, Clone)]
pub struct ModuleNode {
    path: String,
    source_dir: PathBuf,
    enabled: bool,
    use_debug: bool,
    flavor: String,
    artifact_name: String,
    artifact_extension: String,
    artifact_file: PathBuf,
    validity: Validity,
    fingerprint: Option<Fingerprint>,
    referenced: bool,
    dependents: BTreeSet<String>,
}

impl ModuleNode {
    fn new(
        config: &ModuleConfig,
        source_dir: PathBuf,
        artifacts_dir: &Path,
        extension: &str,
    ) -> Self {
        let artifact_name = config.artifact_name(extension);
        Self {
            path: config.path.clone(),
            source_dir,
            enabled: config.enable,
            use_debug: config.use_debug,
            flavor: config.flavor.trim().to_string(),
            artifact_file: artifacts_dir.join(&artifact_name),
            artifact_name,
            artifact_extension: extension.to_string(),
            validity: Validity::Unknown,
            fingerprint: None,
            referenced: false,
            dependents: BTreeSet::new(),
        }
    }

    /// Module path, also the cache-store key
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn use_debug(&self) -> bool {
        self.use_debug
    }

    /// Product flavor, empty when the module has none
    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    /// Cached artifact file name, e.g. `_core.aar`
    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    /// Where the cached artifact lives
    pub fn artifact_file(&self) -> &Path {
        &self.artifact_file
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    /// True only once probing found the artifact usable
    pub fn cache_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    /// Fingerprint computed while probing, if any
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    /// Whether some consumer reached this module during the rewrite
    pub fn referenced(&self) -> bool {
        self.referenced
    }

    /// Projects that declared a source dependency on this module
    pub fn dependents(&self) -> impl Iterator<Item = &str> {
        self.dependents.iter().map(String::as_str)
    }

    /// Variant whose artifact is eligible for substitution
    ///
    /// `debug`/`release` without a flavor, `tiyaDebug`/`tiyaRelease` with one.
    pub fn variant(&self) -> String {
        let build_type = if self.use_debug { "debug" } else { "release" };
        if self.flavor.is_empty() {
            return build_type.to_string();
        }
        format!("{}{}", self.flavor, capitalize(build_type))
    }

    /// Declaration that replaces a source dependency on this module
    pub fn artifact_dependency(&self) -> Dependency {
        let suffix = format!(".{}", self.artifact_extension);
        let name = self
            .artifact_name
            .strip_suffix(&suffix)
            .unwrap_or(&self.artifact_name);
        Dependency::named_artifact(name, &self.artifact_extension)
    }
}

/// `api` -> `Api`
pub(crate) fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// All module nodes of one session
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    nodes: BTreeMap<String, ModuleNode>,
}

impl ModuleRegistry {
    /// Build one node per configured module that resolves to a project
    ///
    /// Modules the model does not know are skipped with a warning.
    pub fn populate<M: ProjectModel + ?Sized>(
        config: &Config,
        model: &M,
        artifacts_dir: &Path,
    ) -> Self {
        let extension = &config.substitution.artifact_extension;
        let mut nodes = BTreeMap::new();

        for module in &config.modules {
            let Some(source_dir) = model.project_dir(&module.path) else {
                warn!("Module {} is not a project of this build, skipping", module.path);
                continue;
            };
            if nodes.contains_key(&module.path) {
                warn!("Module {} configured twice, keeping the first entry", module.path);
                continue;
            }
            let node = ModuleNode::new(module, source_dir, artifacts_dir, extension);
            debug!(
                "Registered {} (artifact {}, variant {})",
                node.path,
                node.artifact_name,
                node.variant()
            );
            nodes.insert(module.path.clone(), node);
        }

        Self { nodes }
    }

    /// Look up any node, enabled or not
    pub fn get(&self, path: &str) -> Option<&ModuleNode> {
        self.nodes.get(path)
    }

    /// Look up a node that participates in substitution
    pub fn enabled(&self, path: &str) -> Option<&ModuleNode> {
        self.nodes.get(path).filter(|node| node.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether every node has a settled validity
    pub fn is_probed(&self) -> bool {
        self.nodes
            .values()
            .all(|node| node.validity != Validity::Unknown)
    }

    /// Enabled nodes whose artifact must be rebuilt
    pub fn invalid(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes
            .values()
            .filter(|node| node.enabled && node.validity == Validity::Invalid)
    }

    pub(crate) fn settle(
        &mut self,
        path: &str,
        validity: Validity,
        fingerprint: Option<Fingerprint>,
    ) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.validity = validity;
            if fingerprint.is_some() {
                node.fingerprint = fingerprint;
            }
        }
    }

    /// Record that `consumer` depends on `path` from source
    pub(crate) fn mark_referenced(&mut self, path: &str, consumer: &str) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.referenced = true;
            node.dependents.insert(consumer.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Workspace;

    fn workspace() -> Workspace {
        let mut ws = Workspace::new(":app", "/work");
        ws.add_project(":app", "app");
        ws.add_project(":core", "core");
        ws.add_project(":feature:login", "feature/login");
        ws
    }

    fn config(modules: Vec<ModuleConfig>) -> Config {
        Config {
            modules,
            ..Config::default()
        }
    }

    #[test]
    fn populate_skips_unknown_projects() {
        let cfg = config(vec![ModuleConfig::new(":core"), ModuleConfig::new(":ghost")]);
        let registry = ModuleRegistry::populate(&cfg, &workspace(), Path::new("/out"));

        assert_eq!(registry.len(), 1);
        let core = registry.get(":core").unwrap();
        assert_eq!(core.source_dir(), Path::new("/work/core"));
        assert_eq!(core.artifact_file(), Path::new("/out/_core.aar"));
        assert_eq!(core.validity(), Validity::Unknown);
        assert!(!registry.is_probed());
    }

    #[test]
    fn disabled_nodes_are_not_enabled() {
        let mut login = ModuleConfig::new(":feature:login");
        login.enable = false;
        let cfg = config(vec![login]);
        let registry = ModuleRegistry::populate(&cfg, &workspace(), Path::new("/out"));

        assert!(registry.get(":feature:login").is_some());
        assert!(registry.enabled(":feature:login").is_none());
    }

    #[test]
    fn variant_names() {
        let mut module = ModuleConfig::new(":core");
        let node = ModuleNode::new(&module, PathBuf::from("core"), Path::new("/out"), "aar");
        assert_eq!(node.variant(), "debug");

        module.flavor = "tiya".to_string();
        module.use_debug = false;
        let node = ModuleNode::new(&module, PathBuf::from("core"), Path::new("/out"), "aar");
        assert_eq!(node.variant(), "tiyaRelease");
    }

    #[test]
    fn artifact_dependency_drops_extension() {
        let module = ModuleConfig::new(":feature:login");
        let node = ModuleNode::new(&module, PathBuf::from("l"), Path::new("/out"), "aar");
        assert_eq!(
            node.artifact_dependency(),
            Dependency::named_artifact("_featurelogin", "aar")
        );
    }

    #[test]
    fn mark_referenced_tracks_dependents() {
        let cfg = config(vec![ModuleConfig::new(":core")]);
        let mut registry = ModuleRegistry::populate(&cfg, &workspace(), Path::new("/out"));
        registry.mark_referenced(":core", ":app");
        registry.mark_referenced(":core", ":feature:login");

        let core = registry.get(":core").unwrap();
        assert!(core.referenced());
        assert_eq!(core.dependents().collect::<Vec<_>>(), vec![":app", ":feature:login"]);
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("runtimeOnly"), "RuntimeOnly");
        assert_eq!(capitalize(""), "");
    }
}
