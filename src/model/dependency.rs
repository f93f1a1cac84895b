//! Dependency declarations and exclusion rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identity of one bucket within one project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketRef {
    pub project: String,
    pub bucket: String,
}

impl BucketRef {
    pub fn new(project: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            bucket: bucket.into(),
        }
    }
}

impl fmt::Display for BucketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.bucket)
    }
}

/// Excludes a group, or a single module of a group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExcludeRule {
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl ExcludeRule {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            module: None,
        }
    }

    pub fn module(group: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            module: Some(module.into()),
        }
    }

    /// A blank module qualifier matches the whole group
    pub fn matches(&self, group: Option<&str>, name: &str) -> bool {
        let group_matches = group == Some(self.group.as_str());
        match self.module.as_deref().map(str::trim) {
            None | Some("") => group_matches,
            Some(module) => group_matches && name == module,
        }
    }
}

/// Source dependency on another module of the build
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDependency {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<ExcludeRule>,
}

impl ModuleDependency {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            group: None,
            excludes: Vec::new(),
        }
    }

    /// Last segment of the path, `login` for `:feature:login`
    pub fn name(&self) -> &str {
        self.path.rsplit(':').next().unwrap_or(&self.path)
    }
}

/// Named binary artifact, either a flat-directory artifact or an external coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactDependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<ExcludeRule>,
}

impl ArtifactDependency {
    /// A flat-directory artifact referenced by name and extension
    pub fn named(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into(),
            version: None,
            extension: Some(extension.into()),
            excludes: Vec::new(),
        }
    }

    /// An external `group:name:version` coordinate
    pub fn coordinate(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: Some(group.into()),
            name: name.into(),
            version: Some(version.into()),
            extension: None,
            excludes: Vec::new(),
        }
    }
}

/// Ad-hoc local files
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDependency {
    pub files: Vec<PathBuf>,
}

impl FileDependency {
    pub fn single(file: impl Into<PathBuf>) -> Self {
        Self {
            files: vec![file.into()],
        }
    }
}

/// One declaration in a bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dependency {
    Module(ModuleDependency),
    Artifact(ArtifactDependency),
    Files(FileDependency),
}

impl Dependency {
    pub fn module(path: impl Into<String>) -> Self {
        Self::Module(ModuleDependency::new(path))
    }

    pub fn named_artifact(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self::Artifact(ArtifactDependency::named(name, extension))
    }

    pub fn coordinate(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::Artifact(ArtifactDependency::coordinate(group, name, version))
    }

    pub fn file(file: impl Into<PathBuf>) -> Self {
        Self::Files(FileDependency::single(file))
    }

    /// Target module path when this is a source dependency
    pub fn module_path(&self) -> Option<&str> {
        match self {
            Self::Module(module) => Some(&module.path),
            _ => None,
        }
    }

    /// `(group, name)` for declarations exclusion rules can address
    pub fn coordinates(&self) -> Option<(Option<&str>, &str)> {
        match self {
            Self::Module(module) => Some((module.group.as_deref(), module.name())),
            Self::Artifact(artifact) => Some((artifact.group.as_deref(), &artifact.name)),
            Self::Files(_) => None,
        }
    }

    /// Whether both declarations point at the same thing, whatever
    /// exclusions each carries
    pub fn same_target(&self, other: &Dependency) -> bool {
        match (self, other) {
            (Self::Module(a), Self::Module(b)) => a.path == b.path,
            (Self::Artifact(a), Self::Artifact(b)) => {
                a.group == b.group
                    && a.name == b.name
                    && a.version == b.version
                    && a.extension == b.extension
            }
            (Self::Files(a), Self::Files(b)) => a == b,
            _ => false,
        }
    }

    /// Whether any of `rules` excludes this declaration
    pub fn is_excluded_by(&self, rules: &[ExcludeRule]) -> bool {
        match self.coordinates() {
            Some((group, name)) => rules.iter().any(|rule| rule.matches(group, name)),
            None => false,
        }
    }

    /// Attach an exclusion rule unless an equal one is already attached.
    /// File declarations carry no exclusions.
    pub fn add_exclude(&mut self, rule: &ExcludeRule) {
        let excludes = match self {
            Self::Module(module) => &mut module.excludes,
            Self::Artifact(artifact) => &mut artifact.excludes,
            Self::Files(_) => return,
        };
        if !excludes.contains(rule) {
            excludes.push(rule.clone());
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(module) => write!(f, "project('{}')", module.path),
            Self::Artifact(artifact) => {
                if let Some(group) = &artifact.group {
                    write!(f, "{}:", group)?;
                }
                write!(f, "{}", artifact.name)?;
                if let Some(version) = &artifact.version {
                    write!(f, ":{}", version)?;
                }
                if let Some(extension) = &artifact.extension {
                    write!(f, "@{}", extension)?;
                }
                Ok(())
            }
            Self::Files(files) => {
                let names: Vec<String> = files
                    .files
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                write!(f, "files({})", names.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_rule_matches_any_module() {
        let rule = ExcludeRule::group("org.jetbrains.kotlin");
        assert!(rule.matches(Some("org.jetbrains.kotlin"), "kotlin-stdlib"));
        assert!(!rule.matches(Some("com.squareup"), "kotlin-stdlib"));
        assert!(!rule.matches(None, "kotlin-stdlib"));
    }

    #[test]
    fn blank_module_qualifier_is_group_only() {
        let rule = ExcludeRule::module("com.lizhi", "  ");
        assert!(rule.matches(Some("com.lizhi"), "anything"));
    }

    #[test]
    fn module_rule_needs_both() {
        let rule = ExcludeRule::module("com.lizhi", "http");
        assert!(rule.matches(Some("com.lizhi"), "http"));
        assert!(!rule.matches(Some("com.lizhi"), "itnet"));
    }

    #[test]
    fn any_rule_excludes() {
        let rules = vec![
            ExcludeRule::group("com.other"),
            ExcludeRule::module("com.squareup", "okhttp"),
        ];
        let dep = Dependency::coordinate("com.squareup", "okhttp", "4.12.0");
        assert!(dep.is_excluded_by(&rules));
        assert!(!Dependency::file("libs/x.aar").is_excluded_by(&rules));
    }

    #[test]
    fn same_target_ignores_exclusions() {
        let plain = Dependency::coordinate("com.squareup", "okhttp", "4.12.0");
        let mut excluded = plain.clone();
        excluded.add_exclude(&ExcludeRule::group("androidx"));

        assert_ne!(plain, excluded);
        assert!(plain.same_target(&excluded));
        assert!(!plain.same_target(&Dependency::coordinate("com.squareup", "okhttp", "5.0.0")));
        assert!(!Dependency::module(":okhttp").same_target(&plain));
    }

    #[test]
    fn add_exclude_dedups() {
        let mut dep = Dependency::coordinate("com.squareup", "okhttp", "4.12.0");
        let rule = ExcludeRule::group("org.jetbrains.kotlin");
        dep.add_exclude(&rule);
        dep.add_exclude(&rule);
        match dep {
            Dependency::Artifact(artifact) => assert_eq!(artifact.excludes.len(), 1),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn module_name_is_last_segment() {
        assert_eq!(ModuleDependency::new(":feature:login").name(), "login");
        assert_eq!(Dependency::module(":core").module_path(), Some(":core"));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Dependency::module(":core").to_string(), "project(':core')");
        assert_eq!(
            Dependency::named_artifact("_core", "aar").to_string(),
            "_core@aar"
        );
        assert_eq!(
            Dependency::coordinate("com.squareup", "okhttp", "4.12.0").to_string(),
            "com.squareup:okhttp:4.12.0"
        );
    }

    #[test]
    fn tagged_serialization() {
        let json = serde_json::to_string(&Dependency::module(":core")).unwrap();
        assert_eq!(json, r#"{"kind":"module","path":":core"}"#);
    }
}
