//! In-memory project model loaded from a workspace manifest
//!
//! The manifest is TOML or JSON (picked by file extension):
//!
//! ```toml
//! root = ":app"
//!
//! [projects.":app"]
//! dir = "app"
//!
//! [projects.":app".buckets.implementation]
//! dependencies = [{ kind = "module", path = ":core" }]
//! excludes = [{ group = "org.jetbrains.kotlin", module = "kotlin-stdlib-jre7" }]
//! ```
//!
//! A bucket marked `resolved` rejects mutation until it has been permitted;
//! a `sealed` bucket rejects mutation even then.

use super::{Dependency, ExcludeRule, FileDependency, ProjectModel};
use crate::error::{ModswapError, ModswapResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A whole build: a root project plus every other project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Top-level consuming project
    pub root: String,

    /// Projects keyed by path
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,

    /// Directory project dirs are relative to
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One project and its dependency buckets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    /// Source directory, relative to the manifest
    pub dir: PathBuf,

    /// Buckets keyed by name (`api`, `debugImplementation`, ...)
    #[serde(default)]
    pub buckets: BTreeMap<String, Bucket>,
}

/// A named list of declarations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<ExcludeRule>,

    /// Already resolved by the host; needs permission before mutation
    #[serde(default, skip_serializing_if = "is_false")]
    pub resolved: bool,

    /// The host refuses mutation outright
    #[serde(default, skip_serializing_if = "is_false")]
    pub sealed: bool,

    #[serde(skip)]
    permitted: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Bucket {
    fn check_mutable(&self, project: &str, bucket: &str) -> ModswapResult<()> {
        if self.sealed {
            return Err(ModswapError::mutation_rejected(
                project,
                bucket,
                "bucket is sealed by the host",
            ));
        }
        if self.resolved && !self.permitted {
            return Err(ModswapError::mutation_rejected(
                project,
                bucket,
                "bucket was already resolved and mutation was not permitted",
            ));
        }
        Ok(())
    }
}

impl Workspace {
    /// Create an empty workspace rooted at `root`
    pub fn new(root: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            projects: BTreeMap::new(),
            base_dir: base_dir.into(),
        }
    }

    /// Load a manifest; project dirs resolve against its parent directory,
    /// made absolute
    pub fn load(path: &Path) -> ModswapResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModswapError::io(format!("reading workspace {}", path.display()), e))?;

        let mut workspace: Workspace = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| ModswapError::WorkspaceInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ModswapError::WorkspaceInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        if !workspace.projects.contains_key(&workspace.root) {
            return Err(ModswapError::WorkspaceInvalid {
                path: path.to_path_buf(),
                reason: format!("root project '{}' is not declared", workspace.root),
            });
        }

        let parent = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        workspace.base_dir = std::path::absolute(parent)
            .map_err(|e| ModswapError::io(format!("resolving {}", parent.display()), e))?;
        debug!(
            "Loaded workspace {} with {} project(s)",
            path.display(),
            workspace.projects.len()
        );
        Ok(workspace)
    }

    /// Write the manifest back out, TOML or JSON by extension
    pub fn save(&self, path: &Path) -> ModswapResult<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };
        std::fs::write(path, content)
            .map_err(|e| ModswapError::io(format!("writing workspace {}", path.display()), e))
    }

    /// Directory project dirs are relative to
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Add a project (replacing any previous one with that path)
    pub fn add_project(&mut self, path: impl Into<String>, dir: impl Into<PathBuf>) -> &mut Project {
        let path = path.into();
        self.projects.insert(
            path.clone(),
            Project {
                dir: dir.into(),
                buckets: BTreeMap::new(),
            },
        );
        self.projects.entry(path).or_default()
    }

    /// Get a project
    pub fn project(&self, path: &str) -> Option<&Project> {
        self.projects.get(path)
    }

    /// Get a bucket, creating it (and the project entry) when missing
    pub fn bucket_mut(&mut self, project: &str, bucket: &str) -> &mut Bucket {
        self.projects
            .entry(project.to_string())
            .or_default()
            .buckets
            .entry(bucket.to_string())
            .or_default()
    }

    /// Declare a dependency directly, bypassing mutation checks
    pub fn declare(&mut self, project: &str, bucket: &str, dependency: Dependency) {
        let bucket = self.bucket_mut(project, bucket);
        if !bucket.dependencies.contains(&dependency) {
            bucket.dependencies.push(dependency);
        }
    }

    /// Declarations of a bucket, empty if it does not exist
    pub fn declared(&self, project: &str, bucket: &str) -> &[Dependency] {
        self.projects
            .get(project)
            .and_then(|p| p.buckets.get(bucket))
            .map(|b| b.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Mark every bucket as resolved, as a host does after configuration
    pub fn mark_resolved(&mut self) {
        for project in self.projects.values_mut() {
            for bucket in project.buckets.values_mut() {
                bucket.resolved = true;
            }
        }
    }

    fn existing_bucket_mut(&mut self, project: &str, bucket: &str) -> ModswapResult<&mut Bucket> {
        self.projects
            .get_mut(project)
            .ok_or_else(|| ModswapError::ProjectNotFound(project.to_string()))?
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| ModswapError::BucketNotFound {
                project: project.to_string(),
                bucket: bucket.to_string(),
            })
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl ProjectModel for Workspace {
    fn root(&self) -> &str {
        &self.root
    }

    fn projects(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    fn contains(&self, project: &str) -> bool {
        self.projects.contains_key(project)
    }

    fn project_dir(&self, project: &str) -> Option<PathBuf> {
        self.projects
            .get(project)
            .map(|p| self.base_dir.join(&p.dir))
    }

    fn buckets(&self, project: &str) -> Vec<String> {
        self.projects
            .get(project)
            .map(|p| p.buckets.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn has_bucket(&self, project: &str, bucket: &str) -> bool {
        self.projects
            .get(project)
            .is_some_and(|p| p.buckets.contains_key(bucket))
    }

    fn dependencies(&self, project: &str, bucket: &str) -> Vec<Dependency> {
        self.declared(project, bucket).to_vec()
    }

    fn exclude_rules(&self, project: &str, bucket: &str) -> Vec<ExcludeRule> {
        self.projects
            .get(project)
            .and_then(|p| p.buckets.get(bucket))
            .map(|b| b.excludes.clone())
            .unwrap_or_default()
    }

    fn resolve_files(&self, project: &str, dependency: &FileDependency) -> Vec<PathBuf> {
        let dir = self
            .project_dir(project)
            .unwrap_or_else(|| self.base_dir.clone());
        dependency
            .files
            .iter()
            .map(|file| {
                if file.is_absolute() {
                    file.clone()
                } else {
                    dir.join(file)
                }
            })
            .collect()
    }

    fn permit_mutation(&mut self, project: &str, bucket: &str) -> ModswapResult<()> {
        let target = self.existing_bucket_mut(project, bucket)?;
        if target.sealed {
            return Err(ModswapError::mutation_rejected(
                project,
                bucket,
                "host refused to permit mutation",
            ));
        }
        target.permitted = true;
        Ok(())
    }

    fn add_dependency(
        &mut self,
        project: &str,
        bucket: &str,
        dependency: Dependency,
    ) -> ModswapResult<bool> {
        let target = self.existing_bucket_mut(project, bucket)?;
        target.check_mutable(project, bucket)?;
        if target.dependencies.contains(&dependency) {
            return Ok(false);
        }
        target.dependencies.push(dependency);
        Ok(true)
    }

    fn remove_dependency(
        &mut self,
        project: &str,
        bucket: &str,
        dependency: &Dependency,
    ) -> ModswapResult<bool> {
        let target = self.existing_bucket_mut(project, bucket)?;
        target.check_mutable(project, bucket)?;
        let before = target.dependencies.len();
        target.dependencies.retain(|d| d != dependency);
        Ok(target.dependencies.len() != before)
    }
}
