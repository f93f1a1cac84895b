//! Host project model
//!
//! The rewrite never owns projects or their dependency buckets. It reads and
//! mutates them through [`ProjectModel`], which a host build integration
//! implements. [`Workspace`] is an in-memory implementation loaded from a
//! manifest file.

mod dependency;
pub mod workspace;

pub use dependency::{
    ArtifactDependency, BucketRef, Dependency, ExcludeRule, FileDependency, ModuleDependency,
};
pub use workspace::Workspace;

use crate::error::ModswapResult;
use std::path::PathBuf;

/// Access to the host's projects and their dependency buckets
///
/// Project identifiers are path-like (`:app`, `:feature:login`). Lookups of
/// unknown projects or buckets return empty results rather than errors.
pub trait ProjectModel {
    /// The top-level consuming project
    fn root(&self) -> &str;

    /// Every project in the build, root included
    fn projects(&self) -> Vec<String>;

    /// Whether a module identifier resolves to a project
    fn contains(&self, project: &str) -> bool;

    /// Source directory of a project
    fn project_dir(&self, project: &str) -> Option<PathBuf>;

    /// Names of the buckets a project declares
    fn buckets(&self, project: &str) -> Vec<String>;

    /// Whether `project` declares a bucket named exactly `bucket`
    fn has_bucket(&self, project: &str, bucket: &str) -> bool {
        self.buckets(project).iter().any(|name| name == bucket)
    }

    /// Declarations of one bucket, in declaration order
    fn dependencies(&self, project: &str, bucket: &str) -> Vec<Dependency>;

    /// Exclusion rules attached to one bucket
    fn exclude_rules(&self, project: &str, bucket: &str) -> Vec<ExcludeRule>;

    /// Files a local-file declaration resolves to
    fn resolve_files(&self, project: &str, dependency: &FileDependency) -> Vec<PathBuf>;

    /// Authorize mutation of a bucket the host has already resolved
    fn permit_mutation(&mut self, project: &str, bucket: &str) -> ModswapResult<()>;

    /// Append a declaration; returns false when an equal one is already present
    fn add_dependency(
        &mut self,
        project: &str,
        bucket: &str,
        dependency: Dependency,
    ) -> ModswapResult<bool>;

    /// Remove a declaration; returns false when it was not present
    fn remove_dependency(
        &mut self,
        project: &str,
        bucket: &str,
        dependency: &Dependency,
    ) -> ModswapResult<bool>;
}
