//! Dependency graph rewrite
//!
//! Replaces source dependencies on cache-valid modules with references to
//! their cached artifacts, and copies ("leaks back") each substituted
//! module's own declarations into its includer so nothing transitive is
//! lost behind the opaque artifact.
//!
//! The rewrite is single-threaded and depth-first. Every mutation of a
//! bucket is preceded by a one-time [`MutationPermits::ensure`] for that
//! bucket.

mod graph;
pub mod leak;
pub mod normalize;

pub use graph::GraphRewriter;
pub use leak::copy_bucket;
pub use normalize::normalize_local_files;

use crate::config::Config;
use crate::error::ModswapResult;
use crate::model::{BucketRef, ProjectModel};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Buckets this session has already been allowed to mutate
#[derive(Debug, Default)]
pub struct MutationPermits {
    granted: HashSet<BucketRef>,
}

impl MutationPermits {
    /// Ask the host to permit mutation of a bucket, once per bucket
    ///
    /// A refused permission is not remembered, so a later call asks again.
    pub fn ensure<M: ProjectModel + ?Sized>(
        &mut self,
        model: &mut M,
        project: &str,
        bucket: &str,
    ) -> ModswapResult<()> {
        let key = BucketRef::new(project, bucket);
        if self.granted.contains(&key) {
            return Ok(());
        }
        model.permit_mutation(project, bucket)?;
        debug!("Mutation permitted for {}", key);
        self.granted.insert(key);
        Ok(())
    }

    pub fn is_granted(&self, project: &str, bucket: &str) -> bool {
        self.granted.contains(&BucketRef::new(project, bucket))
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }
}

/// Inputs the rewrite takes from configuration
#[derive(Debug, Clone)]
pub struct RewriteSettings {
    /// Bucket-name suffixes the rewrite operates on (`api`, `runtimeOnly`, `implementation`)
    pub bucket_suffixes: Vec<String>,
    /// Binary artifact extension without the dot
    pub artifact_extension: String,
    /// Shared directory normalized local files are copied into
    pub third_party_dir: PathBuf,
}

impl RewriteSettings {
    pub fn from_config(config: &Config, root_dir: &Path) -> Self {
        Self {
            bucket_suffixes: config.substitution.bucket_suffixes.clone(),
            artifact_extension: config.substitution.artifact_extension.clone(),
            third_party_dir: config.output.third_party_artifacts_dir(root_dir),
        }
    }

    /// Whether a bucket name ends with one of the suffixes, ignoring case
    pub fn is_substitutable(&self, bucket: &str) -> bool {
        let bucket = bucket.to_ascii_lowercase();
        self.bucket_suffixes
            .iter()
            .any(|suffix| bucket.ends_with(&suffix.to_ascii_lowercase()))
    }
}

/// A source dependency replaced by an artifact reference
#[derive(Debug, Clone, Serialize)]
pub struct Substitution {
    pub consumer: String,
    pub bucket: String,
    pub module: String,
    pub artifact: String,
}

/// Declarations copied from a module into its includer
#[derive(Debug, Clone, Serialize)]
pub struct LeakCopy {
    pub from: String,
    pub to: String,
    pub bucket: String,
    pub added: usize,
}

/// A local-file declaration re-declared as a named artifact
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedFile {
    pub project: String,
    pub bucket: String,
    pub file: PathBuf,
    pub artifact: String,
}

/// An operation skipped because the host or the file system refused it
#[derive(Debug, Clone, Serialize)]
pub struct Abandoned {
    pub project: String,
    pub bucket: String,
    pub operation: String,
    pub reason: String,
}

/// What one rewrite did
#[derive(Debug, Default, Serialize)]
pub struct RewriteReport {
    pub normalized: Vec<NormalizedFile>,
    pub substituted: Vec<Substitution>,
    pub leaked: Vec<LeakCopy>,
    pub abandoned: Vec<Abandoned>,
    /// Declarations added or removed across all buckets
    pub mutations: usize,
}

impl RewriteReport {
    pub(crate) fn abandon(
        &mut self,
        project: &str,
        bucket: &str,
        operation: impl Into<String>,
        reason: impl ToString,
    ) {
        self.abandoned.push(Abandoned {
            project: project.to_string(),
            bucket: bucket.to_string(),
            operation: operation.into(),
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, Workspace};

    #[test]
    fn substitutable_suffixes_ignore_case() {
        let settings = RewriteSettings::from_config(&Config::default(), Path::new("/w"));
        assert!(settings.is_substitutable("api"));
        assert!(settings.is_substitutable("debugApi"));
        assert!(settings.is_substitutable("tiyaReleaseImplementation"));
        assert!(settings.is_substitutable("RUNTIMEONLY"));
        assert!(!settings.is_substitutable("compileOnly"));
        assert!(!settings.is_substitutable("kapt"));
    }

    #[test]
    fn permits_are_memoized_per_bucket() {
        let mut ws = Workspace::new(":app", "/w");
        ws.declare(":app", "api", Dependency::module(":core"));
        ws.declare(":app", "implementation", Dependency::module(":util"));

        let mut permits = MutationPermits::default();
        permits.ensure(&mut ws, ":app", "api").unwrap();
        permits.ensure(&mut ws, ":app", "api").unwrap();
        assert_eq!(permits.len(), 1);
        assert!(permits.is_granted(":app", "api"));
        assert!(!permits.is_granted(":app", "implementation"));
    }

    #[test]
    fn refused_permit_is_not_remembered() {
        let mut ws = Workspace::new(":app", "/w");
        ws.bucket_mut(":app", "api").sealed = true;

        let mut permits = MutationPermits::default();
        assert!(permits.ensure(&mut ws, ":app", "api").is_err());
        assert!(permits.is_empty());
    }
}
