use super::leak::{copy_bucket, prefixed_bucket, variant_prefixes};
use super::normalize::normalize_local_files;
use super::{LeakCopy, MutationPermits, RewriteReport, RewriteSettings, Substitution};
use crate::builder::ArtifactBuilder;
use crate::error::ModswapResult;
use crate::model::{BucketRef, Dependency, ProjectModel};
use crate::registry::ModuleRegistry;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Depth-first rewrite of one build's dependency graph
///
/// Holds the per-session state: granted mutation permits and the
/// `(project, includer)` edges already walked, so shared and cyclic
/// dependencies are processed once per edge.
pub struct GraphRewriter<'a, M: ProjectModel + ?Sized, B: ArtifactBuilder + ?Sized> {
    model: &'a mut M,
    registry: &'a mut ModuleRegistry,
    builder: &'a mut B,
    settings: &'a RewriteSettings,
    permits: MutationPermits,
    walked: HashSet<(String, String)>,
    report: RewriteReport,
}

impl<'a, M: ProjectModel + ?Sized, B: ArtifactBuilder + ?Sized> GraphRewriter<'a, M, B> {
    pub fn new(
        model: &'a mut M,
        registry: &'a mut ModuleRegistry,
        builder: &'a mut B,
        settings: &'a RewriteSettings,
    ) -> Self {
        Self {
            model,
            registry,
            builder,
            settings,
            permits: MutationPermits::default(),
            walked: HashSet::new(),
            report: RewriteReport::default(),
        }
    }

    /// Normalize local files, then rewrite everything reachable from the root
    pub fn rewrite(mut self) -> RewriteReport {
        let start = Instant::now();

        normalize_local_files(
            &mut *self.model,
            &mut self.permits,
            self.settings,
            &mut self.report,
        );

        let root = self.model.root().to_string();
        self.rewrite_from(&root, None);

        info!(
            "Rewrite: {} substituted, {} leak copies, {} normalized, {} abandoned in {:.2?}",
            self.report.substituted.len(),
            self.report.leaked.len(),
            self.report.normalized.len(),
            self.report.abandoned.len(),
            start.elapsed()
        );
        self.report
    }

    fn rewrite_from(&mut self, project: &str, includer: Option<&str>) {
        if let Some(includer) = includer {
            if !self
                .walked
                .insert((project.to_string(), includer.to_string()))
            {
                return;
            }
        }

        let root = self.model.root().to_string();
        let mut children: Vec<String> = Vec::new();

        for bucket in self.model.buckets(project) {
            for dependency in self.model.dependencies(project, &bucket) {
                let Some(target) = dependency.module_path() else {
                    continue;
                };
                if target == project {
                    debug!("Ignoring self-dependency of {} in {}", project, bucket);
                    continue;
                }
                self.substitute(project, &bucket, &dependency);
                if target != root && !children.iter().any(|child| child == target) {
                    children.push(target.to_string());
                }
            }
        }

        // Children first: their declarations must already have been copied
        // into this project when this project's own are copied upward.
        for child in &children {
            if self.model.contains(child) {
                self.rewrite_from(child, Some(project));
            } else {
                warn!("{} depends on unknown project {}, skipping", project, child);
            }
        }

        if let Some(includer) = includer {
            if self.should_leak(project, includer, &root) {
                self.leak(project, includer);
            }
        }
    }

    fn substitute(&mut self, consumer: &str, bucket: &str, dependency: &Dependency) {
        let Some(target) = dependency.module_path() else {
            return;
        };
        if target == consumer || self.registry.enabled(target).is_none() {
            return;
        }
        self.registry.mark_referenced(target, consumer);

        let Some(node) = self.registry.enabled(target) else {
            return;
        };
        if !node.cache_valid() {
            debug!("{} is not cached, keeping the source dependency in {}", target, consumer);
            self.builder.request_build(node);
            return;
        }

        let artifact = node.artifact_dependency();
        let label = artifact.to_string();
        match self.swap(consumer, bucket, dependency, artifact) {
            Ok(mutations) => {
                debug!("{}:{} now uses {} for {}", consumer, bucket, label, target);
                self.report.mutations += mutations;
                self.report.substituted.push(Substitution {
                    consumer: consumer.to_string(),
                    bucket: bucket.to_string(),
                    module: target.to_string(),
                    artifact: label,
                });
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!("Keeping {} in {}:{}: {}", dependency, consumer, bucket, e);
                } else {
                    error!("Substituting {} in {}:{} failed: {}", dependency, consumer, bucket, e);
                }
                self.report
                    .abandon(consumer, bucket, format!("substitute {}", dependency), &e);
            }
        }
    }

    fn swap(
        &mut self,
        consumer: &str,
        bucket: &str,
        source: &Dependency,
        artifact: Dependency,
    ) -> ModswapResult<usize> {
        self.permits.ensure(&mut *self.model, consumer, bucket)?;
        let removed = self.model.remove_dependency(consumer, bucket, source)?;
        match self.model.add_dependency(consumer, bucket, artifact) {
            Ok(added) => Ok(removed as usize + added as usize),
            Err(e) => {
                if removed {
                    if let Err(restore) =
                        self.model.add_dependency(consumer, bucket, source.clone())
                    {
                        error!(
                            "Could not restore {} in {}:{}: {}",
                            source, consumer, bucket, restore
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Whether `project`'s declarations are copied into `includer`
    ///
    /// Always for the root's direct dependencies. Otherwise when the
    /// project's artifact is used, or when a cached includer contains a
    /// project that is built from source.
    fn should_leak(&self, project: &str, includer: &str, root: &str) -> bool {
        if includer == root {
            return true;
        }
        match self.registry.enabled(project) {
            Some(node) if node.cache_valid() => true,
            Some(_) => self
                .registry
                .enabled(includer)
                .is_some_and(|node| node.cache_valid()),
            None => false,
        }
    }

    fn leak(&mut self, project: &str, includer: &str) {
        let flavor = self
            .registry
            .enabled(project)
            .map(|node| node.flavor().to_string())
            .unwrap_or_default();

        for prefix in variant_prefixes(&flavor) {
            for suffix in &self.settings.bucket_suffixes {
                let bucket = prefixed_bucket(&prefix, suffix);
                let from = BucketRef::new(project, &bucket);
                let to = BucketRef::new(includer, &bucket);
                match copy_bucket(&mut *self.model, &mut self.permits, &from, &to) {
                    Ok(0) => {}
                    Ok(added) => {
                        debug!("Copied {} declaration(s) from {} to {}", added, from, to);
                        self.report.mutations += added;
                        self.report.leaked.push(LeakCopy {
                            from: project.to_string(),
                            to: includer.to_string(),
                            bucket,
                            added,
                        });
                    }
                    Err(e) => {
                        if e.is_recoverable() {
                            warn!("Skipping copy from {} to {}: {}", from, to, e);
                        } else {
                            error!("Copy from {} to {} failed: {}", from, to, e);
                        }
                        self.report
                            .abandon(includer, &bucket, format!("copy from {}", project), &e);
                    }
                }
            }
        }
    }
}
