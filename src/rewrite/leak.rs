//! Leak-back: copying a module's declarations into its includer

use super::MutationPermits;
use crate::error::ModswapResult;
use crate::model::{BucketRef, Dependency, FileDependency, ProjectModel};
use tracing::debug;

/// Bucket name for `suffix` under a variant prefix
///
/// An empty prefix leaves the suffix alone; otherwise the suffix is
/// capitalized and appended (`debug` + `api` = `debugApi`).
pub fn prefixed_bucket(prefix: &str, suffix: &str) -> String {
    if prefix.trim().is_empty() {
        suffix.to_string()
    } else {
        format!("{}{}", prefix, crate::registry::capitalize(suffix))
    }
}

/// Variant prefixes a module's buckets are copied under
pub fn variant_prefixes(flavor: &str) -> Vec<String> {
    let mut prefixes = vec![String::new(), "debug".to_string(), "release".to_string()];
    let flavor = flavor.trim();
    if !flavor.is_empty() {
        prefixes.push(flavor.to_string());
        prefixes.push(format!("{}Debug", flavor));
        prefixes.push(format!("{}Release", flavor));
    }
    prefixes
}

/// Copy every declaration of `from` into `to`
///
/// Returns how many declarations were actually added. Nothing happens when
/// either project lacks a bucket of that exact name. A declaration excluded
/// by either bucket's rules is skipped; every other module or artifact
/// declaration arrives carrying both buckets' rules. A declaration whose
/// target `to` already declares is left alone, whatever rules the existing
/// one carries. File declarations are anchored to `from`'s directory so they
/// keep naming the same files from the includer.
pub fn copy_bucket<M: ProjectModel + ?Sized>(
    model: &mut M,
    permits: &mut MutationPermits,
    from: &BucketRef,
    to: &BucketRef,
) -> ModswapResult<usize> {
    if !model.has_bucket(&from.project, &from.bucket) || !model.has_bucket(&to.project, &to.bucket)
    {
        return Ok(0);
    }

    let source_rules = model.exclude_rules(&from.project, &from.bucket);
    let target_rules = model.exclude_rules(&to.project, &to.bucket);
    let mut present = model.dependencies(&to.project, &to.bucket);
    let mut added = 0;

    for dependency in model.dependencies(&from.project, &from.bucket) {
        if dependency.is_excluded_by(&source_rules) || dependency.is_excluded_by(&target_rules) {
            debug!("{} excluded, not copied from {} to {}", dependency, from, to);
            continue;
        }
        let mut dependency = anchored(&*model, &from.project, dependency);
        if present.iter().any(|existing| existing.same_target(&dependency)) {
            continue;
        }
        for rule in source_rules.iter().chain(target_rules.iter()) {
            dependency.add_exclude(rule);
        }

        permits.ensure(model, &to.project, &to.bucket)?;
        if model.add_dependency(&to.project, &to.bucket, dependency.clone())? {
            added += 1;
        }
        present.push(dependency);
    }

    Ok(added)
}

/// Resolve a file declaration's paths against its declaring project
fn anchored<M: ProjectModel + ?Sized>(
    model: &M,
    project: &str,
    dependency: Dependency,
) -> Dependency {
    match dependency {
        Dependency::Files(files) => Dependency::Files(FileDependency {
            files: model.resolve_files(project, &files),
        }),
        other => other,
    }
}
