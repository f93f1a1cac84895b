//! Local binary files re-declared as named artifacts
//!
//! A bare file declaration changes whenever the file moves, which churns
//! every consumer it leaks into. Single artifact files are copied into the
//! shared third-party directory and the declaration becomes `name@ext`,
//! which resolves from there in any project.

use super::{MutationPermits, NormalizedFile, RewriteReport, RewriteSettings};
use crate::error::{ModswapError, ModswapResult};
use crate::model::{Dependency, FileDependency, ProjectModel};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Normalize every single-artifact file declaration in every project
pub fn normalize_local_files<M: ProjectModel + ?Sized>(
    model: &mut M,
    permits: &mut MutationPermits,
    settings: &RewriteSettings,
    report: &mut RewriteReport,
) {
    for project in model.projects() {
        for bucket in model.buckets(&project) {
            if !settings.is_substitutable(&bucket) {
                continue;
            }
            for dependency in model.dependencies(&project, &bucket) {
                let Dependency::Files(files) = &dependency else {
                    continue;
                };
                let Some(file) = single_artifact(model, &project, files, settings) else {
                    continue;
                };

                match normalize_one(model, permits, settings, &project, &bucket, &dependency, &file) {
                    Ok(Some((artifact, mutations))) => {
                        report.mutations += mutations;
                        report.normalized.push(NormalizedFile {
                            project: project.clone(),
                            bucket: bucket.clone(),
                            file,
                            artifact,
                        });
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Keeping {} in {}:{}: {}", dependency, project, bucket, e);
                        report.abandon(&project, &bucket, format!("normalize {}", dependency), &e);
                    }
                }
            }
        }
    }
}

fn single_artifact<M: ProjectModel + ?Sized>(
    model: &M,
    project: &str,
    files: &FileDependency,
    settings: &RewriteSettings,
) -> Option<PathBuf> {
    let resolved = model.resolve_files(project, files);
    let [file] = resolved.as_slice() else {
        return None;
    };
    let matches = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(&settings.artifact_extension));
    matches.then(|| file.clone())
}

/// Returns the new declaration and how many declarations changed, or
/// `None` when the declaration was already gone.
fn normalize_one<M: ProjectModel + ?Sized>(
    model: &mut M,
    permits: &mut MutationPermits,
    settings: &RewriteSettings,
    project: &str,
    bucket: &str,
    dependency: &Dependency,
    file: &Path,
) -> ModswapResult<Option<(String, usize)>> {
    let (Some(file_name), Some(stem)) = (file.file_name(), file.file_stem()) else {
        return Err(ModswapError::User(format!(
            "{} has no file name",
            file.display()
        )));
    };
    let stem = stem.to_string_lossy().into_owned();

    let target = settings.third_party_dir.join(file_name);
    if !target.exists() {
        fs::create_dir_all(&settings.third_party_dir).map_err(|e| {
            ModswapError::io(
                format!("creating {}", settings.third_party_dir.display()),
                e,
            )
        })?;
        fs::copy(file, &target).map_err(|e| {
            ModswapError::io(format!("copying {} to {}", file.display(), target.display()), e)
        })?;
        debug!("Copied {} to {}", file.display(), target.display());
    }

    permits.ensure(model, project, bucket)?;
    if !model.remove_dependency(project, bucket, dependency)? {
        return Ok(None);
    }
    let replacement = Dependency::named_artifact(stem, &settings.artifact_extension);
    let label = replacement.to_string();
    let added = match model.add_dependency(project, bucket, replacement) {
        Ok(added) => added,
        Err(e) => {
            if let Err(restore) = model.add_dependency(project, bucket, dependency.clone()) {
                error!(
                    "Could not restore {} in {}:{}: {}",
                    dependency, project, bucket, restore
                );
            }
            return Err(e);
        }
    };
    info!("Normalized {} in {}:{} to {}", file.display(), project, bucket, label);
    Ok(Some((label, 1 + added as usize)))
}
