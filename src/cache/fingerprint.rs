//! Source-tree fingerprints for cache validity
//!
//! A fingerprint is the latest modification time found under a module's
//! directory, paired with a short digest of the file listing (relative path,
//! mtime, size) so that removing or renaming an older file also changes it.
//! Top-level build-output and tooling directories are skipped.

use super::store::CacheStore;
use crate::error::{ModswapError, ModswapResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Freshness of one source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    latest_modified_ms: u64,
    digest: String,
}

impl Fingerprint {
    /// Latest file modification time in milliseconds, 0 for an empty tree
    pub fn latest_modified_ms(&self) -> u64 {
        self.latest_modified_ms
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.latest_modified_ms, self.digest)
    }
}

/// Computes and compares fingerprints
///
/// Cheap to clone; probe workers each hold a copy.
#[derive(Debug, Clone)]
pub struct FingerprintOracle {
    exclude_dirs: Arc<[String]>,
}

impl FingerprintOracle {
    pub fn new<I, S>(exclude_dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude_dirs: exclude_dirs.into_iter().map(Into::into).collect(),
        }
    }

    fn is_excluded(&self, name: &std::ffi::OsStr) -> bool {
        self.exclude_dirs.iter().any(|dir| name == dir.as_str())
    }

    /// Scan `dir` and fingerprint it
    pub fn fingerprint(&self, module: &str, dir: &Path) -> ModswapResult<Fingerprint> {
        let unavailable = |reason: String| ModswapError::FingerprintUnavailable {
            module: module.to_string(),
            path: dir.to_path_buf(),
            reason,
        };

        if !dir.is_dir() {
            return Err(unavailable("not a directory".to_string()));
        }

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.depth() == 1
                    && entry.file_type().is_dir()
                    && self.is_excluded(entry.file_name()))
            });

        let mut hasher = Sha256::new();
        let mut latest = 0u64;
        let mut files = 0usize;

        for entry in walker {
            let entry = entry.map_err(|e| unavailable(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = entry.metadata().map_err(|e| unavailable(e.to_string()))?;
            let modified = metadata
                .modified()
                .map_err(|e| unavailable(e.to_string()))?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);

            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            hasher.update(modified.to_le_bytes());
            hasher.update(metadata.len().to_le_bytes());

            latest = latest.max(modified);
            files += 1;
        }

        let digest = hex::encode(&hasher.finalize()[..6]);
        debug!("{}: {} file(s), latest mtime {}", module, files, latest);
        Ok(Fingerprint {
            latest_modified_ms: latest,
            digest,
        })
    }

    /// Whether the cached artifact for a module may be used
    ///
    /// Without an artifact file the answer is always false. Otherwise the
    /// current fingerprint must equal the recorded one. A tree that cannot
    /// be scanned counts as changed.
    pub fn is_valid(
        &self,
        module: &str,
        dir: &Path,
        artifact: &Path,
        recorded: Option<&str>,
    ) -> bool {
        self.check(module, dir, artifact, recorded).0
    }

    /// Like [`is_valid`](Self::is_valid), also returning the fingerprint when one was computed
    pub(crate) fn check(
        &self,
        module: &str,
        dir: &Path,
        artifact: &Path,
        recorded: Option<&str>,
    ) -> (bool, Option<Fingerprint>) {
        if !artifact.is_file() {
            debug!("{}: no cached artifact at {}", module, artifact.display());
            return (false, None);
        }
        match self.fingerprint(module, dir) {
            Ok(current) => {
                let valid = recorded == Some(current.to_string().as_str());
                debug!(
                    "{}: fingerprint {} vs recorded {:?} -> {}",
                    module,
                    current,
                    recorded,
                    if valid { "valid" } else { "invalid" }
                );
                (valid, Some(current))
            }
            Err(e) => {
                warn!("{}; treating cache as invalid", e);
                (false, None)
            }
        }
    }

    /// Store the current fingerprint of a module
    pub fn record(
        &self,
        module: &str,
        dir: &Path,
        store: &mut dyn CacheStore,
    ) -> ModswapResult<Fingerprint> {
        let current = self.fingerprint(module, dir)?;
        store.set(module, current.to_string());
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn oracle() -> FingerprintOracle {
        FingerprintOracle::new(["build", ".gradle", ".cxx"])
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn module_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/main")).unwrap();
        fs::write(dir.path().join("src/main/Core.kt"), "class Core").unwrap();
        fs::write(dir.path().join("build.gradle"), "plugins {}").unwrap();
        set_mtime(&dir.path().join("src/main/Core.kt"), 1_000);
        set_mtime(&dir.path().join("build.gradle"), 2_000);
        dir
    }

    #[test]
    fn empty_tree_has_zero_timestamp() {
        let dir = TempDir::new().unwrap();
        let fp = oracle().fingerprint(":empty", dir.path()).unwrap();
        assert_eq!(fp.latest_modified_ms(), 0);
    }

    #[test]
    fn stable_for_unchanged_tree() {
        let dir = module_tree();
        let first = oracle().fingerprint(":core", dir.path()).unwrap();
        let second = oracle().fingerprint(":core", dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.latest_modified_ms(), 2_000_000);
    }

    #[test]
    fn touching_a_file_changes_it() {
        let dir = module_tree();
        let before = oracle().fingerprint(":core", dir.path()).unwrap();
        set_mtime(&dir.path().join("src/main/Core.kt"), 3_000);
        let after = oracle().fingerprint(":core", dir.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn removing_an_older_file_changes_it() {
        let dir = module_tree();
        let before = oracle().fingerprint(":core", dir.path()).unwrap();
        fs::remove_file(dir.path().join("src/main/Core.kt")).unwrap();
        let after = oracle().fingerprint(":core", dir.path()).unwrap();
        assert_eq!(before.latest_modified_ms(), after.latest_modified_ms());
        assert_ne!(before, after);
    }

    #[test]
    fn excluded_directories_are_ignored() {
        let dir = module_tree();
        let before = oracle().fingerprint(":core", dir.path()).unwrap();

        fs::create_dir_all(dir.path().join("build/outputs")).unwrap();
        fs::write(dir.path().join("build/outputs/core.aar"), "zip").unwrap();
        fs::create_dir_all(dir.path().join(".gradle")).unwrap();
        fs::write(dir.path().join(".gradle/state.bin"), "x").unwrap();

        let after = oracle().fingerprint(":core", dir.path()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn nested_build_directory_is_source() {
        let dir = module_tree();
        let before = oracle().fingerprint(":core", dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("src/main/build")).unwrap();
        fs::write(dir.path().join("src/main/build/Tool.kt"), "object Tool").unwrap();
        let after = oracle().fingerprint(":core", dir.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = oracle()
            .fingerprint(":gone", &dir.path().join("gone"))
            .unwrap_err();
        assert!(matches!(err, ModswapError::FingerprintUnavailable { .. }));
    }

    #[test]
    fn invalid_without_artifact_even_if_fingerprint_matches() {
        let dir = module_tree();
        let fp = oracle().fingerprint(":core", dir.path()).unwrap().to_string();
        let artifact = dir.path().join("missing.aar");
        assert!(!oracle().is_valid(":core", dir.path(), &artifact, Some(&fp)));
    }

    #[test]
    fn valid_when_artifact_exists_and_fingerprint_matches() {
        let dir = module_tree();
        let artifacts = TempDir::new().unwrap();
        let artifact = artifacts.path().join("_core.aar");
        fs::write(&artifact, "zip").unwrap();

        let mut store = MemoryCacheStore::default();
        oracle().record(":core", dir.path(), &mut store).unwrap();
        let recorded = store.get(":core");

        assert!(oracle().is_valid(":core", dir.path(), &artifact, recorded.as_deref()));
        assert!(!oracle().is_valid(":core", dir.path(), &artifact, Some("0-stale")));
        assert!(!oracle().is_valid(":core", dir.path(), &artifact, None));
    }

    #[test]
    fn unscannable_tree_is_invalid() {
        let artifacts = TempDir::new().unwrap();
        let artifact = artifacts.path().join("_core.aar");
        fs::write(&artifact, "zip").unwrap();
        let gone = artifacts.path().join("no-such-module");
        assert!(!oracle().is_valid(":core", &gone, &artifact, Some("0-abc")));
    }
}
