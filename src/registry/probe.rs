//! Concurrent cache-validity probing
//!
//! Every module is fingerprinted on the blocking pool, bounded by a
//! semaphore, and the caller waits for all of them before returning. The
//! rewrite therefore never sees a half-probed registry. The optional root
//! check (can annotation processing be skipped?) runs in the same batch and
//! does not influence module verdicts.

use super::{ModuleRegistry, Validity};
use crate::cache::{CacheStore, Fingerprint, FingerprintOracle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Root project tree checked alongside the modules
#[derive(Debug, Clone)]
pub struct RootProbe {
    /// Cache-store key the root fingerprint is recorded under
    pub key: String,
    pub dir: PathBuf,
}

impl RootProbe {
    pub fn new(root: &str, dir: PathBuf) -> Self {
        Self {
            key: root_key(root),
            dir,
        }
    }
}

/// Store key for the root project's annotation-processing fingerprint
pub fn root_key(root: &str) -> String {
    format!("annotation-processing{}", root)
}

/// Result of one probe batch
#[derive(Debug, Default, Serialize)]
pub struct ProbeOutcome {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    /// `Some(true)` when the root tree is unchanged since it was last recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_processing_skippable: Option<bool>,
    #[serde(skip)]
    pub root_fingerprint: Option<Fingerprint>,
}

#[derive(Debug, Clone)]
enum Target {
    Module(String),
    Root,
}

struct Job {
    target: Target,
    label: String,
    dir: PathBuf,
    artifact: Option<PathBuf>,
    recorded: Option<String>,
}

struct Verdict {
    target: Target,
    valid: bool,
    fingerprint: Option<Fingerprint>,
}

impl Job {
    fn evaluate(self, oracle: &FingerprintOracle) -> Verdict {
        let (valid, fingerprint) = match &self.artifact {
            Some(artifact) => {
                oracle.check(&self.label, &self.dir, artifact, self.recorded.as_deref())
            }
            None => match oracle.fingerprint(&self.label, &self.dir) {
                Ok(current) => (
                    self.recorded.as_deref() == Some(current.to_string().as_str()),
                    Some(current),
                ),
                Err(e) => {
                    warn!("{}", e);
                    (false, None)
                }
            },
        };
        Verdict {
            target: self.target,
            valid,
            fingerprint,
        }
    }
}

/// Settle the validity of every node in `registry`
///
/// Disabled nodes are scanned too, so their cache state can be reported;
/// the rewrite never substitutes them.
///
/// Uses at most `workers` concurrent scans. Returns once all scans have
/// finished; a scan that fails for any reason leaves its module invalid.
pub async fn probe(
    registry: &mut ModuleRegistry,
    oracle: &FingerprintOracle,
    store: &dyn CacheStore,
    workers: usize,
    root: Option<RootProbe>,
) -> ProbeOutcome {
    let mut jobs: Vec<Job> = registry
        .iter()
        .map(|node| Job {
            target: Target::Module(node.path().to_string()),
            label: node.path().to_string(),
            dir: node.source_dir().to_path_buf(),
            artifact: Some(node.artifact_file().to_path_buf()),
            recorded: store.get(node.path()),
        })
        .collect();

    if let Some(root) = root {
        jobs.push(Job {
            target: Target::Root,
            label: root.key.clone(),
            recorded: store.get(&root.key),
            dir: root.dir,
            artifact: None,
        });
    }

    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    debug!("Probing {} tree(s) with {} worker(s)", jobs.len(), workers.max(1));

    for job in jobs {
        let permits = Arc::clone(&permits);
        let oracle = oracle.clone();
        tasks.spawn(async move {
            let target = job.target.clone();
            let failed = |target: Target| Verdict {
                target,
                valid: false,
                fingerprint: None,
            };
            let Ok(_permit) = permits.acquire_owned().await else {
                return failed(target);
            };
            match tokio::task::spawn_blocking(move || job.evaluate(&oracle)).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!("Probe of {:?} did not complete: {}", target, e);
                    failed(target)
                }
            }
        });
    }

    let mut outcome = ProbeOutcome::default();
    while let Some(joined) = tasks.join_next().await {
        let verdict = match joined {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Probe task failed: {}", e);
                continue;
            }
        };
        match verdict.target {
            Target::Module(path) => {
                let validity = if verdict.valid {
                    Validity::Valid
                } else {
                    Validity::Invalid
                };
                registry.settle(&path, validity, verdict.fingerprint);
            }
            Target::Root => {
                outcome.annotation_processing_skippable = Some(verdict.valid);
                outcome.root_fingerprint = verdict.fingerprint;
            }
        }
    }

    // Anything a failed task left unsettled is invalid
    let unsettled: Vec<String> = registry
        .iter()
        .filter(|node| node.validity() == Validity::Unknown)
        .map(|node| node.path().to_string())
        .collect();
    for path in unsettled {
        registry.settle(&path, Validity::Invalid, None);
    }

    for node in registry.iter() {
        if node.cache_valid() {
            outcome.valid.push(node.path().to_string());
        } else {
            outcome.invalid.push(node.path().to_string());
        }
    }

    info!(
        "Cache probe: {} valid, {} invalid",
        outcome.valid.len(),
        outcome.invalid.len()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::config::{Config, ModuleConfig};
    use crate::model::Workspace;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        workspace: Workspace,
        config: Config,
    }

    impl Fixture {
        fn new(modules: &[&str]) -> Self {
            let dir = TempDir::new().unwrap();
            let mut workspace = Workspace::new(":app", dir.path());
            let mut config = Config::default();
            workspace.add_project(":app", "app");
            fs::create_dir_all(dir.path().join("app")).unwrap();
            fs::write(dir.path().join("app/Main.kt"), "fun main() {}").unwrap();
            for module in modules {
                let name = module.trim_start_matches(':');
                workspace.add_project(*module, name);
                fs::create_dir_all(dir.path().join(name).join("src")).unwrap();
                fs::write(dir.path().join(name).join("src/Lib.kt"), name).unwrap();
                config.modules.push(ModuleConfig::new(*module));
            }
            Self {
                dir,
                workspace,
                config,
            }
        }

        fn artifacts(&self) -> PathBuf {
            self.dir.path().join("out")
        }

        fn registry(&self) -> ModuleRegistry {
            ModuleRegistry::populate(&self.config, &self.workspace, &self.artifacts())
        }

        /// Simulate a previous build of `module`
        fn cache(&self, module: &str, store: &mut MemoryCacheStore) {
            let registry = self.registry();
            let node = registry.get(module).unwrap();
            fs::create_dir_all(self.artifacts()).unwrap();
            fs::write(node.artifact_file(), "zip").unwrap();
            oracle()
                .record(module, node.source_dir(), store)
                .unwrap();
        }
    }

    fn oracle() -> FingerprintOracle {
        FingerprintOracle::new(["build"])
    }

    #[tokio::test]
    async fn settles_every_node() {
        let fx = Fixture::new(&[":core", ":feature", ":util"]);
        let mut store = MemoryCacheStore::default();
        fx.cache(":core", &mut store);

        let mut registry = fx.registry();
        let outcome = probe(&mut registry, &oracle(), &store, 2, None).await;

        assert!(registry.is_probed());
        assert_eq!(outcome.valid, vec![":core".to_string()]);
        assert_eq!(outcome.invalid.len(), 2);
        assert!(registry.get(":core").unwrap().fingerprint().is_some());
        assert!(outcome.annotation_processing_skippable.is_none());
    }

    #[tokio::test]
    async fn changed_sources_invalidate() {
        let fx = Fixture::new(&[":core"]);
        let mut store = MemoryCacheStore::default();
        fx.cache(":core", &mut store);
        fs::write(fx.dir.path().join("core/src/New.kt"), "class New").unwrap();

        let mut registry = fx.registry();
        probe(&mut registry, &oracle(), &store, 1, None).await;
        assert!(!registry.get(":core").unwrap().cache_valid());
    }

    #[tokio::test]
    async fn missing_source_dir_fails_closed() {
        let fx = Fixture::new(&[":core"]);
        let mut store = MemoryCacheStore::default();
        fx.cache(":core", &mut store);
        fs::remove_dir_all(fx.dir.path().join("core")).unwrap();

        let mut registry = fx.registry();
        probe(&mut registry, &oracle(), &store, 4, None).await;
        assert_eq!(registry.get(":core").unwrap().validity(), Validity::Invalid);
    }

    #[tokio::test]
    async fn root_check_is_independent() {
        let fx = Fixture::new(&[":core"]);
        let mut store = MemoryCacheStore::default();
        fx.cache(":core", &mut store);
        let root_dir = fx.dir.path().join("app");

        let mut registry = fx.registry();
        let first = probe(
            &mut registry,
            &oracle(),
            &store,
            2,
            Some(RootProbe::new(":app", root_dir.clone())),
        )
        .await;
        assert_eq!(first.annotation_processing_skippable, Some(false));
        assert_eq!(first.valid, vec![":core".to_string()]);

        let key = root_key(":app");
        store.set(&key, first.root_fingerprint.unwrap().to_string());

        let mut registry = fx.registry();
        let second = probe(
            &mut registry,
            &oracle(),
            &store,
            2,
            Some(RootProbe::new(":app", root_dir)),
        )
        .await;
        assert_eq!(second.annotation_processing_skippable, Some(true));
    }

    #[tokio::test]
    async fn missing_root_dir_does_not_affect_modules() {
        let fx = Fixture::new(&[":core"]);
        let mut store = MemoryCacheStore::default();
        fx.cache(":core", &mut store);

        let mut registry = fx.registry();
        let outcome = probe(
            &mut registry,
            &oracle(),
            &store,
            2,
            Some(RootProbe::new(":app", Path::new("/nonexistent/app").to_path_buf())),
        )
        .await;
        assert_eq!(outcome.annotation_processing_skippable, Some(false));
        assert!(registry.get(":core").unwrap().cache_valid());
    }

    #[tokio::test]
    async fn disabled_nodes_are_settled_but_not_rebuilt() {
        let mut fx = Fixture::new(&[":core", ":legacy"]);
        fx.config.modules[1].enable = false;
        let mut store = MemoryCacheStore::default();
        fx.cache(":legacy", &mut store);

        let mut registry = fx.registry();
        let outcome = probe(&mut registry, &oracle(), &store, 2, None).await;

        assert!(registry.is_probed());
        assert!(registry.get(":legacy").unwrap().cache_valid());
        assert!(registry.enabled(":legacy").is_none());
        assert_eq!(outcome.valid, vec![":legacy".to_string()]);
        let rebuilt: Vec<&str> = registry.invalid().map(|node| node.path()).collect();
        assert_eq!(rebuilt, vec![":core"]);
    }
}
