//! One substitution session, from configuration to persisted fingerprints
//!
//! | phase       | method          | effect                                      |
//! |-------------|-----------------|---------------------------------------------|
//! | trigger     | `should_trigger`| enable flag and task pattern                |
//! | populate    | `register`      | one node per configured module              |
//! | probe       | `prepare`       | concurrent validity check, joined           |
//! | rewrite     | `substitute`    | up-front build requests, then graph rewrite |
//! | collect     | `record_build`  | install artifact, record fingerprint        |
//! | end         | `persist`       | fingerprints written back                   |

use super::report::{elapsed_ms, SessionReport};
use crate::builder::{install_artifact, ArtifactBuilder, BuildQueue};
use crate::cache::{CacheStore, FileCacheStore, Fingerprint, FingerprintOracle};
use crate::config::Config;
use crate::error::{ModswapError, ModswapResult};
use crate::model::ProjectModel;
use crate::registry::probe::{root_key, RootProbe};
use crate::registry::{probe, ModuleRegistry, ProbeOutcome};
use crate::rewrite::{GraphRewriter, RewriteReport, RewriteSettings};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct Session {
    config: Config,
    root_dir: PathBuf,
    oracle: FingerprintOracle,
    store: Box<dyn CacheStore>,
    registry: ModuleRegistry,
    root_fingerprint: Option<Fingerprint>,
}

impl Session {
    /// Open a session whose fingerprints live in the module artifacts directory
    pub fn open(config: Config, root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        let store = FileCacheStore::open(&config.output.module_artifacts_dir(&root_dir));
        Self::with_store(config, root_dir, Box::new(store))
    }

    pub fn with_store(
        config: Config,
        root_dir: impl Into<PathBuf>,
        store: Box<dyn CacheStore>,
    ) -> Self {
        let oracle = FingerprintOracle::new(config.probe.exclude_dirs.iter().cloned());
        Self {
            config,
            root_dir: root_dir.into(),
            oracle,
            store,
            registry: ModuleRegistry::default(),
            root_fingerprint: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn CacheStore {
        &*self.store
    }

    pub fn module_artifacts_dir(&self) -> PathBuf {
        self.config.output.module_artifacts_dir(&self.root_dir)
    }

    pub fn should_trigger<S: AsRef<str>>(&self, tasks: &[S]) -> ModswapResult<bool> {
        self.config.should_trigger(tasks)
    }

    /// Build the registry without probing
    pub fn register<M: ProjectModel + ?Sized>(&mut self, model: &M) {
        self.registry =
            ModuleRegistry::populate(&self.config, model, &self.module_artifacts_dir());
        self.root_fingerprint = None;
    }

    /// Build the registry and settle every module's validity
    pub async fn prepare<M: ProjectModel + ?Sized>(&mut self, model: &M) -> ProbeOutcome {
        self.register(model);

        let root = if self.config.probe.annotation_processing {
            model
                .project_dir(model.root())
                .map(|dir| RootProbe::new(model.root(), dir))
        } else {
            None
        };

        let outcome = probe(
            &mut self.registry,
            &self.oracle,
            &*self.store,
            self.config.probe.worker_count(),
            root,
        )
        .await;
        self.root_fingerprint = outcome.root_fingerprint.clone();
        outcome
    }

    /// Request builds for every stale module, then rewrite the graph
    ///
    /// Must follow [`prepare`](Self::prepare).
    pub fn substitute<M, B>(&mut self, model: &mut M, builder: &mut B) -> ModswapResult<RewriteReport>
    where
        M: ProjectModel + ?Sized,
        B: ArtifactBuilder + ?Sized,
    {
        if !self.registry.is_probed() {
            return Err(ModswapError::Internal(
                "substitution requested before the registry was probed".to_string(),
            ));
        }

        for node in self.registry.invalid() {
            builder.request_build(node);
        }

        let settings = RewriteSettings::from_config(&self.config, &self.root_dir);
        Ok(GraphRewriter::new(model, &mut self.registry, builder, &settings).rewrite())
    }

    /// Full session for one build invocation
    pub async fn run<M: ProjectModel + ?Sized, S: AsRef<str>>(
        &mut self,
        model: &mut M,
        tasks: &[S],
    ) -> ModswapResult<SessionReport> {
        let started_at = Utc::now();
        if !self.should_trigger(tasks)? {
            info!("Substitution not triggered for this invocation");
            return Ok(SessionReport::skipped(started_at));
        }

        let probe = self.prepare(&*model).await;
        let mut queue = BuildQueue::new();
        let rewrite = self.substitute(model, &mut queue)?;

        Ok(SessionReport {
            started_at,
            triggered: true,
            probe: Some(probe),
            builds: queue.into_requests(),
            rewrite: Some(rewrite),
            duration_ms: elapsed_ms(started_at),
        })
    }

    /// Install a freshly built artifact and record the module's fingerprint
    ///
    /// Uses the fingerprint taken while probing when there is one, so
    /// edits made during the build invalidate the cache next time.
    pub fn record_build(&mut self, module: &str, produced: &Path) -> ModswapResult<PathBuf> {
        let node = self
            .registry
            .get(module)
            .ok_or_else(|| ModswapError::ModuleNotRegistered(module.to_string()))?;

        let installed = install_artifact(node, produced)?;
        let fingerprint = match node.fingerprint() {
            Some(fingerprint) => {
                self.store.set(module, fingerprint.to_string());
                fingerprint.clone()
            }
            None => self
                .oracle
                .record(module, node.source_dir(), &mut *self.store)?,
        };
        debug!("Recorded {} for {}", fingerprint, module);
        Ok(installed)
    }

    /// Record the root tree after annotation processing ran
    pub fn record_root<M: ProjectModel + ?Sized>(&mut self, model: &M) -> ModswapResult<()> {
        let key = root_key(model.root());
        match &self.root_fingerprint {
            Some(fingerprint) => self.store.set(&key, fingerprint.to_string()),
            None => {
                let dir = model
                    .project_dir(model.root())
                    .ok_or_else(|| ModswapError::ProjectNotFound(model.root().to_string()))?;
                self.oracle.record(&key, &dir, &mut *self.store)?;
            }
        }
        Ok(())
    }

    /// Write recorded fingerprints back
    pub fn persist(&self) -> ModswapResult<()> {
        self.store.persist()
    }
}
