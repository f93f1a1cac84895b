//! Recorded fingerprints, keyed by module identifier
//!
//! Read once when a session opens, updated as modules are rebuilt, and
//! written back at session end.

use crate::error::{ModswapError, ModswapResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the store inside the module artifacts directory
pub const CACHE_FILE: &str = "fingerprints.json";

/// Bumped whenever the fingerprint format changes; older files are discarded
const CACHE_VERSION: u32 = 1;

/// Storage for recorded fingerprints
pub trait CacheStore: Send + Sync {
    /// Recorded fingerprint of a module
    fn get(&self, module: &str) -> Option<String>;

    /// Record a fingerprint (visible to `get` immediately)
    fn set(&mut self, module: &str, fingerprint: String);

    /// Whether a fingerprint was recorded for a module
    fn contains(&self, module: &str) -> bool {
        self.get(module).is_some()
    }

    /// Make recorded fingerprints durable
    fn persist(&self) -> ModswapResult<()>;
}

/// On-disk layout
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    updated_at: DateTime<Utc>,
    fingerprints: BTreeMap<String, String>,
}

/// JSON file store
#[derive(Debug)]
pub struct FileCacheStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileCacheStore {
    /// Open the store in `dir`, starting empty if the file is missing or unreadable
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(CACHE_FILE);
        let entries = match Self::read(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("{}; starting with an empty fingerprint cache", e);
                BTreeMap::new()
            }
        };
        debug!("Opened {} with {} entries", path.display(), entries.len());
        Self { path, entries }
    }

    fn read(path: &Path) -> ModswapResult<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path).map_err(|e| ModswapError::CacheRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let file: CacheFile =
            serde_json::from_str(&content).map_err(|e| ModswapError::CacheRead {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if file.version != CACHE_VERSION {
            debug!(
                "Discarding fingerprint cache version {} (current {})",
                file.version, CACHE_VERSION
            );
            return Ok(BTreeMap::new());
        }
        Ok(file.fingerprints)
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of recorded modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, module: &str) -> Option<String> {
        self.entries.get(module).cloned()
    }

    fn set(&mut self, module: &str, fingerprint: String) {
        self.entries.insert(module.to_string(), fingerprint);
    }

    fn persist(&self) -> ModswapResult<()> {
        let persist_err = |reason: String| ModswapError::CachePersist {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| persist_err(e.to_string()))?;
        }

        let file = CacheFile {
            version: CACHE_VERSION,
            updated_at: Utc::now(),
            fingerprints: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        // Write-then-rename so a crash never leaves a torn file behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| persist_err(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| persist_err(e.to_string()))?;

        info!(
            "Saved {} fingerprint(s) to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Store that lives only for the session
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: BTreeMap<String, String>,
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, module: &str) -> Option<String> {
        self.entries.get(module).cloned()
    }

    fn set(&mut self, module: &str, fingerprint: String) {
        self.entries.insert(module.to_string(), fingerprint);
    }

    fn persist(&self) -> ModswapResult<()> {
        Ok(())
    }
}
