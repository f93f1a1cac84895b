//! Artifact build requests
//!
//! The rewrite never builds anything itself. When it meets a module whose
//! cached artifact cannot be used it asks an [`ArtifactBuilder`] for one;
//! the host's build integration carries the request out and hands the
//! produced file back through [`install_artifact`].

use crate::error::{ModswapError, ModswapResult};
use crate::registry::ModuleNode;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Receives requests to (re)build a module's artifact
pub trait ArtifactBuilder {
    /// Ask for `node`'s artifact to be produced
    ///
    /// Implementations must tolerate repeated requests for the same module.
    fn request_build(&mut self, node: &ModuleNode);
}

/// One module to assemble
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRequest {
    pub module: String,
    /// Variant to assemble (`debug`, `tiyaRelease`, ...)
    pub variant: String,
    /// File name the produced artifact is installed under
    pub artifact_name: String,
}

impl BuildRequest {
    pub fn for_node(node: &ModuleNode) -> Self {
        Self {
            module: node.path().to_string(),
            variant: node.variant(),
            artifact_name: node.artifact_name().to_string(),
        }
    }

    /// Host task that assembles this variant, e.g. `:core:assembleDebug`
    pub fn assemble_task(&self) -> String {
        format!(
            "{}:assemble{}",
            self.module,
            crate::registry::capitalize(&self.variant)
        )
    }
}

/// Collects build requests, once per module, in request order
#[derive(Debug, Default)]
pub struct BuildQueue {
    requests: Vec<BuildRequest>,
    queued: HashSet<String>,
}

impl BuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[BuildRequest] {
        &self.requests
    }

    pub fn is_queued(&self, module: &str) -> bool {
        self.queued.contains(module)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn into_requests(self) -> Vec<BuildRequest> {
        self.requests
    }
}

impl ArtifactBuilder for BuildQueue {
    fn request_build(&mut self, node: &ModuleNode) {
        if !self.queued.insert(node.path().to_string()) {
            debug!("Build of {} already requested", node.path());
            return;
        }
        let request = BuildRequest::for_node(node);
        info!("Requesting build of {} ({})", request.module, request.variant);
        self.requests.push(request);
    }
}

/// Copy a freshly produced artifact to the node's cache location
pub fn install_artifact(node: &ModuleNode, produced: &Path) -> ModswapResult<PathBuf> {
    if !produced.is_file() {
        return Err(ModswapError::ArtifactMissing(produced.to_path_buf()));
    }
    let target = node.artifact_file();
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ModswapError::io(format!("creating artifact directory {}", parent.display()), e)
        })?;
    }
    fs::copy(produced, target).map_err(|e| {
        ModswapError::io(
            format!("copying {} to {}", produced.display(), target.display()),
            e,
        )
    })?;
    info!("Installed {} as {}", produced.display(), target.display());
    Ok(target.to_path_buf())
}
