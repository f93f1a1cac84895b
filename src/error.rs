//! Error types for modswap
//!
//! All modules use `ModswapResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for modswap operations
pub type ModswapResult<T> = Result<T, ModswapError>;

/// All errors that can occur in modswap
#[derive(Error, Debug)]
pub enum ModswapError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Module declared more than once: {0}")]
    DuplicateModule(String),

    // Project model errors
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Bucket {bucket} not found in project {project}")]
    BucketNotFound { project: String, bucket: String },

    #[error("Mutation of {project}:{bucket} rejected: {reason}")]
    MutationRejected {
        project: String,
        bucket: String,
        reason: String,
    },

    #[error("Invalid workspace manifest {path}: {reason}")]
    WorkspaceInvalid { path: PathBuf, reason: String },

    // Cache errors
    #[error("Cannot fingerprint {module} at {path}: {reason}")]
    FingerprintUnavailable {
        module: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to read fingerprint cache {path}: {reason}")]
    CacheRead { path: PathBuf, reason: String },

    #[error("Failed to persist fingerprint cache {path}: {reason}")]
    CachePersist { path: PathBuf, reason: String },

    #[error("Artifact not found: {0}")]
    ArtifactMissing(PathBuf),

    #[error("Module not registered: {0}")]
    ModuleNotRegistered(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl ModswapError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a mutation rejected error
    pub fn mutation_rejected(
        project: impl Into<String>,
        bucket: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MutationRejected {
            project: project.into(),
            bucket: bucket.into(),
            reason: reason.into(),
        }
    }

    /// Whether the rewrite may skip the failing operation and carry on.
    ///
    /// These never abort a session: the affected module keeps its source
    /// dependency and the build proceeds.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound(_)
                | Self::BucketNotFound { .. }
                | Self::MutationRejected { .. }
                | Self::FingerprintUnavailable { .. }
                | Self::ArtifactMissing(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Run: modswap init"),
            Self::DuplicateModule(_) => Some("Each [[modules]] path must appear once"),
            Self::InvalidPattern { .. } => Some("Check general.detect_launcher in modswap.toml"),
            Self::CachePersist { .. } => {
                Some("Check that the output directory is writable; fingerprints were not saved")
            }
            Self::ModuleNotRegistered(_) => Some("Add the module under [[modules]] in modswap.toml"),
            _ => None,
        }
    }
}
