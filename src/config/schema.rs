//! Configuration schema for modswap
//!
//! Configuration is stored in `modswap.toml` at the workspace root.

use crate::error::{ModswapError, ModswapResult};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Artifact output locations
    pub output: OutputConfig,

    /// Cache-validity probing
    pub probe: ProbeConfig,

    /// Dependency substitution settings
    pub substitution: SubstitutionConfig,

    /// Modules eligible for substitution
    pub modules: Vec<ModuleConfig>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Master switch; nothing is rewritten when false
    pub enabled: bool,

    /// Emit info/debug logs (warnings are always shown)
    pub log_enabled: bool,

    /// Log format: "text" or "json"
    pub log_format: String,

    /// Regex matched against requested task names; empty always triggers
    pub detect_launcher: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_enabled: false,
            log_format: "text".to_string(),
            detect_launcher: String::new(),
        }
    }
}

/// Where cached artifacts live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory, relative to the workspace root
    pub dir: PathBuf,

    /// First-party module artifacts (defaults to `<dir>/modules`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_artifacts_dir: Option<PathBuf>,

    /// Normalized third-party artifacts (defaults to `<dir>/third_party`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_party_artifacts_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("build").join("modswap"),
            module_artifacts_dir: None,
            third_party_artifacts_dir: None,
        }
    }
}

impl OutputConfig {
    /// Resolved first-party artifact directory
    pub fn module_artifacts_dir(&self, root: &Path) -> PathBuf {
        match &self.module_artifacts_dir {
            Some(dir) => root.join(dir),
            None => root.join(&self.dir).join("modules"),
        }
    }

    /// Resolved third-party artifact directory
    pub fn third_party_artifacts_dir(&self, root: &Path) -> PathBuf {
        match &self.third_party_artifacts_dir {
            Some(dir) => root.join(dir),
            None => root.join(&self.dir).join("third_party"),
        }
    }
}

/// Cache-validity probing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Concurrent fingerprint workers (0 = available parallelism)
    pub workers: usize,

    /// Top-level directory names skipped when fingerprinting a module
    pub exclude_dirs: Vec<String>,

    /// Also check whether the root project's annotation processing can be skipped
    pub annotation_processing: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            exclude_dirs: vec![
                "build".to_string(),
                ".gradle".to_string(),
                ".cxx".to_string(),
                ".git".to_string(),
                ".idea".to_string(),
            ],
            annotation_processing: false,
        }
    }
}

impl ProbeConfig {
    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// Dependency substitution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstitutionConfig {
    /// Extension of binary artifacts (without the dot)
    pub artifact_extension: String,

    /// Bucket names (case-insensitive suffixes) the rewrite operates on
    pub bucket_suffixes: Vec<String>,
}

impl Default for SubstitutionConfig {
    fn default() -> Self {
        Self {
            artifact_extension: "aar".to_string(),
            bucket_suffixes: vec![
                "api".to_string(),
                "runtimeOnly".to_string(),
                "implementation".to_string(),
            ],
        }
    }
}

/// One module eligible for substitution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Project path, e.g. `:feature:login`
    pub path: String,

    /// Participates in substitution
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Substitute the debug variant artifact (release otherwise)
    #[serde(default = "default_true")]
    pub use_debug: bool,

    /// Cached artifact file name; derived from the path when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_name: Option<String>,

    /// Product flavor the artifact is built for
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flavor: String,
}

fn default_true() -> bool {
    true
}

impl ModuleConfig {
    /// Create a module entry with defaults
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            enable: true,
            use_debug: true,
            artifact_name: None,
            flavor: String::new(),
        }
    }

    /// Artifact file name, `_featurelogin.aar` for `:feature:login`
    pub fn artifact_name(&self, extension: &str) -> String {
        match &self.artifact_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("_{}.{}", self.path.replace(':', ""), extension),
        }
    }
}

impl Config {
    /// Check invariants the registry relies on
    pub fn validate(&self, origin: &Path) -> ModswapResult<()> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            if !module.path.starts_with(':') {
                return Err(ModswapError::ConfigInvalid {
                    path: origin.to_path_buf(),
                    reason: format!("module path '{}' must start with ':'", module.path),
                });
            }
            if !seen.insert(module.path.as_str()) {
                return Err(ModswapError::DuplicateModule(module.path.clone()));
            }
        }
        if self.substitution.artifact_extension.trim().is_empty() {
            return Err(ModswapError::ConfigInvalid {
                path: origin.to_path_buf(),
                reason: "substitution.artifact_extension must not be empty".to_string(),
            });
        }
        self.launcher_pattern()?;
        Ok(())
    }

    fn launcher_pattern(&self) -> ModswapResult<Option<Regex>> {
        let pattern = self.general.detect_launcher.trim();
        if pattern.is_empty() {
            return Ok(None);
        }
        Regex::new(pattern)
            .map(Some)
            .map_err(|e| ModswapError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Whether this build invocation should run substitution at all
    pub fn should_trigger<S: AsRef<str>>(&self, tasks: &[S]) -> ModswapResult<bool> {
        if !self.general.enabled {
            return Ok(false);
        }
        match self.launcher_pattern()? {
            None => Ok(true),
            Some(re) => Ok(tasks.iter().any(|task| re.is_match(task.as_ref()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[substitution]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.general.enabled);
        assert_eq!(config.substitution.artifact_extension, "aar");
        assert!(config.modules.is_empty());
    }

    #[test]
    fn config_deserializes_modules() {
        let toml = r#"
            [general]
            enabled = true

            [[modules]]
            path = ":core"

            [[modules]]
            path = ":feature:login"
            use_debug = false
            flavor = "tiya"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.modules.len(), 2);
        assert!(config.modules[0].enable);
        assert!(config.modules[0].use_debug);
        assert!(!config.modules[1].use_debug);
        assert_eq!(config.modules[1].flavor, "tiya");
        assert_eq!(config.probe.exclude_dirs[0], "build"); // default preserved
    }

    #[test]
    fn derived_artifact_name() {
        let module = ModuleConfig::new(":feature:login");
        assert_eq!(module.artifact_name("aar"), "_featurelogin.aar");

        let mut named = ModuleConfig::new(":core");
        named.artifact_name = Some("core-cached.aar".to_string());
        assert_eq!(named.artifact_name("aar"), "core-cached.aar");
    }

    #[test]
    fn output_dirs_resolve_against_root() {
        let output = OutputConfig::default();
        let root = Path::new("/work");
        assert_eq!(
            output.module_artifacts_dir(root),
            PathBuf::from("/work/build/modswap/modules")
        );
        assert_eq!(
            output.third_party_artifacts_dir(root),
            PathBuf::from("/work/build/modswap/third_party")
        );
    }

    #[test]
    fn validate_rejects_duplicates() {
        let mut config = Config::default();
        config.modules = vec![ModuleConfig::new(":core"), ModuleConfig::new(":core")];
        let err = config.validate(Path::new("modswap.toml")).unwrap_err();
        assert!(matches!(err, ModswapError::DuplicateModule(p) if p == ":core"));
    }

    #[test]
    fn validate_rejects_relative_paths() {
        let mut config = Config::default();
        config.modules = vec![ModuleConfig::new("core")];
        assert!(config.validate(Path::new("modswap.toml")).is_err());
    }

    #[test]
    fn trigger_requires_enabled() {
        let config = Config::default();
        assert!(!config.should_trigger(&["assembleDebug"]).unwrap());
    }

    #[test]
    fn trigger_matches_launcher_pattern() {
        let mut config = Config::default();
        config.general.enabled = true;
        assert!(config.should_trigger::<&str>(&[]).unwrap());

        config.general.detect_launcher = "^assemble.*Debug$".to_string();
        assert!(config.should_trigger(&["clean", "assembleTiyaDebug"]).unwrap());
        assert!(!config.should_trigger(&["assembleRelease"]).unwrap());
    }

    #[test]
    fn invalid_launcher_pattern_is_reported() {
        let mut config = Config::default();
        config.general.enabled = true;
        config.general.detect_launcher = "(".to_string();
        assert!(matches!(
            config.should_trigger(&["build"]),
            Err(ModswapError::InvalidPattern { .. })
        ));
    }
}
