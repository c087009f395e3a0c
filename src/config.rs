//! Configuration file and environment layer.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML config
//! file, `SANITIZE_CSL_*` environment variables, explicit CLI flags.
//! The curated skip list of styles that cannot be repaired (self-invented
//! terms and variables that should have been macros) belongs in the
//! `[files].exclude` patterns of the config file, not in code.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::RunConfig;
use crate::error::{ConfigError, ConfigResult};

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Interpret an environment value as a boolean: `0` and `false` (any
/// case) are false, any other non-empty value is true.
pub fn env_bool(value: &str) -> bool {
    let v = value.trim();
    !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
}

/// File-level configuration. Every field is optional; absent fields
/// leave the current value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub files: FilesSection,
    #[serde(default)]
    pub checker: CheckerSection,
    #[serde(default)]
    pub output: OutputSection,
}

/// File processing configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilesSection {
    /// File extensions to process
    pub extensions: Option<Vec<String>>,
    /// Include patterns (glob syntax)
    #[serde(default)]
    pub include: Vec<String>,
    /// Exclude patterns (glob syntax); the skip list lives here
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Checker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckerSection {
    /// Checker binary
    pub command: Option<String>,
    /// Bibliography file handed to the checker
    pub references: Option<PathBuf>,
    /// Whether to invoke the checker at all
    pub enabled: Option<bool>,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    /// Directory receiving sanitized styles, diffs and indices
    pub dir: Option<PathBuf>,
}

impl FileConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overlay this file configuration onto a run configuration. Scalar
    /// fields only replace values the CLI left at their built-in
    /// defaults; pattern lists are appended.
    pub fn apply_to(&self, run: &mut RunConfig) {
        if let Some(extensions) = &self.files.extensions
            && run.extensions == vec!["csl".to_string()]
        {
            run.extensions = extensions.clone();
        }
        run.include_patterns.extend(self.files.include.clone());
        run.exclude_patterns.extend(self.files.exclude.clone());

        if let Some(command) = &self.checker.command
            && run.checker_command == "hayagriva"
        {
            run.checker_command = command.clone();
        }
        if let Some(references) = &self.checker.references
            && run.references == PathBuf::from("references.yaml")
        {
            run.references = references.clone();
        }
        if let Some(enabled) = self.checker.enabled
            && run.check
        {
            run.check = enabled;
        }
        if let Some(dir) = &self.output.dir
            && run.out_dir == PathBuf::from("dist")
        {
            run.out_dir = dir.clone();
        }
    }
}

/// Apply `SANITIZE_CSL_*` environment overrides.
pub fn apply_env(run: &mut RunConfig, env: &dyn EnvProvider) -> ConfigResult<()> {
    if let Some(v) = env.get("SANITIZE_CSL_CHECKER") {
        run.checker_command = v;
    }
    if let Some(v) = env.get("SANITIZE_CSL_REFERENCES") {
        run.references = PathBuf::from(v);
    }
    if let Some(v) = env.get("SANITIZE_CSL_OUT_DIR") {
        run.out_dir = PathBuf::from(v);
    }
    if let Some(v) = env.get("SANITIZE_CSL_THREADS") {
        let threads: usize = v.parse().map_err(|_| ConfigError::InvalidValue {
            field: "SANITIZE_CSL_THREADS".to_string(),
            value: v.clone(),
            reason: "not a positive integer".to_string(),
        })?;
        if threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SANITIZE_CSL_THREADS".to_string(),
                value: v,
                reason: "must be greater than 0".to_string(),
            });
        }
        run.threads = threads;
    }
    if let Some(v) = env.get("SANITIZE_CSL_NO_CHECK")
        && env_bool(&v)
    {
        run.check = false;
    }
    if let Some(v) = env.get("SANITIZE_CSL_BACKTRACE")
        && env_bool(&v)
    {
        run.backtrace = true;
    }
    Ok(())
}
