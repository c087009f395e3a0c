//! The validation oracle: an external strict CSL processor used purely as
//! a pass/fail authority.
//!
//! The processor reads the style from disk, so the engine writes the
//! serialized document to a file before asking for a verdict. The oracle
//! is an opaque synchronous call from the pipeline's point of view; no
//! timeout is imposed here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::CheckError;

/// Verdict source for serialized styles. `Ok(None)` means the style is
/// accepted; `Ok(Some(line))` carries the single diagnostic line of a
/// rejection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StyleChecker: Send + Sync {
    async fn check(&self, csl_path: &Path) -> Result<Option<String>, CheckError>;
}

/// Production checker: shells out to the hayagriva CLI.
///
/// Invocation shape: `hayagriva <references> reference --csl <style>`.
/// A zero exit status is acceptance; anything else is a rejection whose
/// diagnostic is extracted from stderr.
#[derive(Debug, Clone)]
pub struct HayagrivaChecker {
    command: String,
    references: PathBuf,
}

impl HayagrivaChecker {
    pub fn new(command: impl Into<String>, references: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            references: references.into(),
        }
    }
}

#[async_trait]
impl StyleChecker for HayagrivaChecker {
    async fn check(&self, csl_path: &Path) -> Result<Option<String>, CheckError> {
        let output = Command::new(&self.command)
            .arg(&self.references)
            .arg("reference")
            .arg("--csl")
            .arg(csl_path)
            .output()
            .await
            .map_err(|source| CheckError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(None);
        }

        let stderr = std::str::from_utf8(&output.stderr).map_err(|_| CheckError::NonUtf8Output)?;
        extract_diagnostic(stderr)
            .map(Some)
            .ok_or(CheckError::MissingDiagnostic)
    }
}

/// Pull the one interesting line out of a failing report: the first line
/// is a generic failure banner, the second names the actual problem.
pub fn extract_diagnostic(stderr: &str) -> Option<String> {
    stderr.trim().lines().nth(1).map(|line| line.to_string())
}
