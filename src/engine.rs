//! Batch sanitization engine.
//!
//! Orchestrates the per-document workflow (read, parse, normalize,
//! serialize, write, diff, check) across many styles: semaphore-bounded
//! concurrent tasks joined at the end, with per-document failures
//! isolated so one broken style never aborts the run (unless fail-fast
//! is requested).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use serde::Serialize;

use crate::checker::StyleChecker;
use crate::document::Document;
use crate::error::{Result, SanitizeError};
use crate::file_discovery::FileDiscovery;
use crate::pipeline::{self, RULES};
use crate::report::{self, IndexEntry};
use crate::style::StyleInfo;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of concurrent sanitization tasks
    pub max_concurrent: usize,
    /// Stop on the first rejected or failed style
    pub fail_fast: bool,
    /// Re-check the style after every rule
    pub backtrace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            fail_fast: false,
            backtrace: false,
        }
    }
}

/// Outcome of sanitizing a single style
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SanitizeStatus {
    /// No changes were needed and the checker accepts the style
    Clean,
    /// Changes were made and the checker accepts the result
    Sanitized { change_count: usize },
    /// The checker still rejects the normalized output
    Rejected { diagnostic: String },
    /// The style could not be processed (parse failure, structural
    /// precondition violation, IO error)
    Error { message: String },
}

impl SanitizeStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            SanitizeStatus::Clean | SanitizeStatus::Sanitized { .. }
        )
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, SanitizeStatus::Rejected { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SanitizeStatus::Error { .. })
    }
}

/// Checker verdicts around one rule in backtrace mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTrace {
    pub rule: &'static str,
    pub change_count: usize,
    /// `None` = the checker accepted the document after this rule.
    pub verdict: Option<String>,
}

/// Result of sanitizing a single style file
#[derive(Debug, Clone)]
pub struct FileSanitizeResult {
    pub path: PathBuf,
    pub status: SanitizeStatus,
    /// Rendered change lines in rule order
    pub changes: Vec<String>,
    pub duration: Duration,
    /// Index entry for the reporting layer; absent when the style never
    /// parsed far enough to have one
    pub entry: Option<IndexEntry>,
    /// Per-rule verdicts, only in backtrace mode
    pub trace: Vec<RuleTrace>,
}

impl FileSanitizeResult {
    fn error(path: PathBuf, error: SanitizeError, duration: Duration) -> Self {
        Self {
            path,
            status: SanitizeStatus::Error {
                message: error.to_string(),
            },
            changes: Vec::new(),
            duration,
            entry: None,
            trace: Vec::new(),
        }
    }
}

/// Progress update during a batch run
#[derive(Debug, Clone)]
pub struct SanitizeProgress {
    pub current_file: Option<PathBuf>,
    pub completed: usize,
    pub total: usize,
    pub phase: SanitizePhase,
}

/// Phase of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizePhase {
    Discovery,
    Sanitizing,
    Complete,
}

/// Progress callback type
pub type ProgressCallback = Arc<dyn Fn(SanitizeProgress) + Send + Sync>;

/// Aggregated results of a batch run
#[derive(Debug, Clone)]
pub struct SanitizeResults {
    pub total_files: usize,
    pub clean_files: usize,
    pub sanitized_files: usize,
    pub rejected_files: usize,
    pub error_files: usize,
    pub total_duration: Duration,
    pub file_results: Vec<FileSanitizeResult>,
}

impl SanitizeResults {
    pub fn aggregate(file_results: Vec<FileSanitizeResult>, total_duration: Duration) -> Self {
        let mut clean_files = 0;
        let mut sanitized_files = 0;
        let mut rejected_files = 0;
        let mut error_files = 0;

        for result in &file_results {
            match result.status {
                SanitizeStatus::Clean => clean_files += 1,
                SanitizeStatus::Sanitized { .. } => sanitized_files += 1,
                SanitizeStatus::Rejected { .. } => rejected_files += 1,
                SanitizeStatus::Error { .. } => error_files += 1,
            }
        }

        Self {
            total_files: file_results.len(),
            clean_files,
            sanitized_files,
            rejected_files,
            error_files,
            total_duration,
            file_results,
        }
    }

    /// Overall success is the conjunction of per-document outcomes.
    pub fn all_accepted(&self) -> bool {
        self.rejected_files == 0 && self.error_files == 0
    }

    pub fn has_failures(&self) -> bool {
        !self.all_accepted()
    }

    /// Index entries of every style that produced one, in result order.
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        self.file_results
            .iter()
            .filter_map(|r| r.entry.clone())
            .collect()
    }
}

/// Everything a per-file task needs, cloneable into the spawned future.
#[derive(Clone)]
struct FileContext {
    checker: Option<Arc<dyn StyleChecker>>,
    styles_dir: PathBuf,
    out_dir: PathBuf,
    backtrace: bool,
}

/// The batch sanitization engine
pub struct SanitizeEngine {
    checker: Option<Arc<dyn StyleChecker>>,
    styles_dir: PathBuf,
    out_dir: PathBuf,
    config: EngineConfig,
}

impl SanitizeEngine {
    /// Create a new engine. `checker` of `None` skips validation
    /// entirely; every processed style then counts as accepted.
    pub fn new(
        checker: Option<Arc<dyn StyleChecker>>,
        styles_dir: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
        config: EngineConfig,
    ) -> Self {
        Self {
            checker,
            styles_dir: styles_dir.into(),
            out_dir: out_dir.into(),
            config,
        }
    }

    /// Discover and sanitize every style under `path`.
    pub async fn sanitize_path(
        &self,
        path: &Path,
        discovery: &FileDiscovery,
        progress: Option<ProgressCallback>,
    ) -> Result<SanitizeResults> {
        let start = Instant::now();

        if let Some(ref callback) = progress {
            callback(SanitizeProgress {
                current_file: None,
                completed: 0,
                total: 0,
                phase: SanitizePhase::Discovery,
            });
        }

        let mut files = discovery.discover_files(path).await?;
        // Deterministic processing and index order.
        files.sort();

        let results = self.sanitize_files_with_progress(files, progress.clone()).await?;
        let total_duration = start.elapsed();

        let aggregated = SanitizeResults::aggregate(results, total_duration);
        if let Some(ref callback) = progress {
            callback(SanitizeProgress {
                current_file: None,
                completed: aggregated.total_files,
                total: aggregated.total_files,
                phase: SanitizePhase::Complete,
            });
        }
        Ok(aggregated)
    }

    /// Sanitize a list of style files.
    pub async fn sanitize_files(&self, files: Vec<PathBuf>) -> Result<Vec<FileSanitizeResult>> {
        self.sanitize_files_with_progress(files, None).await
    }

    async fn sanitize_files_with_progress(
        &self,
        files: Vec<PathBuf>,
        progress: Option<ProgressCallback>,
    ) -> Result<Vec<FileSanitizeResult>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let ctx = FileContext {
            checker: self.checker.clone(),
            styles_dir: self.styles_dir.clone(),
            out_dir: self.out_dir.clone(),
            backtrace: self.config.backtrace,
        };

        if self.config.fail_fast {
            // Sequential processing so the run can stop at the first
            // rejected or failed style.
            let total = files.len();
            let mut results = Vec::with_capacity(total);
            for (done, file) in files.into_iter().enumerate() {
                let result = Self::process_file(ctx.clone(), file.clone()).await;
                let failed = !result.status.is_accepted();
                if let Some(ref callback) = progress {
                    callback(SanitizeProgress {
                        current_file: Some(file),
                        completed: done + 1,
                        total,
                        phase: SanitizePhase::Sanitizing,
                    });
                }
                results.push(result);
                if failed {
                    break;
                }
            }
            return Ok(results);
        }

        let total = files.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrent));

        let tasks: Vec<_> = files
            .into_iter()
            .map(|file| {
                let ctx = ctx.clone();
                let semaphore = Arc::clone(&semaphore);
                let completed = Arc::clone(&completed);
                let progress = progress.clone();

                tokio::spawn(async move {
                    let _permit = semaphore.acquire().await.map_err(|_| {
                        SanitizeError::Concurrency {
                            details: "failed to acquire sanitization semaphore".to_string(),
                        }
                    })?;

                    let result = Self::process_file(ctx, file.clone()).await;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = progress {
                        callback(SanitizeProgress {
                            current_file: Some(file),
                            completed: done,
                            total,
                            phase: SanitizePhase::Sanitizing,
                        });
                    }

                    Ok::<FileSanitizeResult, SanitizeError>(result)
                })
            })
            .collect();

        let task_results = try_join_all(tasks)
            .await
            .map_err(|e| SanitizeError::Concurrency {
                details: format!("task join error: {e}"),
            })?;

        let mut results = Vec::with_capacity(task_results.len());
        for result in task_results {
            results.push(result?);
        }
        Ok(results)
    }

    /// The per-document workflow. Every failure mode is folded into the
    /// result; only the surrounding batch machinery returns errors.
    async fn process_file(ctx: FileContext, path: PathBuf) -> FileSanitizeResult {
        let start = Instant::now();
        match Self::process_file_inner(&ctx, &path).await {
            Ok(mut result) => {
                result.duration = start.elapsed();
                result
            }
            Err(e) => FileSanitizeResult::error(path, e, start.elapsed()),
        }
    }

    async fn process_file_inner(
        ctx: &FileContext,
        path: &Path,
    ) -> Result<FileSanitizeResult> {
        let input = tokio::fs::read_to_string(path).await?;
        let mut doc = Document::parse(&input)?;

        let out_path = Self::output_path(ctx, path);
        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let (changes, trace) = match (&ctx.checker, ctx.backtrace) {
            (Some(checker), true) => {
                Self::normalize_with_backtrace(checker.as_ref(), &mut doc, &out_path).await?
            }
            _ => (pipeline::normalize(&mut doc)?, Vec::new()),
        };

        let serialized = doc.serialize().map_err(SanitizeError::from)?;
        tokio::fs::write(&out_path, &serialized).await?;

        let diff_path = out_path.with_extension("diff.html");
        let diff_html = report::render_diff_html(
            &input,
            &serialized,
            &path.file_name().unwrap_or_default().to_string_lossy(),
        );
        tokio::fs::write(&diff_path, diff_html).await?;

        let info = StyleInfo::from_document(&doc)?;
        let change_lines: Vec<String> = changes.iter().map(|c| c.to_string()).collect();

        let verdict = match &ctx.checker {
            Some(checker) => checker.check(&out_path).await.map_err(SanitizeError::from)?,
            None => None,
        };

        let status = match verdict {
            Some(diagnostic) => SanitizeStatus::Rejected { diagnostic },
            None if change_lines.is_empty() => SanitizeStatus::Clean,
            None => SanitizeStatus::Sanitized {
                change_count: change_lines.len(),
            },
        };

        Ok(FileSanitizeResult {
            path: path.to_path_buf(),
            status,
            entry: Some(IndexEntry {
                info,
                original: path.to_path_buf(),
                sanitized: out_path,
                diff: diff_path,
                changes: change_lines.clone(),
            }),
            changes: change_lines,
            duration: Duration::ZERO,
            trace,
        })
    }

    /// Backtrace mode: serialize and re-check after every rule so a
    /// persisting rejection can be pinned to the first rule that failed
    /// to clear it (or a new breakage to the rule that introduced it).
    /// The input itself is checked first as the baseline.
    async fn normalize_with_backtrace(
        checker: &dyn StyleChecker,
        doc: &mut Document,
        out_path: &Path,
    ) -> Result<(Vec<crate::rules::Change>, Vec<RuleTrace>)> {
        let mut all_changes = Vec::new();
        let mut trace = Vec::new();

        tokio::fs::write(out_path, doc.serialize()?).await?;
        trace.push(RuleTrace {
            rule: "(input)",
            change_count: 0,
            verdict: checker.check(out_path).await.map_err(SanitizeError::from)?,
        });

        for rule in RULES {
            let changes = (rule.apply)(doc)?;
            let change_count = changes.len();
            all_changes.extend(changes);

            tokio::fs::write(out_path, doc.serialize()?).await?;
            trace.push(RuleTrace {
                rule: rule.name,
                change_count,
                verdict: checker.check(out_path).await.map_err(SanitizeError::from)?,
            });
        }

        Ok((all_changes, trace))
    }

    /// Where a style's sanitized copy lands: the input's path relative to
    /// the styles directory, mirrored under the output directory.
    fn output_path(ctx: &FileContext, path: &Path) -> PathBuf {
        let relative = path
            .strip_prefix(&ctx.styles_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));
        ctx.out_dir.join(relative)
    }
}
