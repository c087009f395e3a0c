use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

/// Main application configuration derived from CLI
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub styles_dir: PathBuf,
    pub out_dir: PathBuf,
    pub extensions: Vec<String>,
    pub threads: usize,
    pub verbose: bool,
    pub quiet: bool,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub progress: bool,
    pub fail_fast: bool,
    pub backtrace: bool,
    pub check: bool,
    pub checker_command: String,
    pub references: PathBuf,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            styles_dir: cli.path.clone(),
            out_dir: cli.out_dir.clone(),
            extensions: cli.get_extensions(),
            threads: cli.get_thread_count(),
            verbose: cli.verbose,
            quiet: cli.quiet,
            include_patterns: cli.include_patterns.clone(),
            exclude_patterns: cli.exclude_patterns.clone(),
            progress: cli.progress || (atty::is(atty::Stream::Stderr) && !cli.quiet),
            fail_fast: cli.fail_fast,
            backtrace: cli.backtrace,
            check: !cli.no_check,
            checker_command: cli.checker.clone(),
            references: cli.references.clone(),
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// CSL style sanitizer for strict processors
#[derive(Parser, Debug, Clone)]
#[command(name = "sanitize-csl")]
#[command(about = "Normalize CSL styles so a strict processor accepts them, recording every change")]
#[command(version)]
pub struct Cli {
    /// Path to scan for CSL styles (directory or file)
    #[arg(help = "Directory or file to sanitize")]
    pub path: PathBuf,

    /// Directory receiving sanitized styles, diffs and indices
    #[arg(short = 'o', long = "out-dir", default_value = "dist")]
    pub out_dir: PathBuf,

    /// File extensions to process (comma-separated)
    #[arg(
        short = 'e',
        long = "extensions",
        default_value = "csl",
        help = "File extensions to process (e.g., 'csl,xml')"
    )]
    pub extensions: String,

    /// Number of concurrent sanitization tasks
    #[arg(
        short = 't',
        long = "threads",
        help = "Number of concurrent sanitization tasks"
    )]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Include file patterns (glob syntax)
    #[arg(long = "include", action = clap::ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Exclude file patterns (glob syntax)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Show progress indicators
    #[arg(long = "progress")]
    pub progress: bool,

    /// Stop on the first rejected or failed style
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Re-check the style after every rule to locate the repair or the
    /// breakage (slow; one checker invocation per rule per style)
    #[arg(long = "backtrace")]
    pub backtrace: bool,

    /// Skip the external checker entirely
    #[arg(long = "no-check", conflicts_with = "backtrace")]
    pub no_check: bool,

    /// Checker binary used as the accept/reject authority
    #[arg(long = "checker", default_value = "hayagriva")]
    pub checker: String,

    /// Bibliography file handed to the checker
    #[arg(long = "references", default_value = "references.yaml")]
    pub references: PathBuf,

    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn get_extensions(&self) -> Vec<String> {
        self.extensions
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.path.exists() {
            return Err(format!("Path does not exist: {}", self.path.display()));
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn get_thread_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}
