//! # sanitize-csl Library
//!
//! Normalizes CSL styles authored for tolerant processors (citeproc-js
//! and its CSL-M dialect) so that a strict processor accepts them,
//! recording every change, with batch discovery, diff reports and
//! HTML/JSON indices.

pub mod checker;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod file_discovery;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod style;

pub use checker::{HayagrivaChecker, StyleChecker, extract_diagnostic};
pub use cli::{Cli, RunConfig, VerbosityLevel};
pub use config::{EnvProvider, FileConfig, SystemEnvProvider, apply_env};
pub use document::{CSL_NS, Document, ElementId, Node, Selector};
pub use engine::{
    EngineConfig, FileSanitizeResult, ProgressCallback, RuleTrace, SanitizeEngine, SanitizePhase,
    SanitizeProgress, SanitizeResults, SanitizeStatus,
};
pub use error::{CheckError, ConfigError, DocumentError, Result, SanitizeError};
pub use file_discovery::FileDiscovery;
pub use output::Output;
pub use pipeline::{RULES, normalize};
pub use report::{
    Collation, IndexEntry, make_human_index, make_json_index, render_diff_html, sort_entries,
};
pub use rules::{Change, ChangeKind, Rule};
pub use style::StyleInfo;
