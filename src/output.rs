//! Console output formatting for batch results.

use atty;
use std::time::Duration;

use crate::cli::VerbosityLevel;
use crate::engine::{FileSanitizeResult, SanitizeResults, SanitizeStatus};

/// Simple output formatter for human-readable results
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    #[cfg(test)]
    fn plain(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_results(&self, results: &SanitizeResults) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                if results.has_failures() {
                    output.push_str(&format!(
                        "Rejected: {} Errors: {}\n",
                        results.rejected_files, results.error_files
                    ));
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose | VerbosityLevel::Debug => {
                for file_result in &results.file_results {
                    let show = self.verbosity >= VerbosityLevel::Verbose
                        || !file_result.status.is_accepted()
                        || matches!(file_result.status, SanitizeStatus::Sanitized { .. });
                    if show {
                        output.push_str(&self.format_file_result(file_result));
                        output.push('\n');
                    }
                }
                output.push_str(&self.format_summary(results));
            }
        }

        output
    }

    pub fn format_file_result(&self, result: &FileSanitizeResult) -> String {
        let path_display = result.path.display();
        let duration_str = format_duration(result.duration);

        let mut output = match &result.status {
            SanitizeStatus::Clean => format!(
                "{}  {} ({})",
                self.colorize("✓ CLEAN", "32"),
                path_display,
                duration_str
            ),
            SanitizeStatus::Sanitized { change_count } => format!(
                "{}  {} ({}) - {} change{}",
                self.colorize("✎ SANITIZED", "32"),
                path_display,
                duration_str,
                change_count,
                if *change_count == 1 { "" } else { "s" }
            ),
            SanitizeStatus::Rejected { diagnostic } => format!(
                "{}  {} ({}) - {}",
                self.colorize("✗ REJECTED", "31"),
                path_display,
                duration_str,
                diagnostic
            ),
            SanitizeStatus::Error { message } => format!(
                "{}  {} ({}) - {}",
                self.colorize("⚠ ERROR", "33"),
                path_display,
                duration_str,
                message
            ),
        };

        if self.verbosity >= VerbosityLevel::Verbose {
            for change in &result.changes {
                output.push_str(&format!("\n    {}", change));
            }
            for step in &result.trace {
                let verdict = match &step.verdict {
                    None => "accepted".to_string(),
                    Some(diag) => format!("rejected: {diag}"),
                };
                output.push_str(&format!(
                    "\n    after {} ({} change{}): {}",
                    step.rule,
                    step.change_count,
                    if step.change_count == 1 { "" } else { "s" },
                    verdict
                ));
            }
        }
        output
    }

    fn format_summary(&self, results: &SanitizeResults) -> String {
        let mut output = String::new();
        output.push_str("Sanitization Summary:\n");
        output.push_str(&format!("  Total styles: {}\n", results.total_files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Clean:", "32"),
            results.clean_files
        ));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Sanitized:", "32"),
            results.sanitized_files
        ));

        if results.rejected_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Rejected:", "31"),
                results.rejected_files
            ));
        }
        if results.error_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Errors:", "33"),
                results.error_files
            ));
        }

        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(results.total_duration)
        ));
        output
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
