//! Reporting layer: per-style diffs and the HTML/JSON indices of a batch
//! run.
//!
//! Everything here is a pure function from results to text; the engine
//! decides where the files land.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::json;
use similar::{ChangeTag, TextDiff};

use crate::error::{Result, SanitizeError};
use crate::style::StyleInfo;

/// One sanitized style in the batch indices.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub info: StyleInfo,
    pub original: PathBuf,
    pub sanitized: PathBuf,
    pub diff: PathBuf,
    /// Rendered change lines, each ending with its bracketed kind tag.
    pub changes: Vec<String>,
}

/// How index entries are ordered by title.
///
/// Collation is an explicit parameter of the sort, not ambient process
/// state. `Codepoint` is the portable approximation; a locale-aware
/// collator can be added as a variant without touching call sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Collation {
    #[default]
    Codepoint,
}

impl Collation {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::Codepoint => a.cmp(b),
        }
    }
}

/// Sort entries the way the style listing is browsed: GB/T 7714 editions
/// first (newest edition first), then titles not starting with a Latin
/// capital, then the rest; titles compare under the given collation
/// within each bucket.
pub fn sort_entries(entries: &mut [IndexEntry], collation: Collation) {
    let gbt = Regex::new(r"^GB/T 7714—(\d{4})(.*)$").expect("static pattern");

    let bucket = |title: &str| -> (u8, i64, String) {
        if let Some(caps) = gbt.captures(title) {
            let year: i64 = caps[1].parse().unwrap_or(0);
            (0, -year, caps[2].to_string())
        } else if !title.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            (1, 0, title.to_string())
        } else {
            (2, 0, title.to_string())
        }
    };

    entries.sort_by(|a, b| {
        let (ka, ya, ta) = bucket(&a.info.title);
        let (kb, yb, tb) = bucket(&b.info.title);
        ka.cmp(&kb)
            .then(ya.cmp(&yb))
            .then_with(|| collation.compare(&ta, &tb))
    });
}

/// Render a side-by-side HTML diff of the original and sanitized style.
pub fn render_diff_html(original: &str, sanitized: &str, title: &str) -> String {
    let diff = TextDiff::from_lines(original, sanitized);

    let mut rows = String::new();
    let groups = diff.grouped_ops(3);
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            rows.push_str(r#"<tr class="sep"><td colspan="4">&ctdot;</td></tr>"#);
            rows.push('\n');
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let (class, old_no, new_no) = match change.tag() {
                    ChangeTag::Equal => ("ctx", change.old_index(), change.new_index()),
                    ChangeTag::Delete => ("del", change.old_index(), None),
                    ChangeTag::Insert => ("ins", None, change.new_index()),
                };
                let number = |n: Option<usize>| match n {
                    Some(n) => (n + 1).to_string(),
                    None => String::new(),
                };
                rows.push_str(&format!(
                    "<tr class=\"{class}\"><td>{}</td><td>{}</td>\
                     <td>{}</td><td><pre>{}</pre></td></tr>\n",
                    number(old_no),
                    number(new_no),
                    match change.tag() {
                        ChangeTag::Equal => "&nbsp;",
                        ChangeTag::Delete => "-",
                        ChangeTag::Insert => "+",
                    },
                    html_escape(change.value().trim_end_matches('\n')),
                ));
            }
        }
    }
    if groups.is_empty() {
        rows.push_str(r#"<tr><td colspan="4">No changes.</td></tr>"#);
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>\n\
         table {{ border-collapse: collapse; font-family: monospace; }}\n\
         td {{ padding: 0 0.5em; vertical-align: top; }}\n\
         td pre {{ margin: 0; white-space: pre-wrap; }}\n\
         tr.del {{ background: #ffd9d9; }}\n\
         tr.ins {{ background: #d9ffd9; }}\n\
         tr.sep td {{ text-align: center; color: #888; }}\n\
         </style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n\
         <table>\n\
         <tr><th>Original</th><th>Sanitized</th><th></th><th></th></tr>\n\
         {rows}\
         </table>\n</body>\n</html>\n",
        title = html_escape(title),
        rows = rows,
    )
}

/// The human-readable `index.html` of a batch run.
pub fn make_human_index(entries: &[IndexEntry], dist_dir: &Path) -> Result<String> {
    let mut items = String::new();
    for entry in entries {
        let sanitized_url = relative_url(&entry.sanitized, dist_dir)?;
        let diff_url = relative_url(&entry.diff, dist_dir)?;
        let style_url = entry.info.id.replacen("http://", "https://", 1);

        let changes = if entry.changes.is_empty() {
            "<p>(no changes needed, usable as is)</p>".to_string()
        } else {
            let lines: String = entry
                .changes
                .iter()
                .map(|c| format!("<li>{}</li>\n", html_escape(c)))
                .collect();
            format!(
                "<details><summary>Summary of changes</summary>\n<ul>\n{lines}</ul>\n</details>"
            )
        };

        items.push_str(&format!(
            "<li>\n<p><strong><a href=\"{}\">{}</a></strong>\n\
             [<a href=\"{}\">download sanitized style</a> &middot; \
             <a href=\"{}\">view detailed changes</a>]</p>\n{}\n</li>\n",
            html_escape(&style_url),
            html_escape(&entry.info.title),
            html_escape(&sanitized_url),
            html_escape(&diff_url),
            changes,
        ));
    }

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Sanitized CSL styles</title>\n</head>\n<body>\n\
         <h1>Sanitized CSL styles</h1>\n\
         <p>CSL styles normalized for strict processors; every change is\n\
         recorded next to the style it applies to.</p>\n\
         <ul>\n{items}</ul>\n</body>\n</html>\n"
    ))
}

/// The machine-readable `index.json`: an id-keyed map with title, update
/// stamp, artifact URLs and change lines, in index order.
pub fn make_json_index(entries: &[IndexEntry], dist_dir: &Path) -> Result<String> {
    let mut map = serde_json::Map::new();
    for entry in entries {
        map.insert(
            entry.info.id.clone(),
            json!({
                "title": entry.info.title,
                "updated": entry.info.updated,
                "sanitized_url": relative_url(&entry.sanitized, dist_dir)?,
                "diff_url": relative_url(&entry.diff, dist_dir)?,
                "changes": entry.changes,
            }),
        );
    }
    serde_json::to_string_pretty(&serde_json::Value::Object(map)).map_err(|e| {
        SanitizeError::Report {
            details: e.to_string(),
        }
    })
}

fn relative_url(path: &Path, base: &Path) -> Result<String> {
    let rel = path.strip_prefix(base).map_err(|_| SanitizeError::Report {
        details: format!(
            "path {} is outside the output directory {}",
            path.display(),
            base.display()
        ),
    })?;
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok(format!("./{joined}"))
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
