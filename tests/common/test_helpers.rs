//! Shared fixtures for integration tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A style with nothing to repair.
pub const CLEAN_STYLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
  <info>
    <title>Acta Clean</title>
    <id>http://example.com/clean</id>
    <updated>2024-01-01T00:00:00+00:00</updated>
  </info>
  <macro name="author">
    <names variable="author"/>
  </macro>
  <bibliography>
    <layout>
      <text macro="author"/>
    </layout>
  </bibliography>
</style>
"#;

/// A style exercising several rules at once: a nonstandard et-al alias,
/// a localized layout, and an empty group.
pub const MESSY_STYLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
  <info>
    <title>Messy Journal</title>
    <id>http://example.com/messy</id>
    <updated>2024-02-02T00:00:00+00:00</updated>
  </info>
  <locale xml:lang="en">
    <terms>
      <term name="space-et-al"> et al.</term>
    </terms>
  </locale>
  <macro name="author">
    <names variable="author"/>
  </macro>
  <macro name="title">
    <group delimiter=", "></group>
    <text variable="title"/>
  </macro>
  <bibliography>
    <layout locale="en">
      <text macro="title"/>
    </layout>
    <layout>
      <text macro="title"/>
    </layout>
  </bibliography>
</style>
"#;

/// A style using self-invented vocabulary outside the curated rule list;
/// normalization leaves it untouched and the strict processor keeps
/// rejecting it.
pub const UNREPAIRABLE_STYLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
  <info>
    <title>Unrepairable</title>
    <id>http://example.com/unrepairable</id>
    <updated>2024-04-04T00:00:00+00:00</updated>
  </info>
  <macro name="container">
    <text variable="container-title-zh"/>
  </macro>
  <bibliography>
    <layout>
      <text macro="container"/>
    </layout>
  </bibliography>
</style>
"#;

/// A style whose bibliography is missing: a structural precondition
/// violation that must abort only this document.
pub const HEADLESS_STYLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
  <info>
    <title>Headless</title>
    <id>http://example.com/headless</id>
    <updated>2024-03-03T00:00:00+00:00</updated>
  </info>
  <citation>
    <layout><text variable="citation-number"/></layout>
  </citation>
</style>
"#;

/// Lay out a small style repository:
///
/// ```text
/// styles/
///   chinese/src/messy-journal/messy-journal.csl
///   chinese/src/acta-clean/acta-clean.csl
/// ```
pub async fn create_style_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_style(dir.path(), "chinese/src/messy-journal/messy-journal.csl", MESSY_STYLE).await;
    write_style(dir.path(), "chinese/src/acta-clean/acta-clean.csl", CLEAN_STYLE).await;
    dir
}

pub async fn write_style(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.unwrap();
    }
    tokio::fs::write(&path, content).await.unwrap();
    path
}
