//! Discovery over a realistic style repository layout, including the
//! configured skip list expressed as exclude patterns.

mod common;

use std::collections::HashSet;
use std::path::PathBuf;

use common::test_helpers::{CLEAN_STYLE, MESSY_STYLE, write_style};
use sanitize_csl::FileDiscovery;
use tempfile::TempDir;

async fn style_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_style(dir.path(), "chinese/src/a/a.csl", CLEAN_STYLE).await;
    write_style(dir.path(), "chinese/src/b/b.csl", MESSY_STYLE).await;
    write_style(dir.path(), "chinese/src/self-invented/self-invented.csl", MESSY_STYLE).await;
    write_style(dir.path(), "chinese/src/b/README.md", "notes").await;
    write_style(dir.path(), "international/c.csl", CLEAN_STYLE).await;
    dir
}

fn names(files: &[PathBuf]) -> HashSet<String> {
    files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

#[tokio::test]
async fn discovers_all_styles_recursively() {
    let tree = style_tree().await;
    let files = FileDiscovery::new()
        .discover_files(tree.path())
        .await
        .unwrap();

    assert_eq!(files.len(), 4);
    let found = names(&files);
    assert!(found.contains("a.csl"));
    assert!(found.contains("b.csl"));
    assert!(found.contains("self-invented.csl"));
    assert!(found.contains("c.csl"));
    assert!(!found.contains("README.md"));
}

#[tokio::test]
async fn skip_list_excludes_unrepairable_styles() {
    let tree = style_tree().await;
    let files = FileDiscovery::new()
        .with_exclude_patterns(vec!["**/self-invented/**".to_string()])
        .unwrap()
        .discover_files(tree.path())
        .await
        .unwrap();

    assert_eq!(files.len(), 3);
    assert!(!names(&files).contains("self-invented.csl"));
}

#[tokio::test]
async fn include_patterns_narrow_the_run() {
    let tree = style_tree().await;
    let files = FileDiscovery::new()
        .with_include_patterns(vec!["**/chinese/**".to_string()])
        .unwrap()
        .discover_files(tree.path())
        .await
        .unwrap();

    assert_eq!(files.len(), 3);
    assert!(!names(&files).contains("c.csl"));
}

#[tokio::test]
async fn single_style_path_is_accepted_directly() {
    let tree = style_tree().await;
    let single = tree.path().join("international/c.csl");
    let files = FileDiscovery::new().discover_files(&single).await.unwrap();
    assert_eq!(files, vec![single]);
}
