//! Checker doubles for integration tests.

use std::path::Path;

use sanitize_csl::{CheckError, StyleChecker};

mockall::mock! {
    pub Checker {}

    #[async_trait::async_trait]
    impl StyleChecker for Checker {
        async fn check(&self, csl_path: &Path) -> Result<Option<String>, CheckError>;
    }
}

/// A checker that accepts everything.
pub fn accept_all() -> MockChecker {
    let mut mock = MockChecker::new();
    mock.expect_check().returning(|_| Ok(None));
    mock
}

/// A checker that rejects any style whose serialized form contains one of
/// the given fragments, mimicking a strict processor's enum errors.
pub fn reject_fragments(fragments: &[&str]) -> MockChecker {
    let fragments: Vec<String> = fragments.iter().map(|s| s.to_string()).collect();
    let mut mock = MockChecker::new();
    mock.expect_check().returning(move |path| {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        for fragment in &fragments {
            if content.contains(fragment.as_str()) {
                return Ok(Some(format!(
                    "unknown variant `{fragment}`, expected one of `et al`, `et-al`"
                )));
            }
        }
        Ok(None)
    });
    mock
}
