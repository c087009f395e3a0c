//! The pipeline driver: the fixed rule order and the `normalize` entry
//! point.
//!
//! The rule list is a compile-time table, not a plugin registry; the set
//! of known nonstandard patterns is curated and changes rarely. Ordering
//! is load-bearing: the earlier rules clear the parse-failure classes a
//! strict processor reports first, and some rules create the
//! preconditions later ones assert.

use crate::document::Document;
use crate::error::Result;
use crate::rules::{self, Change, Rule};

/// The normalization rules in their required execution order.
pub const RULES: &[Rule] = &[
    Rule {
        name: "remove-citation-range-delimiter-terms",
        rationale: "term `citation-range-delimiter` is an undocumented citeproc-js feature",
        apply: rules::remove_citation_range_delimiter_terms,
    },
    Rule {
        name: "remove-large-long-ordinal-terms",
        rationale: "CSL defines long-ordinal terms only up to 10",
        apply: rules::remove_large_long_ordinal_terms,
    },
    Rule {
        name: "remove-institution-in-names",
        rationale: "`<institution>` inside `<names>` is a CSL-M extension",
        apply: rules::remove_institution_in_names,
    },
    Rule {
        name: "drop-empty-text-case-attrs",
        rationale: "`text-case` must be one of a fixed enumeration or absent",
        apply: rules::drop_empty_text_case_attrs,
    },
    Rule {
        name: "fix-deprecated-term-unpublished",
        rationale: "`<text term=\"unpublished\">` is a deprecated CSL-M shorthand",
        apply: rules::fix_deprecated_term_unpublished,
    },
    Rule {
        name: "lowercase-locator-attrs",
        rationale: "locator names are lowercase in the CSL specification",
        apply: rules::lowercase_locator_attrs,
    },
    Rule {
        name: "replace-nonstandard-original-variables",
        rationale: "`original-*` variables are undocumented citeproc-js features",
        apply: rules::replace_nonstandard_original_variables,
    },
    Rule {
        name: "remove-nationality-variables",
        rationale: "variable `nationality` has no standard equivalent",
        apply: rules::remove_nationality_variables,
    },
    Rule {
        name: "drop-empty-else-branches",
        rationale: "`<else>` must contain at least one rendering element",
        apply: rules::drop_empty_else_branches,
    },
    Rule {
        name: "drop-empty-groups",
        rationale: "`<group>` must contain at least one rendering element",
        apply: rules::drop_empty_groups,
    },
    Rule {
        name: "fill-empty-layouts",
        rationale: "`<layout>` must contain at least one rendering element",
        apply: rules::fill_empty_layouts,
    },
    Rule {
        name: "remove-duplicate-layouts",
        rationale: "one `<layout>` per container; localized layouts are a CSL-M extension",
        apply: rules::remove_duplicate_layouts,
    },
    Rule {
        name: "unify-et-al-terms",
        rationale: "`space-et-al` and localized et-al aliases are site conventions",
        apply: rules::unify_et_al_terms,
    },
];

/// Normalize a style in place, returning every change made, in rule
/// order.
///
/// Call at most once per document: rules are not designed to be reapplied
/// to their own output, although correctly normalized input makes every
/// rule a no-op, so idempotence holds as a property.
pub fn normalize(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for rule in RULES {
        changes.extend((rule.apply)(doc)?);
    }
    Ok(changes)
}
