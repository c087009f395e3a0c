//! The normalization rule set.
//!
//! Each rule detects one nonstandard pattern, repairs the document in
//! place, and describes every mutation it performed. Rules are stateless
//! and independent; the fixed application order lives in
//! [`crate::pipeline`].

use std::fmt;

use crate::document::{Document, ElementId, Selector};
use crate::error::{Result, SanitizeError};
use crate::style;

/// Why a change was made, as a closed set. The bracketed tag is appended
/// to every change message and doubles as a machine-groupable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The pattern violates the CSL specification outright.
    FollowsSpec,
    /// The pattern is part of the CSL-M extension dialect.
    DiscardsCslExtension,
    /// The pattern is a deprecated CSL-M extension with a spec-conforming
    /// equivalent.
    FixesDeprecatedExtension,
    /// The pattern is an undocumented citeproc-js feature.
    DiscardsProcessorExtension,
    /// The pattern is self-invented vocabulary of the style repository.
    DiscardsSiteConvention,
    /// The pattern appears in the wild but matches no known extension.
    DiscardsUnknownExtension,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ChangeKind::FollowsSpec => "Follow CSL spec",
            ChangeKind::DiscardsCslExtension => "Discard CSL-M extension",
            ChangeKind::FixesDeprecatedExtension => "Fix CSL-M deprecated extension",
            ChangeKind::DiscardsProcessorExtension => "Discard citeproc-js extension",
            ChangeKind::DiscardsSiteConvention => "Discard site convention",
            ChangeKind::DiscardsUnknownExtension => "Discard unknown extension",
        };
        f.write_str(tag)
    }
}

/// One mutation performed by a rule: a free-text description plus its
/// [`ChangeKind`]. Created at the moment of mutation, never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub text: String,
    pub kind: ChangeKind,
}

impl Change {
    pub fn new(text: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.text, self.kind)
    }
}

/// A normalization rule: a named, stateless transformation over a
/// document.
pub struct Rule {
    pub name: &'static str,
    /// Why the pattern is nonstandard, deprecated, or extension-only.
    pub rationale: &'static str,
    pub apply: fn(&mut Document) -> Result<Vec<Change>>,
}

/// Remove `<term name="citation-range-delimiter">`.
///
/// An undocumented feature of citeproc-js.
/// https://github.com/zotero-chinese/styles/discussions/439
pub fn remove_citation_range_delimiter_terms(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    let selector = Selector::tag("term").with_attr_eq("name", "citation-range-delimiter");

    // There is at most one such term per style, but removing in a loop
    // costs nothing and keeps the rule total.
    while let Some(term) = doc.find_first(doc.root(), &selector) {
        let text = doc.text(term).unwrap_or_default();
        let terms = doc
            .parent(term)
            .filter(|&p| doc.name(p) == "terms")
            .ok_or_else(|| {
                SanitizeError::precondition("citation-range-delimiter term has no <terms> wrapper")
            })?;

        doc.remove_child(terms, term);
        if doc.is_childless(terms) {
            let locale = doc.parent(terms).ok_or_else(|| {
                SanitizeError::precondition("<terms> wrapper has no parent <locale>")
            })?;
            // Keep the <locale> even if it has become empty now.
            doc.remove_child(locale, terms);
            changes.push(Change::new(
                format!("Removed the term citation-range-delimiter ({text}) and its wrapping tag."),
                ChangeKind::DiscardsProcessorExtension,
            ));
        } else {
            changes.push(Change::new(
                format!("Removed the term citation-range-delimiter ({text})."),
                ChangeKind::DiscardsProcessorExtension,
            ));
        }
    }
    Ok(changes)
}

/// Remove `<term name="long-ordinal-{n}">` where n > 10. The CSL term
/// vocabulary only defines long-ordinal-01 through long-ordinal-10.
/// https://docs.citationstyles.org/en/stable/specification.html#long-ordinals
pub fn remove_large_long_ordinal_terms(doc: &mut Document) -> Result<Vec<Change>> {
    const OVERFLOW: [&str; 2] = ["long-ordinal-11", "long-ordinal-12"];

    let mut changes = Vec::new();
    for terms in doc.containers_of(doc.root(), &Selector::tag("term").with_attr("name")) {
        if doc.name(terms) != "terms" {
            continue;
        }
        for term in doc.find_children(terms, &Selector::tag("term").with_attr("name")) {
            let Some(name) = doc.attr(term, "name").map(str::to_string) else {
                continue;
            };
            if !OVERFLOW.contains(&name.as_str()) {
                continue;
            }
            let text = doc.text(term).unwrap_or_default();
            doc.remove_child(terms, term);
            if doc.is_childless(terms) {
                let locale = doc.parent(terms).ok_or_else(|| {
                    SanitizeError::precondition("<terms> wrapper has no parent <locale>")
                })?;
                // Keep the <locale> even if it has become empty now.
                doc.remove_child(locale, terms);
                changes.push(Change::new(
                    format!("Removed the term {name} ({text}) and its wrapping tag."),
                    ChangeKind::DiscardsUnknownExtension,
                ));
            } else {
                changes.push(Change::new(
                    format!("Removed the term {name} ({text})."),
                    ChangeKind::DiscardsUnknownExtension,
                ));
            }
        }
    }
    Ok(changes)
}

/// Remove `<institution>` in `<names>`.
///
/// Specified in the CSL-M extension.
/// https://citeproc-js.readthedocs.io/en/latest/csl-m/index.html#cs-institution-and-friends-extension
pub fn remove_institution_in_names(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for macro_id in style::macros(doc) {
        let name = style::macro_name(doc, macro_id);
        for names in doc.containers_of(macro_id, &Selector::tag("institution")) {
            while let Some(institution) = doc
                .find_children(names, &Selector::tag("institution"))
                .into_iter()
                .next()
            {
                doc.remove_child(names, institution);
                changes.push(Change::new(
                    format!("Removed the institution in names of a macro ({name})."),
                    ChangeKind::DiscardsCslExtension,
                ));
            }
        }
    }
    Ok(changes)
}

/// Drop empty `text-case` attributes. The schema requires one of a fixed
/// enumeration or absence.
/// https://docs.citationstyles.org/en/stable/specification.html#text-case
pub fn drop_empty_text_case_attrs(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for macro_id in style::macros(doc) {
        let name = style::macro_name(doc, macro_id);
        for elem in doc.find_all(macro_id, &Selector::any().with_attr_eq("text-case", "")) {
            doc.remove_attr(elem, "text-case");
            changes.push(Change::new(
                format!("Dropped the empty text-case attribute in a macro ({name})."),
                ChangeKind::FollowsSpec,
            ));
        }
    }
    Ok(changes)
}

/// Fix the deprecated term `unpublished` with the value `Unpublished`.
///
/// Specified in the CSL-M extension, but deprecated there too.
/// https://citeproc-js.readthedocs.io/en/latest/csl-m/index.html#unpublished-extension
pub fn fix_deprecated_term_unpublished(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for macro_id in style::macros(doc) {
        let name = style::macro_name(doc, macro_id);
        for text in doc.find_all(
            macro_id,
            &Selector::tag("text").with_attr_eq("term", "unpublished"),
        ) {
            doc.remove_attr(text, "term");
            doc.set_attr(text, "value", "Unpublished");
            changes.push(Change::new(
                format!(
                    "Fixed the deprecated term `unpublished` with the value `Unpublished` \
                     in a macro ({name})."
                ),
                ChangeKind::FixesDeprecatedExtension,
            ));
        }
    }
    Ok(changes)
}

/// Convert locator attributes to lowercase.
/// https://docs.citationstyles.org/en/stable/specification.html#locators
pub fn lowercase_locator_attrs(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for macro_id in style::macros(doc) {
        let name = style::macro_name(doc, macro_id);
        for elem in doc.find_all(macro_id, &Selector::any().with_attr("locator")) {
            let Some(locator) = doc.attr(elem, "locator").map(str::to_string) else {
                continue;
            };
            let lowered = locator.to_lowercase();
            if !locator.is_empty() && locator != lowered {
                doc.set_attr(elem, "locator", &lowered);
                changes.push(Change::new(
                    format!(
                        "Lowercased the locator attribute ({locator} -> {lowered}) \
                         in a macro ({name})."
                    ),
                    ChangeKind::FollowsSpec,
                ));
            }
        }
    }
    Ok(changes)
}

/// The nonstandard `original-*` variables with a standard un-prefixed
/// equivalent.
const ORIGINAL_VARIABLES: [&str; 9] = [
    "original-container-title",
    "original-container-title-short",
    "original-genre",
    "original-event-title",
    "original-event-place",
    "original-editor",
    "original-status",
    "original-issue",
    "original-jurisdiction",
];

/// Replace non-standard `original-*` variables like
/// `original-container-title` with their un-original counterparts.
///
/// They might be undocumented features of citeproc-js.
/// https://github.com/zotero-chinese/styles/pull/518
pub fn replace_nonstandard_original_variables(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for macro_id in style::macros(doc) {
        let name = style::macro_name(doc, macro_id);
        for elem in doc.find_all(macro_id, &Selector::any().with_attr("variable")) {
            let Some(raw) = doc.attr(elem, "variable").map(str::to_string) else {
                continue;
            };

            // `<if variable="…" match="…">` may hold several variables.
            let mut tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
            let mut replaced = false;
            for token in &mut tokens {
                if !ORIGINAL_VARIABLES.contains(&token.as_str()) {
                    continue;
                }
                let repl = token
                    .strip_prefix("original-")
                    .unwrap_or(token.as_str())
                    .to_string();
                changes.push(Change::new(
                    format!("Replaced the variable `{token}` with `{repl}` in a macro ({name})."),
                    ChangeKind::DiscardsProcessorExtension,
                ));
                *token = repl;
                replaced = true;
            }
            if replaced {
                doc.set_attr(elem, "variable", &tokens.join(" "));
            }
        }
    }
    Ok(changes)
}

/// Remove rendering elements whose variable is exactly `nationality`.
/// Self-invented vocabulary with no standard equivalent, so the element
/// is dropped rather than renamed.
pub fn remove_nationality_variables(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for macro_id in style::macros(doc) {
        let name = style::macro_name(doc, macro_id);
        for elem in doc.find_all(
            macro_id,
            &Selector::any().with_attr_eq("variable", "nationality"),
        ) {
            let parent = doc.parent(elem).ok_or_else(|| {
                SanitizeError::precondition("nationality rendering element has no parent")
            })?;
            doc.remove_child(parent, elem);
            changes.push(Change::new(
                format!("Removed the element with the variable `nationality` in a macro ({name})."),
                ChangeKind::DiscardsSiteConvention,
            ));
        }
    }
    Ok(changes)
}

/// Drop empty `<else>` branches.
///
/// > As an empty `cs:else` element would be superfluous, `cs:else` must
/// > contain at least one rendering element.
/// https://docs.citationstyles.org/en/stable/specification.html#choose
pub fn drop_empty_else_branches(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for macro_id in style::macros(doc) {
        let name = style::macro_name(doc, macro_id);
        for choose in doc.containers_of(macro_id, &Selector::tag("else")) {
            for else_branch in doc.find_children(choose, &Selector::tag("else")) {
                // No children, or only comments: nothing would render.
                if doc.has_no_element_children(else_branch) {
                    doc.remove_child(choose, else_branch);
                    changes.push(Change::new(
                        format!("Dropped the empty `<else>` branch in a macro ({name})."),
                        ChangeKind::FollowsSpec,
                    ));
                }
            }
        }
    }
    Ok(changes)
}

/// Drop empty `<group>` elements.
///
/// > The `cs:group` rendering element must contain one or more rendering
/// > elements.
/// https://docs.citationstyles.org/en/stable/specification.html#group
pub fn drop_empty_groups(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for macro_id in style::macros(doc) {
        let name = style::macro_name(doc, macro_id);
        for parent in doc.containers_of(macro_id, &Selector::tag("group")) {
            for group in doc.find_children(parent, &Selector::tag("group")) {
                if doc.has_no_element_children(group) {
                    doc.remove_child(parent, group);
                    changes.push(Change::new(
                        format!("Dropped an empty `<group>` in a macro ({name})."),
                        ChangeKind::FollowsSpec,
                    ));
                }
            }
        }
    }
    Ok(changes)
}

/// Fill empty `<layout>` elements with an empty `<text>` element.
///
/// > The `cs:layout` rendering element is a required child element of
/// > `cs:citation` and `cs:bibliography`. It must contain one or more of
/// > the other rendering elements.
/// https://docs.citationstyles.org/en/stable/specification.html#layout-1
pub fn fill_empty_layouts(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for (tag, container) in layout_containers(doc)? {
        for layout in doc.find_children(container, &Selector::tag("layout")) {
            if doc.is_childless(layout) {
                doc.append_element(layout, "text", &[("value", "")]);
                changes.push(Change::new(
                    format!("Filled the empty `<layout>` with an empty `<text>` for {tag}."),
                    ChangeKind::FollowsSpec,
                ));
            }
        }
    }
    Ok(changes)
}

/// Remove additional, locale-qualified `<layout>` elements in
/// `<bibliography>` and `<citation>`, then enforce that exactly one
/// layout remains per container.
///
/// Multiple layouts are specified in the CSL-M extension.
/// https://citeproc-js.readthedocs.io/en/latest/csl-m/index.html#cs-layout-extension
pub fn remove_duplicate_layouts(doc: &mut Document) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    for (tag, container) in layout_containers(doc)? {
        for layout in doc.find_children(container, &Selector::tag("layout")) {
            if let Some(lang) = doc.attr(layout, "locale").map(str::to_string) {
                doc.remove_child(container, layout);
                changes.push(Change::new(
                    format!("Removed the localized ({lang}) layout for {tag}."),
                    ChangeKind::DiscardsCslExtension,
                ));
            }
        }
        let remaining = doc.find_children(container, &Selector::tag("layout")).len();
        if remaining != 1 {
            return Err(SanitizeError::precondition(format!(
                "expected exactly one <layout> in <{tag}> after removing localized layouts, \
                 found {remaining}"
            )));
        }
    }
    Ok(changes)
}

/// Unify nonstandard et-al term aliases into the canonical `et-al`, both
/// where declared as `<term name="…">` and where referenced via
/// `<et-al term="…">`.
///
/// These aliases might be undocumented citeproc-js features; they only
/// appear as self-invented vocabulary of the style repository.
/// https://github.com/zotero-chinese/styles/pull/518
pub fn unify_et_al_terms(doc: &mut Document) -> Result<Vec<Change>> {
    const ALIASES: [&str; 4] = ["space-et-al", "en-et-al", "zh-et-al", "et-al-zh"];

    let mut changes = Vec::new();
    for term in doc.find_all(doc.root(), &Selector::tag("term").with_attr("name")) {
        let Some(name) = doc.attr(term, "name").map(str::to_string) else {
            continue;
        };
        if ALIASES.contains(&name.as_str()) {
            let text = doc.text(term).unwrap_or_default();
            doc.set_attr(term, "name", "et-al");
            changes.push(Change::new(
                format!("Replaced the term name `{name}` with `et-al` ({text})."),
                ChangeKind::DiscardsSiteConvention,
            ));
        }
    }
    for et_al in doc.find_all(doc.root(), &Selector::tag("et-al").with_attr("term")) {
        let Some(term) = doc.attr(et_al, "term").map(str::to_string) else {
            continue;
        };
        if ALIASES.contains(&term.as_str()) {
            doc.set_attr(et_al, "term", "et-al");
            changes.push(Change::new(
                format!("Replaced the term `{term}` referenced by `<et-al>` with `et-al`."),
                ChangeKind::DiscardsSiteConvention,
            ));
        }
    }
    Ok(changes)
}

/// The two layout containers in rule order: `bibliography` is required,
/// `citation` only processed when present (bibliography-only styles).
fn layout_containers(doc: &Document) -> Result<Vec<(&'static str, ElementId)>> {
    let mut containers = vec![("bibliography", style::bibliography(doc)?)];
    if let Some(citation) = style::citation(doc) {
        containers.push(("citation", citation));
    }
    Ok(containers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Document {
        Document::parse(&format!(
            r#"<style xmlns="http://purl.org/net/xbiblio/csl">{body}</style>"#
        ))
        .unwrap()
    }

    fn texts(changes: &[Change]) -> Vec<String> {
        changes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_citation_range_delimiter_with_wrapper_cleanup() {
        let mut d = doc(
            r#"<locale xml:lang="zh"><terms>
                 <term name="citation-range-delimiter">,</term>
               </terms></locale>"#,
        );
        let changes = remove_citation_range_delimiter_terms(&mut d).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(
            changes[0]
                .to_string()
                .ends_with("and its wrapping tag. [Discard citeproc-js extension]"),
            "got: {}",
            changes[0]
        );

        // The <terms> wrapper is gone, the <locale> is intentionally kept.
        assert!(
            d.find_first(d.root(), &Selector::tag("terms")).is_none()
        );
        assert!(
            d.find_first(d.root(), &Selector::tag("locale")).is_some()
        );
    }

    #[test]
    fn test_citation_range_delimiter_keeps_nonempty_wrapper() {
        let mut d = doc(
            r#"<locale><terms>
                 <term name="citation-range-delimiter">–</term>
                 <term name="et-al">et al.</term>
               </terms></locale>"#,
        );
        let changes = remove_citation_range_delimiter_terms(&mut d).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].text.contains("wrapping tag"));
        assert!(d.find_first(d.root(), &Selector::tag("terms")).is_some());
    }

    #[test]
    fn test_citation_range_delimiter_noop_without_match() {
        let mut d = doc(r#"<locale><terms><term name="et-al">et al.</term></terms></locale>"#);
        assert!(
            remove_citation_range_delimiter_terms(&mut d)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_long_ordinal_overflow_removal() {
        let mut d = doc(
            r#"<locale><terms>
                 <term name="long-ordinal-10">10th</term>
                 <term name="long-ordinal-11">11th</term>
                 <term name="long-ordinal-12">12th</term>
               </terms></locale>"#,
        );
        let changes = remove_large_long_ordinal_terms(&mut d).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes[0].text.contains("long-ordinal-11 (11th)"));
        assert!(changes[1].text.contains("long-ordinal-12 (12th)"));
        assert_eq!(changes[0].kind, ChangeKind::DiscardsUnknownExtension);
        // long-ordinal-10 is standard vocabulary and survives.
        assert!(
            d.find_first(
                d.root(),
                &Selector::tag("term").with_attr_eq("name", "long-ordinal-10")
            )
            .is_some()
        );
    }

    #[test]
    fn test_long_ordinal_wrapper_cleanup_on_last_term() {
        let mut d = doc(
            r#"<locale><terms>
                 <term name="long-ordinal-11">11th</term>
                 <term name="long-ordinal-12">12th</term>
               </terms></locale>"#,
        );
        let changes = remove_large_long_ordinal_terms(&mut d).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(!changes[0].text.contains("wrapping tag"));
        assert!(changes[1].text.contains("wrapping tag"));
        assert!(d.find_first(d.root(), &Selector::tag("terms")).is_none());
        assert!(d.find_first(d.root(), &Selector::tag("locale")).is_some());
    }

    #[test]
    fn test_institution_removal() {
        let mut d = doc(
            r#"<macro name="author">
                 <names variable="author">
                   <institution institution-parts="long"/>
                   <name/>
                 </names>
               </macro>"#,
        );
        let changes = remove_institution_in_names(&mut d).unwrap();
        assert_eq!(
            texts(&changes),
            vec!["Removed the institution in names of a macro (author). [Discard CSL-M extension]"]
        );
        assert!(
            d.find_first(d.root(), &Selector::tag("institution"))
                .is_none()
        );
        assert!(d.find_first(d.root(), &Selector::tag("name")).is_some());
    }

    #[test]
    fn test_institution_outside_macro_untouched() {
        let mut d = doc(r#"<citation><layout><names><institution/></names></layout></citation>"#);
        assert!(remove_institution_in_names(&mut d).unwrap().is_empty());
        assert!(
            d.find_first(d.root(), &Selector::tag("institution"))
                .is_some()
        );
    }

    #[test]
    fn test_empty_text_case_dropped_nonempty_kept() {
        let mut d = doc(
            r#"<macro name="title">
                 <text variable="title" text-case=""/>
                 <text variable="container-title" text-case="title"/>
               </macro>"#,
        );
        let changes = drop_empty_text_case_attrs(&mut d).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::FollowsSpec);

        let remaining = d.find_all(d.root(), &Selector::any().with_attr("text-case"));
        assert_eq!(remaining.len(), 1);
        assert_eq!(d.attr(remaining[0], "text-case"), Some("title"));
    }

    #[test]
    fn test_unpublished_term_rewrite() {
        let mut d = doc(
            r#"<macro name="status"><text term="unpublished" prefix=" "/></macro>"#,
        );
        let changes = fix_deprecated_term_unpublished(&mut d).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::FixesDeprecatedExtension);

        let text = d.find_first(d.root(), &Selector::tag("text")).unwrap();
        assert_eq!(d.attr(text, "term"), None);
        assert_eq!(d.attr(text, "value"), Some("Unpublished"));
        assert_eq!(d.attr(text, "prefix"), Some(" "));
    }

    #[test]
    fn test_locator_lowercasing() {
        let mut d = doc(
            r#"<macro name="pages">
                 <label variable="locator" locator="Page"/>
                 <label variable="locator" locator="chapter"/>
                 <label variable="locator" locator=""/>
               </macro>"#,
        );
        let changes = lowercase_locator_attrs(&mut d).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].text.contains("(Page -> page)"));

        for elem in d.find_all(d.root(), &Selector::any().with_attr("locator")) {
            let v = d.attr(elem, "locator").unwrap();
            assert_eq!(v, v.to_lowercase());
        }
    }

    #[test]
    fn test_original_variable_rewriting_single() {
        let mut d = doc(
            r#"<macro name="container"><text variable="original-container-title"/></macro>"#,
        );
        let changes = replace_nonstandard_original_variables(&mut d).unwrap();
        assert_eq!(
            texts(&changes),
            vec![
                "Replaced the variable `original-container-title` with `container-title` \
                 in a macro (container). [Discard citeproc-js extension]"
            ]
        );
        let text = d.find_first(d.root(), &Selector::tag("text")).unwrap();
        assert_eq!(d.attr(text, "variable"), Some("container-title"));
    }

    #[test]
    fn test_original_variable_rewriting_multi_token() {
        let mut d = doc(
            r#"<macro name="m"><choose>
                 <if variable="original-genre title original-status" match="any"/>
               </choose></macro>"#,
        );
        let changes = replace_nonstandard_original_variables(&mut d).unwrap();
        assert_eq!(changes.len(), 2);

        let if_elem = d.find_first(d.root(), &Selector::tag("if")).unwrap();
        assert_eq!(d.attr(if_elem, "variable"), Some("genre title status"));
    }

    #[test]
    fn test_original_variable_totality() {
        let mut d = doc(&format!(
            r#"<macro name="m"><if variable="{}" match="any"/></macro>"#,
            ORIGINAL_VARIABLES.join(" ")
        ));
        let changes = replace_nonstandard_original_variables(&mut d).unwrap();
        assert_eq!(changes.len(), ORIGINAL_VARIABLES.len());

        let if_elem = d.find_first(d.root(), &Selector::tag("if")).unwrap();
        let rewritten = d.attr(if_elem, "variable").unwrap();
        for token in rewritten.split_whitespace() {
            assert!(!ORIGINAL_VARIABLES.contains(&token), "leftover: {token}");
        }
    }

    #[test]
    fn test_nationality_removal_is_exact_match_only() {
        let mut d = doc(
            r#"<macro name="m">
                 <group><text variable="nationality"/></group>
                 <choose><if variable="nationality title" match="any"/></choose>
               </macro>"#,
        );
        let changes = remove_nationality_variables(&mut d).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::DiscardsSiteConvention);

        // The multi-variable predicate is out of this rule's scope.
        assert!(d.find_first(d.root(), &Selector::tag("if")).is_some());
        assert!(d.find_first(d.root(), &Selector::tag("text")).is_none());
    }

    #[test]
    fn test_empty_else_removal_comment_only() {
        let mut d = doc(
            r#"<macro name="m"><choose>
                 <if variable="title"><text variable="title"/></if>
                 <else><!-- nothing yet --></else>
               </choose></macro>"#,
        );
        let changes = drop_empty_else_branches(&mut d).unwrap();
        assert_eq!(
            texts(&changes),
            vec!["Dropped the empty `<else>` branch in a macro (m). [Follow CSL spec]"]
        );
        assert!(d.find_first(d.root(), &Selector::tag("else")).is_none());
        assert!(d.find_first(d.root(), &Selector::tag("if")).is_some());
    }

    #[test]
    fn test_nonempty_else_kept() {
        let mut d = doc(
            r#"<macro name="m"><choose>
                 <if variable="title"/>
                 <else><text variable="note"/></else>
               </choose></macro>"#,
        );
        assert!(drop_empty_else_branches(&mut d).unwrap().is_empty());
        assert!(d.find_first(d.root(), &Selector::tag("else")).is_some());
    }

    #[test]
    fn test_empty_group_removal() {
        let mut d = doc(
            r#"<macro name="m">
                 <group delimiter=", "><!-- todo --></group>
                 <group><text variable="title"/></group>
               </macro>"#,
        );
        let changes = drop_empty_groups(&mut d).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::FollowsSpec);
        assert_eq!(d.find_all(d.root(), &Selector::tag("group")).len(), 1);
    }

    #[test]
    fn test_fill_empty_layouts() {
        let mut d = doc(
            r#"<bibliography><layout/></bibliography>
               <citation><layout><text variable="citation-number"/></layout></citation>"#,
        );
        let changes = fill_empty_layouts(&mut d).unwrap();
        assert_eq!(
            texts(&changes),
            vec![
                "Filled the empty `<layout>` with an empty `<text>` for bibliography. \
                 [Follow CSL spec]"
            ]
        );

        let bib = style::bibliography(&d).unwrap();
        let layout = d.find_children(bib, &Selector::tag("layout"))[0];
        let filler = d.find_children(layout, &Selector::tag("text"));
        assert_eq!(filler.len(), 1);
        assert_eq!(d.attr(filler[0], "value"), Some(""));
    }

    #[test]
    fn test_fill_empty_layouts_requires_bibliography() {
        let mut d = doc(r#"<citation><layout/></citation>"#);
        let err = fill_empty_layouts(&mut d).unwrap_err();
        assert!(matches!(err, SanitizeError::StructuralPrecondition { .. }));
    }

    #[test]
    fn test_duplicate_layout_removal_round_trip() {
        let mut d = doc(
            r#"<bibliography>
                 <layout locale="en"><text variable="title"/></layout>
                 <layout><text variable="title"/></layout>
               </bibliography>"#,
        );
        let changes = remove_duplicate_layouts(&mut d).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::DiscardsCslExtension);
        assert!(changes[0].text.contains("(en)"));
        assert!(changes[0].text.contains("bibliography"));

        let bib = style::bibliography(&d).unwrap();
        let layouts = d.find_children(bib, &Selector::tag("layout"));
        assert_eq!(layouts.len(), 1);
        assert_eq!(d.attr(layouts[0], "locale"), None);
    }

    #[test]
    fn test_duplicate_layout_invariant_enforced() {
        // Only localized layouts: removing them leaves zero, which the
        // rule reports as a structural defect rather than papering over.
        let mut d = doc(r#"<bibliography><layout locale="zh"/></bibliography>"#);
        let err = remove_duplicate_layouts(&mut d).unwrap_err();
        assert!(matches!(err, SanitizeError::StructuralPrecondition { .. }));
    }

    #[test]
    fn test_et_al_unification() {
        let mut d = doc(
            r#"<locale><terms>
                 <term name="space-et-al"> et al.</term>
                 <term name="zh-et-al">等</term>
               </terms></locale>
               <macro name="author">
                 <names variable="author"><et-al term="en-et-al"/></names>
               </macro>"#,
        );
        let changes = unify_et_al_terms(&mut d).unwrap();
        assert_eq!(changes.len(), 3);
        assert!(changes[0].text.contains("`space-et-al`"));
        assert!(changes[2].text.contains("referenced by `<et-al>`"));

        assert!(
            d.find_all(d.root(), &Selector::tag("term").with_attr_eq("name", "et-al"))
                .len()
                == 2
        );
        let et_al = d.find_first(d.root(), &Selector::tag("et-al")).unwrap();
        assert_eq!(d.attr(et_al, "term"), Some("et-al"));
    }

    #[test]
    fn test_canonical_et_al_untouched() {
        let mut d = doc(r#"<locale><terms><term name="et-al">et al.</term></terms></locale>"#);
        assert!(unify_et_al_terms(&mut d).unwrap().is_empty());
    }
}
