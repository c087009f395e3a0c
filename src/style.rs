//! CSL-specific structure on top of the generic document model.

use serde::Serialize;

use crate::document::{Document, ElementId, Selector};
use crate::error::{Result, SanitizeError};

/// Metadata of a style, read from its `<info>` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleInfo {
    pub title: String,
    pub id: String,
    pub updated: String,
}

impl StyleInfo {
    /// Extract title/id/updated from the style. A missing `info` block or
    /// a missing text child is a structural precondition violation.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let info = doc
            .find_children(doc.root(), &Selector::tag("info"))
            .into_iter()
            .next()
            .ok_or_else(|| SanitizeError::precondition("style has no <info> element"))?;

        Ok(Self {
            title: info_text(doc, info, "title")?,
            id: info_text(doc, info, "id")?,
            updated: info_text(doc, info, "updated")?,
        })
    }
}

fn info_text(doc: &Document, info: ElementId, tag: &str) -> Result<String> {
    let elem = doc
        .find_children(info, &Selector::tag(tag))
        .into_iter()
        .next()
        .ok_or_else(|| SanitizeError::precondition(format!("<info> has no <{tag}> element")))?;
    doc.text(elem)
        .ok_or_else(|| SanitizeError::precondition(format!("<info>/<{tag}> has no text")))
}

/// The style's `bibliography` element. Every style has one; its absence is
/// a structural precondition violation, not a recoverable condition.
pub fn bibliography(doc: &Document) -> Result<ElementId> {
    doc.find_children(doc.root(), &Selector::tag("bibliography"))
        .into_iter()
        .next()
        .ok_or_else(|| SanitizeError::precondition("style has no <bibliography> element"))
}

/// The style's `citation` element, if any. Bibliography-only styles
/// legitimately lack it.
pub fn citation(doc: &Document) -> Option<ElementId> {
    doc.find_children(doc.root(), &Selector::tag("citation"))
        .into_iter()
        .next()
}

/// The style's macros, in document order.
pub fn macros(doc: &Document) -> Vec<ElementId> {
    doc.find_children(doc.root(), &Selector::tag("macro"))
}

/// A macro's display name for change messages.
pub fn macro_name(doc: &Document, macro_id: ElementId) -> String {
    doc.attr(macro_id, "name").unwrap_or("unnamed").to_string()
}
