//! XML document model for CSL styles.
//!
//! A parsed style is an arena of elements addressed by [`ElementId`], with
//! comments kept as first-class child nodes so the rules can tell a
//! comment-only container from a truly empty one. Queries are expressed as
//! [`Selector`] values (tag name plus attribute predicates) rather than raw
//! recursive traversal in every rule.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};

use crate::error::DocumentError;

/// The CSL namespace. Elements bound to it (or to no namespace at all) are
/// the ones the rules operate on.
pub const CSL_NS: &str = "http://purl.org/net/xbiblio/csl";

/// Index of an element in the document arena.
pub type ElementId = usize;

/// A child node of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(ElementId),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct ElementData {
    /// Local name for CSL-namespace elements; the raw qualified name for
    /// foreign-namespace elements (which never match queries).
    name: String,
    /// `Some(uri)` only for elements outside the CSL namespace.
    foreign_ns: Option<String>,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    parent: Option<ElementId>,
}

/// A parsed XML document: the arena of elements plus the root id.
///
/// Elements removed from the tree stay in the arena as orphans; the
/// serializer only walks the tree reachable from the root.
#[derive(Debug, Clone)]
pub struct Document {
    store: Vec<ElementData>,
    root: ElementId,
}

/// Attribute predicate of a [`Selector`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrPred {
    Has(String),
    Eq(String, String),
}

/// A structural query: an optional tag name and attribute predicates,
/// matched against elements in the CSL namespace.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    name: Option<String>,
    preds: Vec<AttrPred>,
}

impl Selector {
    /// Match any CSL element regardless of tag.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match CSL elements with the given local tag name.
    pub fn tag(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            preds: Vec::new(),
        }
    }

    /// Require the attribute to be present, with any value.
    pub fn with_attr(mut self, key: &str) -> Self {
        self.preds.push(AttrPred::Has(key.to_string()));
        self
    }

    /// Require the attribute to be present with exactly this value.
    pub fn with_attr_eq(mut self, key: &str, value: &str) -> Self {
        self.preds
            .push(AttrPred::Eq(key.to_string(), value.to_string()));
        self
    }
}

impl Document {
    /// Parse a document from XML text, preserving comments.
    ///
    /// Elements bound to the CSL namespace are stored under their local
    /// name whatever prefix the input used; a document that declares no
    /// namespace at all is treated as CSL throughout.
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        let mut store: Vec<ElementData> = Vec::new();
        let mut root: Option<ElementId> = None;
        // Stack of open elements, parallel to a stack of the namespace
        // bindings each one introduced.
        let mut open: Vec<ElementId> = Vec::new();
        let mut bindings: Vec<Vec<(String, String)>> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let id = Self::build_element(&mut store, &mut bindings, &e, open.last())?;
                    Self::attach(&mut store, &mut root, &open, id)?;
                    open.push(id);
                }
                Event::Empty(e) => {
                    let id = Self::build_element(&mut store, &mut bindings, &e, open.last())?;
                    Self::attach(&mut store, &mut root, &open, id)?;
                    bindings.pop();
                }
                Event::End(e) => {
                    let tag = decode(e.name().as_ref())?.to_string();
                    if open.pop().is_none() {
                        return Err(DocumentError::UnexpectedClose { tag });
                    }
                    bindings.pop();
                }
                Event::Text(e) => {
                    if let Some(&parent) = open.last() {
                        let text = e.unescape()?.into_owned();
                        store[parent].children.push(Node::Text(text));
                    }
                }
                Event::CData(e) => {
                    if let Some(&parent) = open.last() {
                        let text = decode(e.as_ref())?.to_string();
                        store[parent].children.push(Node::Text(text));
                    }
                }
                Event::Comment(e) => {
                    if let Some(&parent) = open.last() {
                        let text = decode(e.as_ref())?.to_string();
                        store[parent].children.push(Node::Comment(text));
                    }
                    // Comments outside the root are dropped.
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        let root = root.ok_or(DocumentError::NoRoot)?;
        Ok(Self { store, root })
    }

    fn build_element(
        store: &mut Vec<ElementData>,
        bindings: &mut Vec<Vec<(String, String)>>,
        start: &BytesStart<'_>,
        parent: Option<&ElementId>,
    ) -> Result<ElementId, DocumentError> {
        let raw_name = decode(start.name().as_ref())?.to_string();

        let mut scope: Vec<(String, String)> = Vec::new();
        let mut attrs: Vec<(String, String)> = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = decode(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();

            if key == "xmlns" {
                scope.push((String::new(), value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.push((prefix.to_string(), value.clone()));
            }
            // Declarations of the CSL namespace are implicit in the model;
            // the serializer re-binds it as the default namespace. Foreign
            // declarations ride along as ordinary attributes.
            if !(key == "xmlns" && value == CSL_NS)
                && !(key.starts_with("xmlns:") && value == CSL_NS)
            {
                attrs.push((key, value));
            }
        }
        bindings.push(scope);

        let (prefix, local) = match raw_name.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, raw_name.as_str()),
        };
        let resolved = resolve_prefix(bindings, prefix);
        let (name, foreign_ns) = match resolved {
            Some(uri) if uri != CSL_NS => (raw_name.clone(), Some(uri)),
            // CSL namespace, or no declaration in scope: local name.
            _ => (local.to_string(), None),
        };

        store.push(ElementData {
            name,
            foreign_ns,
            attrs,
            children: Vec::new(),
            parent: parent.copied(),
        });
        Ok(store.len() - 1)
    }

    fn attach(
        store: &mut [ElementData],
        root: &mut Option<ElementId>,
        open: &[ElementId],
        id: ElementId,
    ) -> Result<(), DocumentError> {
        match open.last() {
            Some(&parent) => store[parent].children.push(Node::Element(id)),
            None => {
                if root.is_some() {
                    return Err(DocumentError::MultipleRoots);
                }
                *root = Some(id);
            }
        }
        Ok(())
    }

    /// The root element (`<style>` for a CSL document).
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Tag name of an element.
    pub fn name(&self, id: ElementId) -> &str {
        &self.store[id].name
    }

    /// Attribute value lookup.
    pub fn attr(&self, id: ElementId, key: &str) -> Option<&str> {
        self.store[id]
            .attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes in document order.
    pub fn attrs(&self, id: ElementId) -> &[(String, String)] {
        &self.store[id].attrs
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, id: ElementId, key: &str, value: &str) {
        let attrs = &mut self.store[id].attrs;
        match attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((key.to_string(), value.to_string())),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, id: ElementId, key: &str) -> Option<String> {
        let attrs = &mut self.store[id].attrs;
        let pos = attrs.iter().position(|(k, _)| k == key)?;
        Some(attrs.remove(pos).1)
    }

    /// Child nodes in document order.
    pub fn children(&self, id: ElementId) -> &[Node] {
        &self.store[id].children
    }

    /// Child elements in document order.
    pub fn child_elements(&self, id: ElementId) -> Vec<ElementId> {
        self.store[id]
            .children
            .iter()
            .filter_map(|n| match n {
                Node::Element(e) => Some(*e),
                _ => None,
            })
            .collect()
    }

    /// Parent element, `None` for the root.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.store[id].parent
    }

    /// Concatenated text content of the element's direct text children.
    pub fn text(&self, id: ElementId) -> Option<String> {
        let mut out = String::new();
        for node in &self.store[id].children {
            if let Node::Text(t) = node {
                out.push_str(t);
            }
        }
        if out.is_empty() { None } else { Some(out) }
    }

    /// True when the element has no element and no comment children;
    /// whitespace text does not count as content. This is the emptiness
    /// the wrapper-cleanup and layout-fill rules use.
    pub fn is_childless(&self, id: ElementId) -> bool {
        !self.store[id]
            .children
            .iter()
            .any(|n| matches!(n, Node::Element(_) | Node::Comment(_)))
    }

    /// True when the element has no element children; comments (and text)
    /// are allowed. An `<else>` or `<group>` in this state is empty as far
    /// as the CSL schema is concerned.
    pub fn has_no_element_children(&self, id: ElementId) -> bool {
        !self.store[id]
            .children
            .iter()
            .any(|n| matches!(n, Node::Element(_)))
    }

    fn matches(&self, id: ElementId, selector: &Selector) -> bool {
        let data = &self.store[id];
        if data.foreign_ns.is_some() {
            return false;
        }
        if let Some(name) = &selector.name
            && data.name != *name
        {
            return false;
        }
        selector.preds.iter().all(|pred| match pred {
            AttrPred::Has(key) => self.attr(id, key).is_some(),
            AttrPred::Eq(key, value) => self.attr(id, key) == Some(value.as_str()),
        })
    }

    fn collect_descendants(&self, id: ElementId, out: &mut Vec<ElementId>) {
        for node in &self.store[id].children {
            if let Node::Element(child) = node {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    /// All descendant elements of `scope` in preorder, excluding `scope`.
    pub fn descendants(&self, scope: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.collect_descendants(scope, &mut out);
        out
    }

    /// Descendants of `scope` matching the selector.
    pub fn find_all(&self, scope: ElementId, selector: &Selector) -> Vec<ElementId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.matches(id, selector))
            .collect()
    }

    /// First matching descendant of `scope` in document order.
    pub fn find_first(&self, scope: ElementId, selector: &Selector) -> Option<ElementId> {
        self.find_all(scope, selector).into_iter().next()
    }

    /// Direct children of `scope` matching the selector.
    pub fn find_children(&self, scope: ElementId, selector: &Selector) -> Vec<ElementId> {
        self.child_elements(scope)
            .into_iter()
            .filter(|&id| self.matches(id, selector))
            .collect()
    }

    /// Distinct parents of matching descendants, in document order: the
    /// `element having a matching child` lookup the removal rules need to
    /// reach the container that must be mutated.
    pub fn containers_of(&self, scope: ElementId, selector: &Selector) -> Vec<ElementId> {
        let mut out = Vec::new();
        for id in self.find_all(scope, selector) {
            if let Some(parent) = self.parent(id)
                && !out.contains(&parent)
            {
                out.push(parent);
            }
        }
        out
    }

    /// Remove an element child. An immediately following whitespace-only
    /// text node (the removed element's tail) goes with it, so removals do
    /// not leave stray blank runs. Returns false if `child` is not a child
    /// of `parent`.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> bool {
        let children = &mut self.store[parent].children;
        let Some(pos) = children.iter().position(|n| *n == Node::Element(child)) else {
            return false;
        };
        children.remove(pos);
        let tail_is_blank =
            matches!(children.get(pos), Some(Node::Text(t)) if t.trim().is_empty());
        if tail_is_blank {
            children.remove(pos);
        }
        self.store[child].parent = None;
        true
    }

    /// Append a new CSL element child, returning its id.
    pub fn append_element(
        &mut self,
        parent: ElementId,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> ElementId {
        self.store.push(ElementData {
            name: name.to_string(),
            foreign_ns: None,
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children: Vec::new(),
            parent: Some(parent),
        });
        let id = self.store.len() - 1;
        self.store[parent].children.push(Node::Element(id));
        id
    }

    /// Serialize back to XML text: UTF-8, XML declaration, the CSL
    /// namespace bound as the default namespace on the root, `<tag/>` as
    /// the canonical self-closing form.
    pub fn serialize(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
        self.write_element(&mut writer, self.root, true)?;

        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|e| DocumentError::Encoding {
            details: e.to_string(),
        })
    }

    fn write_element(
        &self,
        writer: &mut Writer<Vec<u8>>,
        id: ElementId,
        is_root: bool,
    ) -> Result<(), DocumentError> {
        let data = &self.store[id];
        let mut start = BytesStart::new(data.name.as_str());
        if is_root && data.foreign_ns.is_none() {
            start.push_attribute(("xmlns", CSL_NS));
        }
        for (key, value) in &data.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if data.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for node in &data.children {
            match node {
                Node::Element(child) => self.write_element(writer, *child, false)?,
                Node::Text(text) => {
                    writer.write_event(Event::Text(BytesText::new(text)))?;
                }
                Node::Comment(text) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
                }
            }
        }
        writer.write_event(Event::End(BytesStart::new(data.name.as_str()).to_end()))?;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<&str, DocumentError> {
    std::str::from_utf8(bytes).map_err(|e| DocumentError::Encoding {
        details: e.to_string(),
    })
}

fn resolve_prefix(bindings: &[Vec<(String, String)>], prefix: Option<&str>) -> Option<String> {
    let wanted = prefix.unwrap_or("");
    for scope in bindings.iter().rev() {
        if let Some((_, uri)) = scope.iter().find(|(p, _)| p == wanted) {
            return Some(uri.clone());
        }
    }
    None
}
