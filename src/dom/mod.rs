//! DOM snapshots — the page context's view of a chat page.
//!
//! DESIGN
//! ======
//! The in-page script serializes the live DOM into a flat [`PageSnapshot`]:
//! one entry per node, parents listed before their children, each entry
//! pointing at its parent by index. A flat list keeps deeply nested chat
//! layouts well inside JSON parser depth limits.
//!
//! [`Document`] re-indexes a snapshot into a pre-order arena with parent
//! links and subtree bounds, so extractors get the small slice of the DOM
//! API they need (`closest`, `parentElement`, `querySelectorAll`,
//! `textContent`, `innerHTML`, computed style) without a browser.
//!
//! Documents are immutable once built. Extraction never mutates a page.

pub mod selector;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use selector::{Selector, SelectorError};

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// A serialized page, as uploaded by the page context for one tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// `window.location.href` at capture time.
    pub url: String,
    /// Nodes in document order. `nodes[0]` is the root element.
    pub nodes: Vec<SnapshotNode>,
}

/// One node of a [`PageSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Element {
        /// Index of the parent node. `None` only for the root.
        #[serde(default)]
        parent: Option<usize>,
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "ComputedStyle::is_empty")]
        style: ComputedStyle,
    },
    Text {
        parent: usize,
        text: String,
    },
}

/// The computed-style properties the outgoing-message heuristics read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_self: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justify_content: Option<String>,
}

impl ComputedStyle {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text_align.is_none()
            && self.align_self.is_none()
            && self.margin_left.is_none()
            && self.justify_content.is_none()
    }

    #[must_use]
    pub fn text_align_is(&self, value: &str) -> bool {
        self.text_align.as_deref() == Some(value)
    }

    #[must_use]
    pub fn align_self_is(&self, value: &str) -> bool {
        self.align_self.as_deref() == Some(value)
    }

    #[must_use]
    pub fn margin_left_is(&self, value: &str) -> bool {
        self.margin_left.as_deref() == Some(value)
    }

    #[must_use]
    pub fn justify_content_is(&self, value: &str) -> bool {
        self.justify_content.as_deref() == Some(value)
    }
}

/// Errors produced while indexing a snapshot.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot has no nodes")]
    Empty,

    #[error("snapshot root must be an element without a parent")]
    InvalidRoot,

    /// A node's parent index is out of range, not earlier in the list, or a text node.
    #[error("node {index} has invalid parent {parent}")]
    InvalidParent { index: usize, parent: usize },

    #[error("node {index} is detached (missing parent)")]
    Detached { index: usize },
}

// =============================================================================
// TREE BUILDER
// =============================================================================

/// Nested builder for snapshots. Mostly used by tests and fixtures; the page
/// context produces the flat form directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    style: ComputedStyle,
    children: Vec<Node>,
}

/// Start an element builder.
#[must_use]
pub fn element(tag: &str) -> Element {
    Element { tag: tag.to_string(), attrs: BTreeMap::new(), style: ComputedStyle::default(), children: Vec::new() }
}

/// A bare text node.
#[must_use]
pub fn text(value: &str) -> Node {
    Node::Text(value.to_string())
}

impl Element {
    /// Append a class, space-joined with any existing ones.
    #[must_use]
    pub fn class(mut self, name: &str) -> Self {
        let classes = self.attrs.entry("class".into()).or_default();
        if !classes.is_empty() {
            classes.push(' ');
        }
        classes.push_str(name);
        self
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Shorthand for a text child.
    #[must_use]
    pub fn text(self, value: &str) -> Self {
        self.child(text(value))
    }

    /// Flatten the tree into a snapshot rooted at this element.
    #[must_use]
    pub fn into_snapshot(self, url: &str) -> PageSnapshot {
        let mut nodes = Vec::new();
        let mut stack = vec![(Node::Element(self), None)];
        while let Some((node, parent)) = stack.pop() {
            let index = nodes.len();
            match node {
                Node::Element(el) => {
                    nodes.push(SnapshotNode::Element { parent, tag: el.tag, attrs: el.attrs, style: el.style });
                    for child in el.children.into_iter().rev() {
                        stack.push((child, Some(index)));
                    }
                }
                Node::Text(text) => {
                    nodes.push(SnapshotNode::Text { parent: parent.unwrap_or_default(), text });
                }
            }
        }
        PageSnapshot { url: url.to_string(), nodes }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

// =============================================================================
// DOCUMENT ARENA
// =============================================================================

#[derive(Debug)]
enum NodeData {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        classes: Vec<String>,
        style: ComputedStyle,
    },
    Text(String),
}

#[derive(Debug)]
struct ArenaNode {
    parent: Option<usize>,
    children: Vec<usize>,
    /// One past the last descendant (pre-order numbering).
    subtree_end: usize,
    data: NodeData,
}

/// An indexed, read-only page.
#[derive(Debug)]
pub struct Document {
    url: String,
    nodes: Vec<ArenaNode>,
}

impl Document {
    /// Index a snapshot.
    ///
    /// Nodes are renumbered in pre-order so every subtree is a contiguous
    /// range, whatever order the page context listed siblings in.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] if the root is missing or malformed, or if
    /// any node points at a parent that is not an earlier element.
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Result<Self, SnapshotError> {
        let raw = &snapshot.nodes;
        let Some(first) = raw.first() else {
            return Err(SnapshotError::Empty);
        };
        if !matches!(first, SnapshotNode::Element { parent: None, .. }) {
            return Err(SnapshotError::InvalidRoot);
        }

        // Children lists in listing order.
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); raw.len()];
        for (index, node) in raw.iter().enumerate().skip(1) {
            let parent = match node {
                SnapshotNode::Element { parent: Some(p), .. } | SnapshotNode::Text { parent: p, .. } => *p,
                SnapshotNode::Element { parent: None, .. } => return Err(SnapshotError::Detached { index }),
            };
            let parent_is_element = raw
                .get(parent)
                .is_some_and(|p| matches!(p, SnapshotNode::Element { .. }));
            if parent >= index || !parent_is_element {
                return Err(SnapshotError::InvalidParent { index, parent });
            }
            children[parent].push(index);
        }

        // Pre-order renumbering.
        let mut order = Vec::with_capacity(raw.len());
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            order.push(index);
            for &child in children[index].iter().rev() {
                stack.push(child);
            }
        }
        let mut new_id = vec![0usize; raw.len()];
        for (id, &old) in order.iter().enumerate() {
            new_id[old] = id;
        }

        let mut nodes: Vec<ArenaNode> = order
            .iter()
            .map(|&old| {
                let (parent, data) = match &raw[old] {
                    SnapshotNode::Element { parent, tag, attrs, style } => {
                        let classes = attrs
                            .get("class")
                            .map(|c| c.split_whitespace().map(str::to_owned).collect())
                            .unwrap_or_default();
                        let data = NodeData::Element {
                            tag: tag.to_ascii_lowercase(),
                            attrs: attrs.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.clone())).collect(),
                            classes,
                            style: style.clone(),
                        };
                        (parent.map(|p| new_id[p]), data)
                    }
                    SnapshotNode::Text { parent, text } => (Some(new_id[*parent]), NodeData::Text(text.clone())),
                };
                ArenaNode {
                    parent,
                    children: children[old].iter().map(|&c| new_id[c]).collect(),
                    subtree_end: 0,
                    data,
                }
            })
            .collect();

        for id in (0..nodes.len()).rev() {
            let end = nodes[id]
                .children
                .last()
                .map_or(id + 1, |&last| nodes[last].subtree_end);
            nodes[id].subtree_end = end;
        }

        Ok(Self { url: snapshot.url.clone(), nodes })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of indexed nodes, text nodes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn root(&self) -> ElementRef<'_> {
        ElementRef { doc: self, id: 0 }
    }

    /// `document.querySelectorAll`: every matching element in document order.
    #[must_use]
    pub fn select(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.elements_in(0..self.nodes.len())
            .filter(|el| selector.matches(*el))
            .collect()
    }

    /// Parse `css` and select with it.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] if `css` is outside the supported subset.
    pub fn select_css(&self, css: &str) -> Result<Vec<ElementRef<'_>>, SelectorError> {
        let selector = Selector::parse(css)?;
        Ok(self.select(&selector))
    }

    fn elements_in(&self, range: std::ops::Range<usize>) -> impl Iterator<Item = ElementRef<'_>> {
        range
            .filter(|&id| matches!(self.nodes[id].data, NodeData::Element { .. }))
            .map(move |id| ElementRef { doc: self, id })
    }
}

// =============================================================================
// ELEMENT HANDLE
// =============================================================================

/// Borrowed handle to one element of a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: usize,
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for ElementRef<'_> {}

impl<'a> ElementRef<'a> {
    fn node(&self) -> &'a ArenaNode {
        &self.doc.nodes[self.id]
    }

    /// Lowercase tag name.
    #[must_use]
    pub fn tag(&self) -> &'a str {
        match &self.node().data {
            NodeData::Element { tag, .. } => tag,
            NodeData::Text(_) => "",
        }
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match &self.node().data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    #[must_use]
    pub fn classes(&self) -> &'a [String] {
        match &self.node().data {
            NodeData::Element { classes, .. } => classes,
            NodeData::Text(_) => &[],
        }
    }

    /// `classList.contains`.
    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        self.classes().iter().any(|c| c == name)
    }

    #[must_use]
    pub fn style(&self) -> &'a ComputedStyle {
        static EMPTY: ComputedStyle =
            ComputedStyle { text_align: None, align_self: None, margin_left: None, justify_content: None };
        match &self.node().data {
            NodeData::Element { style, .. } => style,
            NodeData::Text(_) => &EMPTY,
        }
    }

    /// `parentElement`.
    #[must_use]
    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.node()
            .parent
            .map(|id| ElementRef { doc: self.doc, id })
    }

    /// `Element.closest`: this element or its nearest matching ancestor.
    #[must_use]
    pub fn closest(&self, selector: &Selector) -> Option<ElementRef<'a>> {
        let mut current = Some(*self);
        while let Some(el) = current {
            if selector.matches(el) {
                return Some(el);
            }
            current = el.parent();
        }
        None
    }

    #[must_use]
    pub fn matches(&self, selector: &Selector) -> bool {
        selector.matches(*self)
    }

    /// `querySelectorAll` scoped to descendants.
    #[must_use]
    pub fn select(&self, selector: &Selector) -> Vec<ElementRef<'a>> {
        let node = self.node();
        self.doc
            .elements_in(self.id + 1..node.subtree_end)
            .filter(|el| selector.matches(*el))
            .collect()
    }

    /// `querySelector` scoped to descendants.
    #[must_use]
    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'a>> {
        let node = self.node();
        self.doc
            .elements_in(self.id + 1..node.subtree_end)
            .find(|el| selector.matches(*el))
    }

    /// `textContent`: all descendant text, concatenated in document order.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.doc.nodes[self.id..self.node().subtree_end] {
            if let NodeData::Text(text) = &node.data {
                out.push_str(text);
            }
        }
        out
    }

    /// Approximate `innerHTML`: children re-serialized as markup.
    ///
    /// Attribute values and text are emitted verbatim (no entity escaping);
    /// the result is only ever pattern-matched, never parsed back.
    #[must_use]
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        let end = self.node().subtree_end;
        // Open elements awaiting their closing tag: (subtree_end, tag).
        let mut open: Vec<(usize, &str)> = Vec::new();
        for id in self.id + 1..end {
            while open.last().is_some_and(|&(close_at, _)| close_at <= id) {
                if let Some((_, tag)) = open.pop() {
                    push_close_tag(&mut out, tag);
                }
            }
            let node = &self.doc.nodes[id];
            match &node.data {
                NodeData::Element { tag, attrs, .. } => {
                    out.push('<');
                    out.push_str(tag);
                    for (name, value) in attrs {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(value);
                        out.push('"');
                    }
                    out.push('>');
                    open.push((node.subtree_end, tag));
                }
                NodeData::Text(text) => out.push_str(text),
            }
        }
        while let Some((_, tag)) = open.pop() {
            push_close_tag(&mut out, tag);
        }
        out
    }
}

fn push_close_tag(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
