//! Mutable document tree
//!
//! A [`Document`] wraps a `scraper::Html` tree. Nodes live in an `ego_tree`
//! arena and are addressed by [`NodeId`], so the structure optimizer can
//! detach, move and rename nodes without juggling shared ownership. A node
//! that has been detached simply stops being reachable from the root.
//!
//! Node ids are never reused. Detached nodes stay in the arena until the
//! [`Document`] is dropped.
//!
//! Queries go through `scraper::Selector`, so anything the `selectors` crate
//! parses can be passed to [`Document::query_selector`]. Selectors that fail
//! to parse match nothing.

pub use ego_tree::NodeId;
use ego_tree::NodeRef;
use html5ever::{LocalName, QualName, ns};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector, StrTendril};

/// Borrowed view of what a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// The document root
    Document,
    /// An element, by lowercase tag name
    Element(&'a str),
    /// A text node
    Text(&'a str),
    /// Comments, doctypes and processing instructions
    Other,
}

/// A mutable HTML document tree
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Html> for Document {
    fn from(html: Html) -> Self {
        Self { html }
    }
}

impl Document {
    /// Create an empty document containing only the root node
    pub fn new() -> Self {
        Self {
            html: Html::new_document(),
        }
    }

    /// The document root node
    pub fn root(&self) -> NodeId {
        self.html.tree.root().id()
    }

    /// Total number of nodes ever allocated (including detached ones)
    pub fn len(&self) -> usize {
        self.html.tree.values().count()
    }

    /// True when the arena holds only the root
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// True when `id` addresses a node of this document
    pub fn contains(&self, id: NodeId) -> bool {
        self.html.tree.get(id).is_some()
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id)?.value().as_element()
    }

    fn with_element_mut<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Element) -> R) -> Option<R> {
        let mut node = self.html.tree.get_mut(id)?;
        match node.value() {
            Node::Element(element) => Some(f(element)),
            _ => None,
        }
    }

    /// Create a detached element; the tag name is lowercased
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(tag.to_ascii_lowercase()));
        self.html
            .tree
            .orphan(Node::Element(Element::new(name, Vec::new())))
            .id()
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        let text = text.into();
        self.html
            .tree
            .orphan(Node::Text(Text {
                text: StrTendril::from_slice(&text),
            }))
            .id()
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> NodeKind<'_> {
        match self.node(id).map(|node| node.value()) {
            Some(Node::Document | Node::Fragment) => NodeKind::Document,
            Some(Node::Element(element)) => NodeKind::Element(element.name()),
            Some(Node::Text(text)) => NodeKind::Text(&**text),
            _ => NodeKind::Other,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    /// Lowercase tag name, or `None` for non-elements
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    /// True when `id` is an element whose tag is one of `tags`
    pub fn has_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.tag_name(id).is_some_and(|tag| tags.contains(&tag))
    }

    /// Text of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.node(id)?.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        let value = value.into();
        if let Some(mut node) = self.html.tree.get_mut(id)
            && let Node::Text(text) = node.value()
        {
            text.text = StrTendril::from_slice(&value);
        }
    }

    /// Attributes of an element (empty for non-elements)
    pub fn attributes(&self, id: NodeId) -> Vec<(&str, &str)> {
        self.element(id)
            .map(|element| element.attrs().collect())
            .unwrap_or_default()
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Set or overwrite an attribute; attribute names stay unique
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = StrTendril::from_slice(&value.into());
        self.with_element_mut(id, |element| {
            match element
                .attrs
                .iter_mut()
                .find(|(key, _)| str::eq_ignore_ascii_case(&key.local, name))
            {
                Some(slot) => slot.1 = value,
                None => {
                    let key = QualName::new(None, ns!(), LocalName::from(name.to_ascii_lowercase()));
                    element.attrs.push((key, value));
                    // Lookups binary-search the attribute list
                    element.attrs.sort_unstable_by(|a, b| a.0.cmp(&b.0));
                }
            }
        });
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.with_element_mut(id, |element| {
            let pos = element
                .attrs
                .iter()
                .position(|(key, _)| str::eq_ignore_ascii_case(&key.local, name))?;
            let (_, value) = element.attrs.remove(pos);
            Some(String::from(&*value))
        })
        .flatten()
    }

    /// Whitespace-separated class list contains `class`
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.get_attribute(id, "class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default()
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .into_iter()
            .filter(move |child| self.is_element(*child))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent().map(|parent| parent.id())
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.next_sibling().map(|sibling| sibling.id())
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.prev_sibling().map(|sibling| sibling.id())
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(|node| node.ancestors())
            .map(|ancestor| ancestor.id())
    }

    /// Descendants of `id` in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(|node| node.descendants().skip(1))
            .map(|descendant| descendant.id())
    }

    /// Concatenation of all descendant text nodes, ignoring element boundaries
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// The `<html>` element (first element child of the root)
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).next()
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|child| self.tag_name(*child) == Some("head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .find(|child| self.tag_name(*child) == Some("body"))
    }

    fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        self.node(id)
            .and_then(ElementRef::wrap)
            .is_some_and(|element| selector.matches(&element))
    }

    /// All elements under `scope` matching `selector`, in document order
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants(scope)
            .filter(|node| self.matches(*node, &selector))
            .collect()
    }

    /// First element under `scope` matching `selector`
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector).ok()?;
        self.descendants(scope)
            .find(|node| self.matches(*node, &selector))
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Remove `id` from its parent. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || !self.contains(child) {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(parent) {
            node.append_id(child);
        }
    }

    /// Insert `child` immediately before `reference`
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        if child == reference || !self.contains(child) || self.parent(reference).is_none() {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(reference) {
            node.insert_id_before(child);
        }
    }

    /// Insert `child` immediately after `reference`
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        if child == reference || !self.contains(child) || self.parent(reference).is_none() {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(reference) {
            node.insert_id_after(child);
        }
    }

    /// Put `new` where `old` is; `old` becomes detached
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new || self.parent(old).is_none() {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Move the children of `id` into its parent at its position, then detach `id`
    pub fn unwrap_element(&mut self, id: NodeId) {
        if self.parent(id).is_none() {
            return;
        }
        for child in self.children(id) {
            self.insert_before(id, child);
        }
        self.detach(id);
    }

    /// Change the tag of element `id` in place; attributes and children stay
    pub fn rename_element(&mut self, id: NodeId, tag: &str) {
        let local = LocalName::from(tag.to_ascii_lowercase());
        self.with_element_mut(id, |element| element.name.local = local);
    }

    /// True when `id` is still reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let root = self.root();
        id == root || self.ancestors(id).any(|ancestor| ancestor == root)
    }
}
