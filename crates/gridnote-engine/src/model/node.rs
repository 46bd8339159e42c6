use std::sync::{Arc, Weak};

use serde::{Serialize, Serializer};

use super::attrs::{Attrs, CellAttrs, Mark};
use super::resolved::{PositionError, ResolvedPos};
use crate::schema::{ContentRule, NodeType, Schema, SchemaError};

/// An immutable document node.
///
/// Sizes follow the flattened position model: a text node is as large as its
/// character count, a leaf node has size 1, and a container occupies its
/// content size plus one token for each boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(rename = "type")]
    kind: NodeType,
    #[serde(skip_serializing_if = "is_default_attrs")]
    attrs: Attrs,
    #[serde(skip_serializing_if = "Fragment::is_empty")]
    content: Fragment,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
    #[serde(skip)]
    size: usize,
}

fn is_default_attrs(attrs: &Attrs) -> bool {
    *attrs == Attrs::None
}

impl Node {
    pub fn new(kind: NodeType, attrs: Attrs, content: Vec<Node>) -> Self {
        Self::with_fragment(kind, attrs, Fragment::from_vec(content))
    }

    pub fn with_fragment(kind: NodeType, attrs: Attrs, content: Fragment) -> Self {
        let size = if content.is_empty() && kind.content_rule() == ContentRule::Empty {
            1
        } else {
            content.size() + 2
        };
        Self {
            kind,
            attrs,
            content,
            text: None,
            marks: Vec::new(),
            size,
        }
    }

    /// A childless node (horizontal rule, hard break, image, wiki link).
    pub fn leaf(kind: NodeType, attrs: Attrs) -> Self {
        Self::with_fragment(kind, attrs, Fragment::empty())
    }

    /// A text node. Marks are kept sorted and deduplicated.
    pub fn text(text: impl Into<String>, mut marks: Vec<Mark>) -> Self {
        let text = text.into();
        marks.sort();
        marks.dedup();
        Self {
            kind: NodeType::Text,
            attrs: Attrs::None,
            content: Fragment::empty(),
            size: text.chars().count(),
            text: Some(text),
            marks,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::text(text, Vec::new())
    }

    pub fn doc(content: Vec<Node>) -> Self {
        Self::new(NodeType::Doc, Attrs::None, content)
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::new(NodeType::Paragraph, Attrs::None, content)
    }

    pub fn kind(&self) -> NodeType {
        self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// The text of a text node, `None` for every other kind.
    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeType::Text
    }

    pub fn is_leaf(&self) -> bool {
        self.kind.content_rule() == ContentRule::Empty
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    pub fn node_size(&self) -> usize {
        self.size
    }

    pub fn content_size(&self) -> usize {
        self.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.get(0)
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.len().checked_sub(1).and_then(|i| self.content.get(i))
    }

    pub fn children(&self) -> std::slice::Iter<'_, Node> {
        self.content.iter()
    }

    /// Cell attributes of a `table_cell` / `table_header`.
    pub fn cell_attrs(&self) -> Option<&CellAttrs> {
        match &self.attrs {
            Attrs::Cell(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn colspan(&self) -> usize {
        self.cell_attrs().map_or(1, |a| a.colspan.max(1) as usize)
    }

    pub fn rowspan(&self) -> usize {
        self.cell_attrs().map_or(1, |a| a.rowspan.max(1) as usize)
    }

    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        let mut node = self.clone();
        node.attrs = attrs;
        node
    }

    /// Inline leaves carry the marks active around them so the serializer
    /// can keep them inside the surrounding emphasis.
    pub fn with_marks(mut self, mut marks: Vec<Mark>) -> Node {
        marks.sort();
        marks.dedup();
        self.marks = marks;
        self
    }

    pub fn with_content(&self, content: Fragment) -> Node {
        if self.is_text() {
            return self.clone();
        }
        Node::with_fragment(self.kind, self.attrs.clone(), content)
    }

    /// Returns a copy with child `index` replaced.
    pub fn replace_child(&self, index: usize, child: Node) -> Node {
        let mut nodes = self.content.to_vec();
        if let Some(slot) = nodes.get_mut(index) {
            *slot = child;
        }
        self.with_content(Fragment::from_vec(nodes))
    }

    /// A copy of a text node holding the characters in `from..to`.
    pub fn cut_text(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some(text) => Node::text(slice_chars(text, from, to), self.marks.clone()),
            None => self.clone(),
        }
    }

    /// Node directly after `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.content.find_index(pos);
            let child = node.content.get(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, PositionError> {
        ResolvedPos::resolve(self, pos)
    }

    /// Calls `f` for every descendant overlapping `from..to`, with its absolute
    /// position. Returning `false` skips that node's children.
    pub fn nodes_between(&self, from: usize, to: usize, f: &mut dyn FnMut(&Node, usize) -> bool) {
        self.content.nodes_between(from, to, f, 0);
    }

    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize) -> bool) {
        self.nodes_between(0, self.content_size(), f);
    }

    /// Concatenated text of all descendants. Leaves contribute nothing except
    /// wiki links, which contribute their title.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
            return;
        }
        if let Attrs::WikiLink { title, .. } = &self.attrs {
            out.push_str(title);
            return;
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }

    /// Validates the tree against `schema`: every node type must be registered
    /// and every child must be allowed by its parent's content rule.
    pub fn check(&self, schema: &Schema) -> Result<(), SchemaError> {
        schema.require(self.kind)?;
        let rule = self.kind.content_rule();
        for child in self.children() {
            if !rule.allows(child.kind) {
                return Err(SchemaError::InvalidContent {
                    parent: self.kind.name(),
                    child: child.kind.name(),
                });
            }
            child.check(schema)?;
        }
        Ok(())
    }

    pub(crate) fn same_markup_text(&self, other: &Node) -> bool {
        self.is_text() && other.is_text() && self.marks == other.marks
    }
}

pub(crate) fn slice_chars(text: &str, from: usize, to: usize) -> String {
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

/// An ordered, shared sequence of child nodes.
///
/// The backing `Arc<[Node]>` is shared between successive documents wherever a
/// subtree is unchanged, so the allocation doubles as an identity token.
#[derive(Debug, Clone)]
pub struct Fragment {
    nodes: Arc<[Node]>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self {
            nodes: Arc::from(Vec::new()),
            size: 0,
        }
    }

    /// Builds a fragment, joining adjacent text nodes with equal marks and
    /// dropping empty text nodes.
    pub fn from_vec(nodes: Vec<Node>) -> Self {
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.is_text() && node.size == 0 {
                continue;
            }
            if let Some(last) = joined.last_mut()
                && last.same_markup_text(&node)
            {
                let mut text = last.text.take().unwrap_or_default();
                text.push_str(node.text.as_deref().unwrap_or_default());
                *last = Node::text(text, node.marks);
                continue;
            }
            joined.push(node);
        }
        let size = joined.iter().map(Node::node_size).sum();
        Self {
            nodes: Arc::from(joined),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.nodes.to_vec()
    }

    /// Finds the child containing or following `pos`, returning its index and
    /// start offset. A position on a child boundary resolves to the later
    /// child.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        if pos == 0 {
            return (0, 0);
        }
        let mut cur = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            let end = cur + child.node_size();
            if end == pos {
                return (i + 1, end);
            }
            if end > pos {
                return (i, cur);
            }
            cur = end;
        }
        (self.nodes.len(), cur)
    }

    /// The children covering `from..to`, splitting text nodes at the edges.
    /// Non-text children are kept only when fully inside the range.
    pub fn cut(&self, from: usize, to: usize) -> Vec<Node> {
        let mut out = Vec::new();
        let mut pos = 0;
        for child in self.nodes.iter() {
            let end = pos + child.node_size();
            if end > from && pos < to {
                if child.is_text() {
                    let start = from.saturating_sub(pos);
                    let stop = to.min(end) - pos;
                    out.push(child.cut_text(start, stop));
                } else if pos >= from && end <= to {
                    out.push(child.clone());
                }
            }
            if pos >= to {
                break;
            }
            pos = end;
        }
        out
    }

    fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize) -> bool,
        node_start: usize,
    ) {
        let mut pos = 0;
        for child in self.nodes.iter() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos) && child.content_size() > 0 {
                let start = pos + 1;
                child.content.nodes_between(
                    from.saturating_sub(start),
                    child.content_size().min(to.saturating_sub(start)),
                    f,
                    node_start + start,
                );
            }
            pos = end;
        }
    }

    /// Weak handle on the backing allocation, used as a cache key.
    pub fn identity(&self) -> Weak<[Node]> {
        Arc::downgrade(&self.nodes)
    }

    pub fn identity_ptr(&self) -> usize {
        Arc::as_ptr(&self.nodes) as *const Node as usize
    }

    /// Whether `weak` still points at this fragment's allocation.
    pub fn is_same(&self, weak: &Weak<[Node]>) -> bool {
        weak.upgrade().is_some_and(|nodes| Arc::ptr_eq(&nodes, &self.nodes))
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.nodes, &other.nodes) || self.nodes[..] == other.nodes[..]
    }
}

impl Serialize for Fragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.nodes.iter())
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
