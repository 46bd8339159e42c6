use super::node::Node;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("position {pos} is outside the document (content size {size})")]
    OutOfRange { pos: usize, size: usize },
}

#[derive(Debug, Clone, Copy)]
struct PathEntry<'a> {
    node: &'a Node,
    /// Index of the child containing or following the position.
    index: usize,
    /// Absolute position of the start of that child.
    offset: usize,
}

/// The ancestor-path view of a flat document position.
///
/// Depth 0 is the document itself; `parent()` is the innermost node whose
/// content contains the position.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pub pos: usize,
    path: Vec<PathEntry<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(doc: &'a Node, pos: usize) -> Result<Self, PositionError> {
        if pos > doc.content_size() {
            return Err(PositionError::OutOfRange {
                pos,
                size: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut node = doc;
        let mut start = 0;
        let mut parent_offset = pos;
        loop {
            let (index, offset) = node.content().find_index(parent_offset);
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node,
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let Some(child) = node.child(index) else {
                break;
            };
            if child.is_text() || child.is_leaf() {
                break;
            }
            node = child;
            start += offset + 1;
            parent_offset = rem - 1;
        }
        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn parent(&self) -> &'a Node {
        self.path[self.depth()].node
    }

    pub fn doc(&self) -> &'a Node {
        self.path[0].node
    }

    /// Ancestor at `depth`. Panics past [`depth`](Self::depth), like slice
    /// indexing.
    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].node
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Offset of the position inside its parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Start of the content of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the ancestor at `depth` (which must be >= 1).
    pub fn before(&self, depth: usize) -> usize {
        debug_assert!(depth >= 1, "the document has no position before it");
        self.path[depth.saturating_sub(1)].offset
    }

    pub fn after(&self, depth: usize) -> usize {
        self.before(depth) + self.node(depth).node_size()
    }

    /// Offset into the text node the position points into, 0 when the
    /// position sits between nodes.
    pub fn text_offset(&self) -> usize {
        let last = &self.path[self.depth()];
        self.pos - last.offset
    }

    /// The node directly after the position (the text node itself when the
    /// position points into text).
    pub fn node_after(&self) -> Option<&'a Node> {
        self.parent().child(self.index(self.depth()))
    }

    pub fn node_before(&self) -> Option<&'a Node> {
        let index = self.index(self.depth());
        if self.text_offset() > 0 {
            return self.parent().child(index);
        }
        index.checked_sub(1).and_then(|i| self.parent().child(i))
    }

    /// Innermost depth whose node satisfies `pred`.
    pub fn find_ancestor(&self, pred: impl Fn(&Node) -> bool) -> Option<usize> {
        (0..=self.depth()).rev().find(|d| pred(self.node(*d)))
    }

    /// Rebuilds the document with the ancestor at `depth` replaced by `node`,
    /// copying only the nodes on the path above it.
    pub fn rebuild(&self, depth: usize, node: Node) -> Node {
        let mut node = node;
        for d in (0..depth).rev() {
            node = self.path[d].node.replace_child(self.path[d].index, node);
        }
        node
    }
}
