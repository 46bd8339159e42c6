//! # Transform
//!
//! Atomic document steps and the position mapping they produce.
//!
//! A [`Step`] turns one document into another. Each applied step yields a
//! [`StepMap`] describing which range changed; a [`Mapping`] chains step maps
//! so any pre-edit position can be translated into the edited document.
//! [`Transaction`] batches steps with a selection update.

mod transaction;

use crate::model::{Attrs, Fragment, Node, PositionError};

pub use transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error("replace range {from}..{to} crosses a node boundary")]
    CrossesBoundary { from: usize, to: usize },
    #[error("replace range {from}..{to} is inverted")]
    InvertedRange { from: usize, to: usize },
    #[error("`{child}` is not allowed inside `{parent}`")]
    InvalidContent {
        parent: &'static str,
        child: &'static str,
    },
    #[error("no node starts at position {0}")]
    NoNodeAt(usize),
}

/// A single document change.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replaces `from..to` with `content`. Both ends must share a parent; text
    /// nodes at the edges are split and re-joined.
    Replace {
        from: usize,
        to: usize,
        content: Vec<Node>,
    },
    /// Replaces the attributes of the node starting at `pos`.
    SetAttrs { pos: usize, attrs: Attrs },
}

impl Step {
    pub fn apply(&self, doc: &Node) -> Result<Node, TransformError> {
        match self {
            Step::Replace { from, to, content } => apply_replace(doc, *from, *to, content),
            Step::SetAttrs { pos, attrs } => apply_set_attrs(doc, *pos, attrs),
        }
    }

    pub fn map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, content } => StepMap::new(
                *from,
                to - from,
                content.iter().map(Node::node_size).sum(),
            ),
            Step::SetAttrs { .. } => StepMap::EMPTY,
        }
    }
}

fn apply_replace(
    doc: &Node,
    from: usize,
    to: usize,
    content: &[Node],
) -> Result<Node, TransformError> {
    if from > to {
        return Err(TransformError::InvertedRange { from, to });
    }
    let start_pos = doc.resolve(from)?;
    let end_pos = doc.resolve(to)?;
    let depth = start_pos.depth();
    if end_pos.depth() != depth || end_pos.start(depth) != start_pos.start(depth) {
        return Err(TransformError::CrossesBoundary { from, to });
    }
    let parent = start_pos.parent();
    let rule = parent.kind().content_rule();
    if let Some(bad) = content.iter().find(|c| !rule.allows(c.kind())) {
        return Err(TransformError::InvalidContent {
            parent: parent.kind().name(),
            child: bad.kind().name(),
        });
    }
    let start = start_pos.start(depth);
    let mut nodes = parent.content().cut(0, from - start);
    nodes.extend(content.iter().cloned());
    nodes.extend(parent.content().cut(to - start, parent.content_size()));
    let replaced = parent.with_content(Fragment::from_vec(nodes));
    Ok(start_pos.rebuild(depth, replaced))
}

fn apply_set_attrs(doc: &Node, pos: usize, attrs: &Attrs) -> Result<Node, TransformError> {
    let rp = doc.resolve(pos)?;
    let target = match rp.node_after() {
        Some(node) if rp.text_offset() == 0 && !node.is_text() => node,
        _ => return Err(TransformError::NoNodeAt(pos)),
    };
    let depth = rp.depth();
    let parent = rp
        .parent()
        .replace_child(rp.index(depth), target.with_attrs(attrs.clone()));
    Ok(rp.rebuild(depth, parent))
}

/// Which side a position sticks to when content is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assoc {
    Before,
    #[default]
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The position was strictly inside a replaced range.
    pub deleted: bool,
}

/// The position change produced by one step: `old_size` tokens at `start`
/// became `new_size` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    start: usize,
    old_size: usize,
    new_size: usize,
}

impl StepMap {
    pub const EMPTY: StepMap = StepMap {
        start: 0,
        old_size: 0,
        new_size: 0,
    };

    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        Self {
            start,
            old_size,
            new_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.old_size == 0 && self.new_size == 0
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let end = self.start + self.old_size;
        if self.is_empty() || pos < self.start {
            return MapResult {
                pos,
                deleted: false,
            };
        }
        if pos > end {
            return MapResult {
                pos: pos - self.old_size + self.new_size,
                deleted: false,
            };
        }
        let side = if self.old_size == 0 {
            assoc
        } else if pos == self.start {
            Assoc::Before
        } else if pos == end {
            Assoc::After
        } else {
            assoc
        };
        let mapped = match side {
            Assoc::Before => self.start,
            Assoc::After => self.start + self.new_size,
        };
        MapResult {
            pos: mapped,
            deleted: pos > self.start && pos < end,
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }
}

/// An ordered chain of step maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_from(0, pos, assoc)
    }

    /// Maps through the step maps starting at index `from`, for positions
    /// that were computed part way through a transaction.
    pub fn map_from(&self, from: usize, pos: usize, assoc: Assoc) -> usize {
        self.maps
            .iter()
            .skip(from)
            .fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        self.maps.iter().fold(
            MapResult {
                pos,
                deleted: false,
            },
            |acc, map| {
                let next = map.map_result(acc.pos, assoc);
                MapResult {
                    pos: next.pos,
                    deleted: acc.deleted || next.deleted,
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, CellAttrs};
    use crate::schema::NodeType;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn para(text: &str) -> Node {
        Node::paragraph(vec![Node::plain(text)])
    }

    fn cell(text: &str) -> Node {
        Node::new(
            NodeType::TableCell,
            Attrs::Cell(CellAttrs::default()),
            vec![Node::plain(text)],
        )
    }

    #[test]
    fn insert_text_inside_paragraph() {
        let doc = Node::doc(vec![para("hello")]);
        let step = Step::Replace {
            from: 3,
            to: 3,
            content: vec![Node::plain("XY")],
        };
        let out = step.apply(&doc).unwrap();
        assert_eq!(out.text_content(), "heXYllo");
        assert_eq!(out.child(0).unwrap().child_count(), 1);
    }

    #[test]
    fn delete_across_text() {
        let doc = Node::doc(vec![para("hello")]);
        let step = Step::Replace {
            from: 2,
            to: 5,
            content: vec![],
        };
        assert_eq!(step.apply(&doc).unwrap().text_content(), "ho");
    }

    #[test]
    fn replace_across_parents_is_rejected() {
        let doc = Node::doc(vec![para("ab"), para("cd")]);
        let step = Step::Replace {
            from: 2,
            to: 6,
            content: vec![],
        };
        assert_eq!(
            step.apply(&doc),
            Err(TransformError::CrossesBoundary { from: 2, to: 6 })
        );
    }

    #[test]
    fn replace_rejects_disallowed_content() {
        let doc = Node::doc(vec![para("ab")]);
        let step = Step::Replace {
            from: 0,
            to: 0,
            content: vec![cell("x")],
        };
        assert_eq!(
            step.apply(&doc),
            Err(TransformError::InvalidContent {
                parent: "doc",
                child: "table_cell"
            })
        );
    }

    #[test]
    fn set_attrs_on_cell() {
        let row = Node::new(NodeType::TableRow, Attrs::None, vec![cell("x")]);
        let table = Node::new(NodeType::Table, Attrs::None, vec![row]);
        let doc = Node::doc(vec![table]);
        let attrs = Attrs::Cell(CellAttrs::aligned(Some(Alignment::Center)));
        let out = Step::SetAttrs {
            pos: 2,
            attrs: attrs.clone(),
        }
        .apply(&doc)
        .unwrap();
        assert_eq!(out.node_at(2).map(Node::attrs), Some(&attrs));
    }

    #[test]
    fn set_attrs_inside_text_is_rejected() {
        let doc = Node::doc(vec![para("ab")]);
        let step = Step::SetAttrs {
            pos: 2,
            attrs: Attrs::None,
        };
        assert_eq!(step.apply(&doc), Err(TransformError::NoNodeAt(2)));
    }

    #[rstest]
    #[case(0, Assoc::After, 0, false)]
    #[case(5, Assoc::Before, 5, false)]
    #[case(5, Assoc::After, 8, false)]
    #[case(9, Assoc::After, 12, false)]
    fn insertion_map(
        #[case] pos: usize,
        #[case] assoc: Assoc,
        #[case] expected: usize,
        #[case] deleted: bool,
    ) {
        let map = StepMap::new(5, 0, 3);
        assert_eq!(map.map_result(pos, assoc), MapResult { pos: expected, deleted });
    }

    #[rstest]
    #[case(4, 4, false)]
    #[case(5, 5, false)]
    #[case(7, 6, true)]
    #[case(10, 6, false)]
    #[case(12, 8, false)]
    fn replacement_map(#[case] pos: usize, #[case] expected: usize, #[case] deleted: bool) {
        // 5 tokens at 5 replaced by 1
        let map = StepMap::new(5, 5, 1);
        assert_eq!(
            map.map_result(pos, Assoc::After),
            MapResult { pos: expected, deleted }
        );
    }

    #[test]
    fn mapping_chains_and_maps_from_an_index() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(2, 0, 4));
        mapping.push(StepMap::new(10, 2, 0));
        assert_eq!(mapping.map(3, Assoc::After), 7);
        assert_eq!(mapping.map(20, Assoc::After), 22);
        assert_eq!(mapping.map_from(1, 20, Assoc::After), 18);
        assert!(mapping.map_result(7, Assoc::After).deleted);
        assert!(!mapping.map_result(3, Assoc::After).deleted);
    }
}
