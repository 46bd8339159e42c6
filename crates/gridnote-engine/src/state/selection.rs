use serde::Serialize;

use crate::model::Node;
use crate::transform::{Assoc, Mapping};

/// The editor selection, as an explicit tagged variant.
///
/// - `Cursor`: collapsed caret inside a textblock
/// - `Range`: text range between `anchor` and `head`
/// - `Gap`: caret between block nodes where no textblock exists
/// - `Cell`: rectangular cell selection; `anchor` and `head` are the positions
///   directly before the anchor and head cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Selection {
    Cursor { pos: usize },
    Range { anchor: usize, head: usize },
    Gap { pos: usize },
    Cell { anchor: usize, head: usize },
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Cursor { pos }
    }

    /// A text range, collapsed into a cursor when empty.
    pub fn range(anchor: usize, head: usize) -> Self {
        if anchor == head {
            Selection::Cursor { pos: head }
        } else {
            Selection::Range { anchor, head }
        }
    }

    pub fn anchor(&self) -> usize {
        match *self {
            Selection::Cursor { pos } | Selection::Gap { pos } => pos,
            Selection::Range { anchor, .. } | Selection::Cell { anchor, .. } => anchor,
        }
    }

    pub fn head(&self) -> usize {
        match *self {
            Selection::Cursor { pos } | Selection::Gap { pos } => pos,
            Selection::Range { head, .. } | Selection::Cell { head, .. } => head,
        }
    }

    pub fn from(&self) -> usize {
        self.anchor().min(self.head())
    }

    pub fn to(&self) -> usize {
        self.anchor().max(self.head())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Cursor { .. } | Selection::Gap { .. })
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Selection::Gap { .. })
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, Selection::Cell { .. })
    }

    /// Maps the selection through `mapping` into `doc`, falling back to the
    /// nearest valid selection when its target no longer exists.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        let size = doc.content_size();
        let map = |pos: usize| mapping.map(pos, Assoc::After).min(size);
        match *self {
            Selection::Cursor { pos } => {
                let pos = map(pos);
                if in_textblock(doc, pos) {
                    Selection::Cursor { pos }
                } else {
                    Selection::near(doc, pos)
                }
            }
            Selection::Range { anchor, head } => {
                let (anchor, head) = (map(anchor), map(head));
                if in_textblock(doc, anchor) && in_textblock(doc, head) {
                    Selection::range(anchor, head)
                } else {
                    Selection::near(doc, head)
                }
            }
            Selection::Gap { pos } => Selection::Gap { pos: map(pos) },
            Selection::Cell { anchor, head } => {
                let (anchor, head) = (map(anchor), map(head));
                let is_cell = |pos| doc.node_at(pos).is_some_and(|n| n.kind().is_cell());
                if is_cell(anchor) && is_cell(head) {
                    Selection::Cell { anchor, head }
                } else {
                    Selection::near(doc, head)
                }
            }
        }
    }

    /// The closest cursor position to `pos`, searching forward first. Falls
    /// back to a gap selection when the document has no textblock.
    pub fn near(doc: &Node, pos: usize) -> Selection {
        find_text_pos(doc, pos, true)
            .or_else(|| find_text_pos(doc, pos, false))
            .map(Selection::cursor)
            .unwrap_or(Selection::Gap {
                pos: pos.min(doc.content_size()),
            })
    }

    pub fn at_start(doc: &Node) -> Selection {
        Selection::near(doc, 0)
    }
}

fn in_textblock(doc: &Node, pos: usize) -> bool {
    doc.resolve(pos).is_ok_and(|rp| rp.parent().is_textblock())
}

/// Nearest position inside a textblock, at or after (`forward`) or at or
/// before `pos`.
pub fn find_text_pos(doc: &Node, pos: usize, forward: bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    doc.descendants(&mut |node, at| {
        if !node.is_textblock() {
            return true;
        }
        let (start, end) = (at + 1, at + 1 + node.content_size());
        let candidate = if (start..=end).contains(&pos) {
            Some(pos)
        } else if forward && start > pos {
            Some(start)
        } else if !forward && end < pos {
            Some(end)
        } else {
            None
        };
        if let Some(c) = candidate {
            best = match best {
                Some(b) if forward => Some(b.min(c)),
                Some(b) => Some(b.max(c)),
                None => Some(c),
            };
        }
        false
    });
    best
}
