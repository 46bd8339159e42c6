use std::rc::Rc;

use super::map::{Rect, TableMap};
use crate::model::{Node, ResolvedPos};
use crate::schema::NodeType;
use crate::state::{EditorState, Selection};

/// A table located in a document.
#[derive(Debug, Clone)]
pub struct TableLoc {
    pub table: Node,
    /// Position directly before the table.
    pub pos: usize,
    /// Position of the start of the table's content.
    pub start: usize,
}

impl TableLoc {
    pub fn end(&self) -> usize {
        self.start + self.table.content_size()
    }

    pub fn map(&self) -> Rc<TableMap> {
        TableMap::get(&self.table)
    }
}

/// The selected cell rectangle together with its table.
#[derive(Debug, Clone)]
pub struct TableRect {
    pub rect: Rect,
    pub map: Rc<TableMap>,
    pub table: Node,
    pub table_pos: usize,
    pub table_start: usize,
}

impl TableRect {
    /// Re-reads the table from `doc` after earlier steps changed it.
    pub(crate) fn refresh(&mut self, doc: &Node) -> bool {
        match doc.node_at(self.table_pos) {
            Some(table) if table.kind() == NodeType::Table => {
                self.table = table.clone();
                self.map = TableMap::get(table);
                true
            }
            _ => false,
        }
    }
}

/// Innermost table containing `rp`.
pub fn table_around(rp: &ResolvedPos<'_>) -> Option<TableLoc> {
    let depth = rp.find_ancestor(|n| n.kind() == NodeType::Table)?;
    Some(TableLoc {
        table: rp.node(depth).clone(),
        pos: rp.before(depth),
        start: rp.start(depth),
    })
}

/// Position directly before the cell containing `rp`.
pub fn cell_around(rp: &ResolvedPos<'_>) -> Option<usize> {
    let depth = rp.find_ancestor(|n| n.kind().is_cell())?;
    Some(rp.before(depth))
}

/// Whether the position lies inside a cell's content.
pub fn in_cell(doc: &Node, pos: usize) -> bool {
    doc.resolve(pos).is_ok_and(|rp| rp.parent().kind().is_cell())
}

/// Whether the selection head sits inside a table row.
pub fn is_in_table(state: &EditorState) -> bool {
    state
        .doc()
        .resolve(state.selection().head())
        .is_ok_and(|rp| rp.find_ancestor(|n| n.kind() == NodeType::TableRow).is_some())
}

/// Positions before the selected cells: every cell of a cell selection, or
/// the cell around the cursor.
pub fn selected_cells(state: &EditorState) -> Vec<usize> {
    let Some(rect) = selected_rect(state) else {
        return Vec::new();
    };
    match state.selection() {
        Selection::Cell { .. } => rect
            .map
            .cells_in_rect(rect.rect)
            .into_iter()
            .map(|rel| rect.table_start + rel)
            .collect(),
        _ => state
            .doc()
            .resolve(state.selection().head())
            .ok()
            .and_then(|rp| cell_around(&rp))
            .into_iter()
            .collect(),
    }
}

/// The rectangle covered by the selection inside its table.
pub fn selected_rect(state: &EditorState) -> Option<TableRect> {
    let doc = state.doc();
    let selection = state.selection();
    let (loc, rect) = match selection {
        Selection::Cell { anchor, head } => {
            let loc = table_around(&doc.resolve(anchor).ok()?)?;
            let map = loc.map();
            let rect = map.rect_between(
                anchor.checked_sub(loc.start)?,
                head.checked_sub(loc.start)?,
            )?;
            (loc, rect)
        }
        _ => {
            let rp = doc.resolve(selection.head()).ok()?;
            let cell = cell_around(&rp)?;
            let loc = table_around(&rp)?;
            let rect = loc.map().find_cell(cell - loc.start)?;
            (loc, rect)
        }
    };
    Some(TableRect {
        rect,
        map: loc.map(),
        table: loc.table,
        table_pos: loc.pos,
        table_start: loc.start,
    })
}
