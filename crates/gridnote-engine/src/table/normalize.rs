//! Table repair passes.
//!
//! Two independent passes: [`normalize_tables`] pads short rows with empty
//! cells so every row is as wide as the widest one, and [`fix_tables`]
//! repairs structure (stray children, impossible spans) without ever adding
//! cells. Neither runs the other.

use super::commands::empty_cell;
use super::map::{TableMap, TableProblem};
use crate::command::{Dispatch, send};
use crate::model::{Attrs, Fragment, Node};
use crate::schema::{Group, NodeType};
use crate::state::EditorState;
use crate::transform::{Assoc, Transaction, TransformError};

/// Rounds of span repair before giving up on a table.
const MAX_SPAN_REPAIRS: usize = 8;

fn tables_in(doc: &Node) -> Vec<(usize, Node)> {
    let mut tables = Vec::new();
    doc.descendants(&mut |node, pos| {
        if node.kind() == NodeType::Table {
            tables.push((pos, node.clone()));
            return false;
        }
        true
    });
    tables
}

fn row_width(row: &Node) -> usize {
    row.children()
        .filter(|c| c.kind().is_cell())
        .map(Node::colspan)
        .sum()
}

/// Transaction appending empty cells to every row that is narrower than the
/// widest row of its table, or `None` when all tables are rectangular.
///
/// Widths count `colspan`. New cells copy the kind of the row's first cell
/// and the alignment of their column.
pub fn normalize_table_columns(state: &EditorState) -> Option<Transaction> {
    let mut tr = state.tr();
    let result = (|| -> Result<(), TransformError> {
        for (pos, table) in tables_in(state.doc()) {
            let width = table.children().map(row_width).max().unwrap_or(0);
            let alignments = TableMap::get(&table).column_alignments(&table);
            let mut row_end = pos + 1;
            for row in table.children() {
                row_end += row.node_size();
                let have = row_width(row);
                if row.kind() != NodeType::TableRow || have >= width {
                    continue;
                }
                let kind = row
                    .first_child()
                    .filter(|c| c.kind().is_cell())
                    .map_or(NodeType::TableCell, Node::kind);
                let cells = (have..width)
                    .map(|col| empty_cell(kind, alignments.get(col).copied().flatten()))
                    .collect();
                let at = tr.mapping().map(row_end - 1, Assoc::Before);
                tr.insert(at, cells)?;
                log::debug!("normalize: padded row ending at {row_end} by {}", width - have);
            }
        }
        Ok(())
    })();
    if let Err(err) = result {
        log::warn!("normalize_table_columns: {err}");
        return None;
    }
    tr.doc_changed().then_some(tr)
}

/// Pads every short table row in the document with empty cells.
pub fn normalize_tables(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    let Some(tr) = normalize_table_columns(state) else {
        return false;
    };
    send(dispatch, tr);
    true
}

fn is_inline(node: &Node) -> bool {
    node.kind().group() == Some(Group::Inline)
}

/// Cells of a row: cells pass through, runs of inline content and the
/// content of stray textblocks become body cells, anything else is dropped.
fn repair_row_content(row: &Node) -> Vec<Node> {
    let mut cells = Vec::new();
    let mut inline = Vec::new();
    let flush = |inline: &mut Vec<Node>, cells: &mut Vec<Node>| {
        if !inline.is_empty() {
            cells.push(Node::new(
                NodeType::TableCell,
                Attrs::Cell(Default::default()),
                std::mem::take(inline),
            ));
        }
    };
    for child in row.children() {
        if is_inline(child) {
            inline.push(child.clone());
            continue;
        }
        flush(&mut inline, &mut cells);
        if child.kind().is_cell() {
            cells.push(child.clone());
        } else if child.is_textblock() {
            cells.push(Node::with_fragment(
                NodeType::TableCell,
                Attrs::Cell(Default::default()),
                child.content().clone(),
            ));
        } else {
            log::debug!("fix_table: dropping {} from row", child.kind());
        }
    }
    flush(&mut inline, &mut cells);
    cells
}

/// Rows of a table with stray children repaired: runs of cells or inline
/// content are wrapped into new rows, empty rows and other nodes dropped.
fn repair_rows(table: &Node) -> Vec<Node> {
    let mut rows = Vec::new();
    let mut stray = Vec::new();
    let flush = |stray: &mut Vec<Node>, rows: &mut Vec<Node>| {
        if !stray.is_empty() {
            let loose = Node::new(NodeType::TableRow, Attrs::None, std::mem::take(stray));
            rows.push(Node::new(NodeType::TableRow, Attrs::None, repair_row_content(&loose)));
        }
    };
    for child in table.children() {
        if child.kind().is_cell() || is_inline(child) {
            stray.push(child.clone());
            continue;
        }
        flush(&mut stray, &mut rows);
        if child.kind() == NodeType::TableRow {
            rows.push(child.with_content(Fragment::from_vec(repair_row_content(child))));
        } else {
            log::debug!("fix_table: dropping {} from table", child.kind());
        }
    }
    flush(&mut stray, &mut rows);
    rows.retain(|row| row.child_count() > 0);
    rows
}

/// Copy of `table` with the cell at table-relative `pos` updated.
fn update_cell(table: &Node, pos: usize, f: impl FnOnce(&Node) -> Node) -> Node {
    let mut row_start = 0;
    for (r, row) in table.children().enumerate() {
        let row_end = row_start + row.node_size();
        if pos > row_start && pos < row_end {
            let mut offset = row_start + 1;
            for (c, cell) in row.children().enumerate() {
                if offset == pos {
                    return table.replace_child(r, row.replace_child(c, f(cell)));
                }
                offset += cell.node_size();
            }
            break;
        }
        row_start = row_end;
    }
    table.clone()
}

fn with_spans(cell: &Node, colspan: usize, rowspan: usize) -> Node {
    let mut attrs = cell.cell_attrs().cloned().unwrap_or_default();
    attrs.colspan = colspan.max(1) as u32;
    attrs.rowspan = rowspan.max(1) as u32;
    if let Some(widths) = &mut attrs.colwidth {
        widths.truncate(attrs.colspan as usize);
    }
    cell.with_attrs(Attrs::Cell(attrs))
}

/// Structurally repaired copy of `table`, or `None` when it needs nothing.
///
/// Stray children are wrapped or dropped, rowspans running past the last row
/// are clipped and colspans overlapping other cells are reduced. Rows that
/// are merely short are left alone. The result may have no rows.
pub fn fix_table(table: &Node) -> Option<Node> {
    let mut fixed = table.with_content(Fragment::from_vec(repair_rows(table)));
    for _ in 0..MAX_SPAN_REPAIRS {
        let map = TableMap::compute(&fixed);
        let mut changed = false;
        for problem in &map.problems {
            match *problem {
                TableProblem::OverlongRowspan { pos, n } => {
                    fixed = update_cell(&fixed, pos, |cell| {
                        with_spans(cell, cell.colspan(), cell.rowspan().saturating_sub(n))
                    });
                    changed = true;
                }
                TableProblem::Collision { pos, n, .. } => {
                    fixed = update_cell(&fixed, pos, |cell| {
                        with_spans(cell, cell.colspan().saturating_sub(n), cell.rowspan())
                    });
                    changed = true;
                }
                TableProblem::Missing { .. } => {}
            }
            if changed {
                // positions in the remaining problems refer to the old layout
                break;
            }
        }
        if !changed {
            break;
        }
    }
    (fixed != *table).then_some(fixed)
}

/// Repairs every malformed table in the document. A table left without rows
/// is removed, replaced by an empty paragraph when it was the only child.
pub fn fix_tables(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    let doc = state.doc();
    let repairs: Vec<(usize, Node, Node)> = tables_in(doc)
        .into_iter()
        .filter_map(|(pos, table)| fix_table(&table).map(|fixed| (pos, table, fixed)))
        .collect();
    if repairs.is_empty() {
        return false;
    }
    if dispatch.is_none() {
        return true;
    }
    let mut tr = state.tr();
    for (pos, table, fixed) in repairs {
        let from = tr.mapping().map(pos, Assoc::After);
        let to = tr.mapping().map(pos + table.node_size(), Assoc::Before);
        let replacement = if fixed.child_count() > 0 {
            vec![fixed]
        } else if tr
            .doc()
            .resolve(from)
            .is_ok_and(|rp| rp.parent().child_count() == 1)
        {
            vec![Node::paragraph(Vec::new())]
        } else {
            Vec::new()
        };
        if let Err(err) = tr.replace_with(from, to, replacement) {
            log::warn!("fix_tables: {err}");
            return false;
        }
        log::debug!("fix_tables: repaired table at {pos}");
    }
    send(dispatch, tr);
    true
}
