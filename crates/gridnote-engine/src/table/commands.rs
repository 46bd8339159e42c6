use std::collections::HashSet;

use super::map::{Rect, TableMap};
use super::util::{TableRect, cell_around, is_in_table, selected_cells, selected_rect, table_around};
use crate::command::{Direction, Dispatch, command, send};
use crate::model::{Alignment, Attrs, CellAttrs, Node};
use crate::schema::NodeType;
use crate::state::{EditorState, Selection};
use crate::transform::{Assoc, Transaction, TransformError};

pub(crate) fn empty_cell(kind: NodeType, alignment: Option<Alignment>) -> Node {
    Node::new(kind, Attrs::Cell(CellAttrs::aligned(alignment)), Vec::new())
}

/// A `rows` x `cols` table of empty cells, the first row made of header cells
/// when `with_header` is set.
pub fn build_table(rows: usize, cols: usize, with_header: bool) -> Node {
    let rows = (0..rows)
        .map(|r| {
            let kind = if r == 0 && with_header {
                NodeType::TableHeader
            } else {
                NodeType::TableCell
            };
            let cells = (0..cols).map(|_| empty_cell(kind, None)).collect();
            Node::new(NodeType::TableRow, Attrs::None, cells)
        })
        .collect();
    Node::new(NodeType::Table, Attrs::None, rows)
}

/// Inserts a new table at the selection and puts the cursor in its first cell.
///
/// An empty textblock is replaced by the table; otherwise the table goes
/// before the textblock when the cursor is at its start, after it elsewhere.
/// An empty paragraph follows the table when nothing else would.
pub fn create_table(
    rows: usize,
    cols: usize,
    with_header: bool,
) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    command(move |state: &EditorState, dispatch: Dispatch<'_>| {
        if rows == 0 || cols == 0 {
            return false;
        }
        let schema = state.schema();
        let missing = [
            NodeType::Table,
            NodeType::TableRow,
            NodeType::TableCell,
            NodeType::TableHeader,
        ]
        .into_iter()
        .any(|ty| schema.require(ty).is_err());
        if missing {
            return false;
        }
        let doc = state.doc();
        let Ok(rp) = doc.resolve(state.selection().from()) else {
            return false;
        };
        if rp.find_ancestor(|n| n.kind().is_table_part()).is_some() {
            return false;
        }

        let depth = rp.depth();
        let in_textblock = depth > 0 && rp.parent().is_textblock();
        let (from, to) = if in_textblock {
            if rp.parent().content_size() == 0 {
                (rp.before(depth), rp.after(depth))
            } else if rp.parent_offset() == 0 {
                (rp.before(depth), rp.before(depth))
            } else {
                (rp.after(depth), rp.after(depth))
            }
        } else {
            (rp.pos, rp.pos)
        };
        let container = if in_textblock { depth - 1 } else { depth };
        if !rp.node(container).kind().content_rule().allows(NodeType::Table) {
            return false;
        }
        if dispatch.is_none() {
            return true;
        }

        let table = build_table(rows, cols, with_header);
        let table_size = table.node_size();
        let mut tr = state.tr();
        let result = (|| -> Result<(), TransformError> {
            tr.replace_with(from, to, vec![table])?;
            let end = from + table_size;
            let after = tr.doc().resolve(end)?;
            if after.node_after().is_none() {
                tr.insert(end, vec![Node::paragraph(Vec::new())])?;
            }
            Ok(())
        })();
        if let Err(err) = result {
            log::warn!("create_table: {err}");
            return false;
        }
        tr.set_selection(Selection::cursor(from + 3));
        log::debug!("create_table: {rows}x{cols} at {from}");
        send(dispatch, tr);
        true
    })
}

fn row_is_header(map: &TableMap, table: &Node, row: usize) -> bool {
    if row >= map.height {
        return false;
    }
    (0..map.width).all(|col| {
        map.map[row * map.width + col]
            .and_then(|pos| table.node_at(pos))
            .is_some_and(|cell| cell.kind() == NodeType::TableHeader)
    })
}

fn column_is_header(map: &TableMap, table: &Node, col: usize) -> bool {
    if col >= map.width {
        return false;
    }
    (0..map.height).all(|row| {
        map.map[row * map.width + col]
            .and_then(|pos| table.node_at(pos))
            .is_some_and(|cell| cell.kind() == NodeType::TableHeader)
    })
}

fn set_cell_attrs(cell: &Node, f: impl FnOnce(&mut CellAttrs)) -> Attrs {
    let mut attrs = cell.cell_attrs().cloned().unwrap_or_default();
    f(&mut attrs);
    Attrs::Cell(attrs)
}

/// Inserts an empty row at grid row `row`, returning the position before the
/// new row.
///
/// Cells reaching across the insertion point from above get their rowspan
/// extended. New cells copy the kind of the neighbouring row (falling back to
/// body cells next to a header row at the table edge) and the alignment of
/// their column.
pub fn add_row(tr: &mut Transaction, ctx: &TableRect, row: usize) -> Result<usize, TransformError> {
    let TableRect {
        map,
        table,
        table_start,
        ..
    } = ctx;
    let mut row_pos = *table_start;
    for i in 0..row {
        row_pos += table.child(i).map_or(0, Node::node_size);
    }
    // Row whose cell kinds the new row copies. A header row is only copied
    // when the new row lands between two header rows.
    let mut template = Some(row.saturating_sub(1));
    if row_is_header(map, table, row.saturating_sub(1)) {
        template = if row == 0 || row == map.height {
            None
        } else {
            Some(row)
        };
    }
    let alignments = map.column_alignments(table);

    let mut cells = Vec::new();
    let mut col = 0;
    while col < map.width {
        let index = row * map.width + col;
        if row > 0
            && row < map.height
            && let Some(pos) = map.map[index]
            && map.map[index - map.width] == Some(pos)
            && let Some(cell) = table.node_at(pos)
        {
            let attrs = set_cell_attrs(cell, |a| a.rowspan += 1);
            tr.set_node_attrs(tr.mapping().map(table_start + pos, Assoc::After), attrs)?;
            col += cell.colspan();
            continue;
        }
        let kind = template
            .and_then(|r| map.map.get(r * map.width + col).copied().flatten())
            .and_then(|pos| table.node_at(pos))
            .map_or(NodeType::TableCell, Node::kind);
        cells.push(empty_cell(kind, alignments.get(col).copied().flatten()));
        col += 1;
    }
    let row_pos = tr.mapping().map(row_pos, Assoc::After);
    tr.insert(row_pos, vec![Node::new(NodeType::TableRow, Attrs::None, cells)])?;
    Ok(row_pos)
}

fn row_command(
    state: &EditorState,
    dispatch: Dispatch<'_>,
    name: &str,
    pick: impl Fn(&Rect) -> usize,
) -> bool {
    let Some(ctx) = selected_rect(state) else {
        return false;
    };
    if dispatch.is_none() {
        return true;
    }
    let mut tr = state.tr();
    if let Err(err) = add_row(&mut tr, &ctx, pick(&ctx.rect)) {
        log::warn!("{name}: {err}");
        return false;
    }
    log::debug!("{name}: table at {}", ctx.table_pos);
    send(dispatch, tr);
    true
}

pub fn add_row_before(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    row_command(state, dispatch, "add_row_before", |rect| rect.top)
}

pub fn add_row_after(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    row_command(state, dispatch, "add_row_after", |rect| rect.bottom)
}

/// Inserts an empty column at grid column `col`.
///
/// Cells spanning across the column get their colspan extended; everywhere
/// else a new cell of the same kind as its left (or right, at the first
/// column) neighbour is inserted.
pub fn add_column(tr: &mut Transaction, ctx: &TableRect, col: usize) -> Result<(), TransformError> {
    let TableRect {
        map,
        table,
        table_start,
        ..
    } = ctx;
    let mut template = Some(col.saturating_sub(1));
    if column_is_header(map, table, col.saturating_sub(1)) {
        template = if col == 0 || col == map.width {
            None
        } else {
            Some(col)
        };
    }
    let mut row = 0;
    while row < map.height {
        let index = row * map.width + col;
        if col > 0
            && col < map.width
            && let Some(pos) = map.map[index]
            && map.map[index - 1] == Some(pos)
            && let Some(cell) = table.node_at(pos)
        {
            let offset = col - map.col_count(pos).unwrap_or(col);
            let attrs = set_cell_attrs(cell, |a| {
                a.colspan += 1;
                if let Some(widths) = &mut a.colwidth {
                    widths.insert(offset.min(widths.len()), 0);
                }
            });
            tr.set_node_attrs(tr.mapping().map(table_start + pos, Assoc::After), attrs)?;
            row += cell.rowspan();
            continue;
        }
        let kind = template
            .and_then(|c| map.map.get(row * map.width + c).copied().flatten())
            .and_then(|pos| table.node_at(pos))
            .map_or(NodeType::TableCell, Node::kind);
        let pos = map.position_at(row, col, table);
        tr.insert(
            tr.mapping().map(table_start + pos, Assoc::After),
            vec![empty_cell(kind, None)],
        )?;
        row += 1;
    }
    Ok(())
}

fn column_command(
    state: &EditorState,
    dispatch: Dispatch<'_>,
    name: &str,
    pick: impl Fn(&Rect) -> usize,
) -> bool {
    let Some(ctx) = selected_rect(state) else {
        return false;
    };
    if dispatch.is_none() {
        return true;
    }
    let mut tr = state.tr();
    if let Err(err) = add_column(&mut tr, &ctx, pick(&ctx.rect)) {
        log::warn!("{name}: {err}");
        return false;
    }
    log::debug!("{name}: table at {}", ctx.table_pos);
    send(dispatch, tr);
    true
}

pub fn add_column_before(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    column_command(state, dispatch, "add_column_before", |rect| rect.left)
}

pub fn add_column_after(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    column_command(state, dispatch, "add_column_after", |rect| rect.right)
}

/// Removes grid row `row`. Cells reaching into it from above lose one row of
/// span; cells starting in it and reaching below are moved down a row.
fn remove_row(tr: &mut Transaction, ctx: &TableRect, row: usize) -> Result<(), TransformError> {
    let TableRect {
        map,
        table,
        table_start,
        ..
    } = ctx;
    let mut row_pos = 0;
    for i in 0..row {
        row_pos += table.child(i).map_or(0, Node::node_size);
    }
    let next_row = row_pos + table.child(row).map_or(0, Node::node_size);
    let map_from = tr.mapping().len();
    tr.delete(row_pos + table_start, next_row + table_start)?;

    let mut seen = HashSet::new();
    let mut col = 0;
    while col < map.width {
        let index = row * map.width + col;
        let Some(pos) = map.map[index] else {
            col += 1;
            continue;
        };
        if !seen.insert(pos) {
            col += 1;
            continue;
        }
        let Some(cell) = table.node_at(pos) else {
            col += 1;
            continue;
        };
        let above = index.checked_sub(map.width).and_then(|i| map.map[i]);
        let below = map.map.get(index + map.width).copied().flatten();
        if row > 0 && above == Some(pos) {
            let attrs = set_cell_attrs(cell, |a| a.rowspan = a.rowspan.saturating_sub(1).max(1));
            let at = tr.mapping().map_from(map_from, pos + table_start, Assoc::After);
            tr.set_node_attrs(at, attrs)?;
        } else if below == Some(pos) {
            let attrs = set_cell_attrs(cell, |a| a.rowspan = a.rowspan.saturating_sub(1).max(1));
            let copy = Node::with_fragment(cell.kind(), attrs, cell.content().clone());
            let new_pos = map.position_at(row + 1, col, table);
            let at = tr.mapping().map_from(map_from, table_start + new_pos, Assoc::After);
            tr.insert(at, vec![copy])?;
        }
        col += cell.colspan();
    }
    Ok(())
}

/// Removes the selected rows, or the whole table when every row is selected.
pub fn delete_row(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    let Some(mut ctx) = selected_rect(state) else {
        return false;
    };
    if dispatch.is_none() {
        return true;
    }
    if ctx.rect.top == 0 && ctx.rect.bottom == ctx.map.height {
        return delete_table(state, dispatch);
    }
    let mut tr = state.tr();
    let result = (|| -> Result<(), TransformError> {
        let mut row = ctx.rect.bottom;
        while row > ctx.rect.top {
            row -= 1;
            remove_row(&mut tr, &ctx, row)?;
            if row > ctx.rect.top && !ctx.refresh(tr.doc()) {
                break;
            }
        }
        Ok(())
    })();
    if let Err(err) = result {
        log::warn!("delete_row: {err}");
        return false;
    }
    log::debug!("delete_row: rows {}..{}", ctx.rect.top, ctx.rect.bottom);
    send(dispatch, tr);
    true
}

fn remove_column(tr: &mut Transaction, ctx: &TableRect, col: usize) -> Result<(), TransformError> {
    let TableRect {
        map,
        table,
        table_start,
        ..
    } = ctx;
    let map_start = tr.mapping().len();
    let mut row = 0;
    while row < map.height {
        let index = row * map.width + col;
        let Some(pos) = map.map[index] else {
            row += 1;
            continue;
        };
        let Some(cell) = table.node_at(pos) else {
            row += 1;
            continue;
        };
        let spans_left = col > 0 && map.map[index - 1] == Some(pos);
        let spans_right = col + 1 < map.width && map.map[index + 1] == Some(pos);
        let at = tr.mapping().map_from(map_start, table_start + pos, Assoc::After);
        if spans_left || spans_right {
            let offset = col - map.col_count(pos).unwrap_or(col);
            let attrs = set_cell_attrs(cell, |a| {
                a.colspan = a.colspan.saturating_sub(1).max(1);
                if let Some(widths) = &mut a.colwidth {
                    if offset < widths.len() {
                        widths.remove(offset);
                    }
                    if widths.is_empty() {
                        a.colwidth = None;
                    }
                }
            });
            tr.set_node_attrs(at, attrs)?;
        } else {
            tr.delete(at, at + cell.node_size())?;
        }
        row += cell.rowspan();
    }
    Ok(())
}

/// Removes the selected columns, or the whole table when every column is
/// selected.
pub fn delete_column(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    let Some(mut ctx) = selected_rect(state) else {
        return false;
    };
    if dispatch.is_none() {
        return true;
    }
    if ctx.rect.left == 0 && ctx.rect.right == ctx.map.width {
        return delete_table(state, dispatch);
    }
    let mut tr = state.tr();
    let result = (|| -> Result<(), TransformError> {
        let mut col = ctx.rect.right;
        while col > ctx.rect.left {
            col -= 1;
            remove_column(&mut tr, &ctx, col)?;
            if col > ctx.rect.left && !ctx.refresh(tr.doc()) {
                break;
            }
        }
        Ok(())
    })();
    if let Err(err) = result {
        log::warn!("delete_column: {err}");
        return false;
    }
    log::debug!("delete_column: columns {}..{}", ctx.rect.left, ctx.rect.right);
    send(dispatch, tr);
    true
}

/// Removes the table around the selection. A table that was its parent's
/// only child is replaced by an empty paragraph.
pub fn delete_table(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    let doc = state.doc();
    let Some(loc) = doc
        .resolve(state.selection().head())
        .ok()
        .and_then(|rp| table_around(&rp))
    else {
        return false;
    };
    if dispatch.is_none() {
        return true;
    }
    let end = loc.pos + loc.table.node_size();
    let only_child = doc
        .resolve(loc.pos)
        .is_ok_and(|rp| rp.parent().child_count() == 1);
    let replacement = if only_child {
        vec![Node::paragraph(Vec::new())]
    } else {
        Vec::new()
    };
    let mut tr = state.tr();
    if let Err(err) = tr.replace_with(loc.pos, end, replacement) {
        log::warn!("delete_table: {err}");
        return false;
    }
    let selection = Selection::near(tr.doc(), loc.pos);
    tr.set_selection(selection);
    log::debug!("delete_table: table at {}", loc.pos);
    send(dispatch, tr);
    true
}

fn align_cells(
    state: &EditorState,
    dispatch: Dispatch<'_>,
    cells: Vec<usize>,
    alignment: Option<Alignment>,
) -> bool {
    let doc = state.doc();
    let targets: Vec<(usize, Attrs)> = cells
        .into_iter()
        .filter_map(|pos| {
            let cell = doc.node_at(pos).filter(|n| n.kind().is_cell())?;
            let current = cell.cell_attrs().and_then(|a| a.alignment);
            (current != alignment).then(|| (pos, set_cell_attrs(cell, |a| a.alignment = alignment)))
        })
        .collect();
    if targets.is_empty() {
        return false;
    }
    if dispatch.is_none() {
        return true;
    }
    let mut tr = state.tr();
    for (pos, attrs) in targets {
        if let Err(err) = tr.set_node_attrs(pos, attrs) {
            log::warn!("set alignment: {err}");
            return false;
        }
    }
    send(dispatch, tr);
    true
}

/// Sets the alignment of the selected cells.
pub fn set_cell_alignment(alignment: Option<Alignment>) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    command(move |state: &EditorState, dispatch: Dispatch<'_>| {
        if !is_in_table(state) && !state.selection().is_cell() {
            return false;
        }
        align_cells(state, dispatch, selected_cells(state), alignment)
    })
}

/// Sets the alignment of every cell in the selected columns, which is what a
/// GFM delimiter row can express.
pub fn set_column_alignment(alignment: Option<Alignment>) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    command(move |state: &EditorState, dispatch: Dispatch<'_>| {
        let Some(ctx) = selected_rect(state) else {
            return false;
        };
        let columns = Rect {
            left: ctx.rect.left,
            right: ctx.rect.right,
            top: 0,
            bottom: ctx.map.height,
        };
        let cells = ctx
            .map
            .cells_in_rect(columns)
            .into_iter()
            .map(|rel| ctx.table_start + rel)
            .collect();
        align_cells(state, dispatch, cells, alignment)
    })
}

/// Positions before every cell of the table, in document order.
fn cells_in_order(table: &Node, table_start: usize) -> Vec<usize> {
    let mut cells = Vec::new();
    table.descendants(&mut |node, pos| {
        if node.kind().is_cell() {
            cells.push(table_start + pos);
            return false;
        }
        true
    });
    cells
}

/// Selection covering the whole content of the cell at `cell_pos`.
fn select_cell_content(doc: &Node, cell_pos: usize) -> Selection {
    let size = doc.node_at(cell_pos).map_or(0, Node::content_size);
    Selection::range(cell_pos + 1, cell_pos + 1 + size)
}

/// Moves to the next or previous cell in document order (Tab / Shift-Tab),
/// selecting its content. Returns `false` past the first or last cell.
pub fn go_to_next_cell(direction: Direction) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    command(move |state: &EditorState, dispatch: Dispatch<'_>| {
        let doc = state.doc();
        let Ok(rp) = doc.resolve(state.selection().head()) else {
            return false;
        };
        let (Some(cell), Some(loc)) = (cell_around(&rp), table_around(&rp)) else {
            return false;
        };
        let cells = cells_in_order(&loc.table, loc.start);
        let Some(index) = cells.iter().position(|c| *c == cell) else {
            return false;
        };
        let target = match direction {
            Direction::Forward => cells.get(index + 1),
            Direction::Backward => index.checked_sub(1).and_then(|i| cells.get(i)),
        };
        let Some(&target) = target else {
            return false;
        };
        if dispatch.is_some() {
            let mut tr = state.tr();
            tr.set_selection(select_cell_content(doc, target));
            send(dispatch, tr);
        }
        true
    })
}

/// Selects the rectangle of cells between the cells containing `anchor` and
/// `head`, which must be in the same table.
pub fn select_cells(anchor: usize, head: usize) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    command(move |state: &EditorState, dispatch: Dispatch<'_>| {
        let doc = state.doc();
        let locate = |pos: usize| {
            let rp = doc.resolve(pos).ok()?;
            Some((cell_around(&rp)?, table_around(&rp)?.pos))
        };
        let (Some((anchor_cell, t1)), Some((head_cell, t2))) = (locate(anchor), locate(head)) else {
            return false;
        };
        if t1 != t2 {
            return false;
        }
        if dispatch.is_some() {
            let mut tr = state.tr();
            tr.set_selection(Selection::Cell {
                anchor: anchor_cell,
                head: head_cell,
            });
            send(dispatch, tr);
        }
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::parser::parse;
    use crate::schema::Schema;
    use crate::serializer::serialize;
    use pretty_assertions::assert_eq;

    fn run(cmd: impl Command, state: &EditorState) -> Option<EditorState> {
        let mut out = None;
        let mut dispatch = |tr: Transaction| out = Some(state.apply(tr));
        if cmd.run(state, Some(&mut dispatch)) {
            out
        } else {
            None
        }
    }

    fn grid(state: &EditorState) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        state.doc().descendants(&mut |node, _| {
            if node.kind() == NodeType::TableRow {
                rows.push(node.children().map(Node::text_content).collect());
                return false;
            }
            true
        });
        rows
    }

    // Cells: A@2 B@5 | 1@10 2@13 | 3@18 4@21
    fn table_state(cursor: usize) -> EditorState {
        EditorState::new(
            Schema::with_tables(),
            parse("| A | B |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |\n"),
        )
        .with_selection(Selection::cursor(cursor))
    }

    #[test]
    fn create_table_replaces_empty_paragraph() {
        let state = EditorState::from_markdown("");
        let next = run(create_table(2, 3, true), &state).expect("applies");
        let doc = next.doc();
        let table = doc.child(0).unwrap();
        assert_eq!(table.kind(), NodeType::Table);
        assert_eq!(table.child_count(), 2);
        assert_eq!(table.child(0).unwrap().child(0).unwrap().kind(), NodeType::TableHeader);
        assert_eq!(table.child(1).unwrap().child(2).unwrap().kind(), NodeType::TableCell);
        assert_eq!(doc.child(1).map(Node::kind), Some(NodeType::Paragraph));
        assert_eq!(next.selection(), Selection::cursor(3));
        assert_eq!(doc.resolve(3).unwrap().parent().kind(), NodeType::TableHeader);
    }

    #[test]
    fn create_table_goes_after_text() {
        let state = EditorState::from_markdown("intro").with_selection(Selection::cursor(3));
        let next = run(create_table(1, 1, false), &state).expect("applies");
        let kinds: Vec<_> = next.doc().children().map(Node::kind).collect();
        assert_eq!(
            kinds,
            vec![NodeType::Paragraph, NodeType::Table, NodeType::Paragraph]
        );
        assert_eq!(next.selection(), Selection::cursor(10));
    }

    #[test]
    fn create_table_refused_inside_table() {
        let state = table_state(11);
        assert!(!create_table(2, 2, true).can_run(&state));
    }

    #[test]
    fn create_table_needs_table_schema() {
        let state = EditorState::new(Schema::markdown(), parse("x"));
        assert!(!create_table(2, 2, true).can_run(&state));
    }

    #[test]
    fn add_row_after_current() {
        let next = run(add_row_after, &table_state(11)).expect("applies");
        assert_eq!(
            grid(&next),
            vec![
                vec!["A", "B"],
                vec!["1", "2"],
                vec!["", ""],
                vec!["3", "4"]
            ]
        );
    }

    #[test]
    fn add_row_before_header_uses_body_cells() {
        let next = run(add_row_before, &table_state(3)).expect("applies");
        let table = next.doc().child(0).unwrap();
        assert_eq!(table.child_count(), 4);
        assert_eq!(table.child(0).unwrap().child(0).unwrap().kind(), NodeType::TableCell);
    }

    #[test]
    fn new_row_copies_column_alignment() {
        let state = EditorState::from_markdown("| A | B |\n|:-:|--:|\n| 1 | 2 |\n")
            .with_selection(Selection::cursor(11));
        let next = run(add_row_after, &state).expect("applies");
        let row = next.doc().child(0).unwrap().child(2).unwrap();
        let aligns: Vec<_> = row
            .children()
            .map(|c| c.cell_attrs().and_then(|a| a.alignment))
            .collect();
        assert_eq!(aligns, vec![Some(Alignment::Center), Some(Alignment::Right)]);
    }

    #[test]
    fn add_column_after_current() {
        let next = run(add_column_after, &table_state(11)).expect("applies");
        assert_eq!(
            grid(&next),
            vec![
                vec!["A", "", "B"],
                vec!["1", "", "2"],
                vec!["3", "", "4"]
            ]
        );
        let header = next.doc().child(0).unwrap().child(0).unwrap();
        assert_eq!(header.child(1).unwrap().kind(), NodeType::TableHeader);
    }

    #[test]
    fn add_column_before_first() {
        let next = run(add_column_before, &table_state(11)).expect("applies");
        assert_eq!(grid(&next)[1], vec!["", "1", "2"]);
    }

    #[test]
    fn delete_row_removes_current() {
        let next = run(delete_row, &table_state(11)).expect("applies");
        assert_eq!(grid(&next), vec![vec!["A", "B"], vec!["3", "4"]]);
    }

    #[test]
    fn delete_selected_rows() {
        let state = table_state(11).with_selection(Selection::Cell { anchor: 10, head: 21 });
        let next = run(delete_row, &state).expect("applies");
        assert_eq!(grid(&next), vec![vec!["A", "B"]]);
    }

    #[test]
    fn delete_every_row_deletes_table() {
        let state = table_state(11).with_selection(Selection::Cell { anchor: 2, head: 21 });
        let next = run(delete_row, &state).expect("applies");
        assert_eq!(next.doc().child(0).map(Node::kind), Some(NodeType::Paragraph));
        assert_eq!(next.doc().child_count(), 1);
    }

    #[test]
    fn delete_column_removes_current() {
        let next = run(delete_column, &table_state(14)).expect("applies");
        assert_eq!(grid(&next), vec![vec!["A"], vec!["1"], vec!["3"]]);
    }

    #[test]
    fn delete_table_keeps_neighbours() {
        let state = EditorState::from_markdown("before\n\n| A |\n|---|\n| 1 |\n\nafter")
            .with_selection(Selection::cursor(11));
        assert!(is_in_table(&state));
        let next = run(delete_table, &state).expect("applies");
        assert_eq!(serialize(next.doc()), "before\n\nafter\n");
    }

    #[test]
    fn column_alignment_round_trips_through_markdown() {
        let next = run(set_column_alignment(Some(Alignment::Center)), &table_state(14))
            .expect("applies");
        let md = serialize(next.doc());
        assert!(md.contains("| --- | :---: |"), "{md}");
        assert!(!set_column_alignment(Some(Alignment::Center)).can_run(&next));
    }

    #[test]
    fn cell_alignment_changes_only_selection() {
        let next = run(set_cell_alignment(Some(Alignment::Right)), &table_state(11))
            .expect("applies");
        let cell = next.doc().node_at(10).unwrap();
        assert_eq!(cell.cell_attrs().unwrap().alignment, Some(Alignment::Right));
        let other = next.doc().node_at(18).unwrap();
        assert_eq!(other.cell_attrs().unwrap().alignment, None);
    }

    #[test]
    fn alignment_outside_table_is_disabled() {
        let state = EditorState::from_markdown("text");
        assert!(!set_cell_alignment(Some(Alignment::Left)).can_run(&state));
        assert!(!add_row_after.can_run(&state));
        assert!(!delete_table.can_run(&state));
    }

    #[test]
    fn tab_selects_next_cell_content() {
        let next = run(go_to_next_cell(Direction::Forward), &table_state(11)).expect("applies");
        assert_eq!(next.selection(), Selection::Range { anchor: 14, head: 15 });
        let back = run(go_to_next_cell(Direction::Backward), &table_state(11)).expect("applies");
        assert_eq!(back.selection(), Selection::Range { anchor: 6, head: 7 });
    }

    #[test]
    fn tab_stops_at_table_ends() {
        assert!(!go_to_next_cell(Direction::Forward).can_run(&table_state(22)));
        assert!(!go_to_next_cell(Direction::Backward).can_run(&table_state(3)));
    }

    #[test]
    fn select_cells_sets_cell_selection() {
        let next = run(select_cells(3, 14), &table_state(3)).expect("applies");
        assert_eq!(next.selection(), Selection::Cell { anchor: 2, head: 13 });
    }
}
