use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Weak;

use crate::model::{Alignment, Node};
use crate::schema::NodeType;

/// Maps built per thread before dead entries are pruned.
const CACHE_CAPACITY: usize = 32;

/// A rectangle of grid slots, `left..right` by `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Irregularities found while laying out a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableProblem {
    /// The cell at `pos` overlaps `n` slots already taken in `row`.
    Collision { row: usize, pos: usize, n: usize },
    /// `row` is `n` slots short of the table width.
    Missing { row: usize, n: usize },
    /// The cell at `pos` spans `n` rows past the end of the table.
    OverlongRowspan { pos: usize, n: usize },
}

/// Offset range of one cell node relative to the table's content start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellExtent {
    pub pos: usize,
    pub end: usize,
}

/// Grid view of a `table` node.
///
/// `map[row * width + col]` holds the offset, relative to the start of the
/// table's content, of the cell covering that slot. Slots a short row leaves
/// uncovered are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMap {
    pub width: usize,
    pub height: usize,
    pub map: Vec<Option<usize>>,
    pub cells: Vec<CellExtent>,
    pub problems: Vec<TableProblem>,
}

struct CacheEntry {
    key: Weak<[Node]>,
    map: Rc<TableMap>,
}

thread_local! {
    static CACHE: RefCell<Vec<CacheEntry>> = const { RefCell::new(Vec::new()) };
}

impl TableMap {
    /// The map of `table`, computed once per table content identity.
    ///
    /// Entries are keyed by a weak handle on the content allocation, so an
    /// edited table (which always gets a new allocation) misses the cache and
    /// a freed one can never be confused with a new table at the same address.
    pub fn get(table: &Node) -> Rc<TableMap> {
        CACHE.with(|cache| {
            let mut cache = cache.borrow_mut();
            if let Some(entry) = cache.iter().find(|e| table.content().is_same(&e.key)) {
                return Rc::clone(&entry.map);
            }
            if cache.len() >= CACHE_CAPACITY {
                cache.retain(|e| e.key.strong_count() > 0);
                if cache.len() >= CACHE_CAPACITY {
                    cache.remove(0);
                }
            }
            let map = Rc::new(TableMap::compute(table));
            cache.push(CacheEntry {
                key: table.content().identity(),
                map: Rc::clone(&map),
            });
            map
        })
    }

    /// Lays out the table, honouring `colspan` and `rowspan`.
    pub fn compute(table: &Node) -> TableMap {
        let width = find_width(table);
        let height = table.child_count();
        let mut map = vec![None; width * height];
        let mut cells = Vec::new();
        let mut problems = Vec::new();
        let mut map_pos = 0;
        let mut row_start = 0;

        for (row, row_node) in table.children().enumerate() {
            let mut pos = row_start + 1;
            if row_node.kind() == NodeType::TableRow {
                for cell in row_node.children() {
                    if !cell.kind().is_cell() {
                        pos += cell.node_size();
                        continue;
                    }
                    while map_pos < map.len() && map[map_pos].is_some() {
                        map_pos += 1;
                    }
                    let (colspan, rowspan) = (cell.colspan(), cell.rowspan());
                    for h in 0..rowspan {
                        if h + row >= height {
                            problems.push(TableProblem::OverlongRowspan {
                                pos,
                                n: rowspan - h,
                            });
                            break;
                        }
                        let start = map_pos + h * width;
                        for w in 0..colspan {
                            match map.get_mut(start + w) {
                                Some(slot @ None) => *slot = Some(pos),
                                _ => problems.push(TableProblem::Collision {
                                    row,
                                    pos,
                                    n: colspan - w,
                                }),
                            }
                        }
                    }
                    cells.push(CellExtent {
                        pos,
                        end: pos + cell.node_size(),
                    });
                    map_pos += colspan;
                    pos += cell.node_size();
                }
            }
            let row_end = (row + 1) * width;
            let mut missing = 0;
            while map_pos < row_end {
                if map[map_pos].is_none() {
                    missing += 1;
                }
                map_pos += 1;
            }
            map_pos = map_pos.max(row_end);
            if missing > 0 {
                problems.push(TableProblem::Missing { row, n: missing });
            }
            row_start += row_node.node_size();
        }

        TableMap {
            width,
            height,
            map,
            cells,
            problems,
        }
    }

    /// Index of the grid slot for a table-relative position.
    ///
    /// An exact match on a cell's offset wins; otherwise the cell whose
    /// extent contains the position is used. This is the single lookup every
    /// navigation command goes through.
    pub fn cell_index_for(&self, rel: usize) -> Option<usize> {
        if let Some(index) = self.map.iter().position(|p| *p == Some(rel)) {
            return Some(index);
        }
        let cell = self.cells.iter().find(|c| c.pos < rel && rel < c.end)?;
        self.map.iter().position(|p| *p == Some(cell.pos))
    }

    /// Offset of the cell containing `rel` (exact or by extent).
    pub fn cell_at(&self, rel: usize) -> Option<usize> {
        self.cell_index_for(rel).and_then(|i| self.map[i])
    }

    /// The rectangle covered by the cell at or around `rel`.
    pub fn find_cell(&self, rel: usize) -> Option<Rect> {
        let index = self.cell_index_for(rel)?;
        let cell = self.map[index];
        let left = index % self.width;
        let top = index / self.width;
        let mut right = left + 1;
        while right < self.width && self.map[top * self.width + right] == cell {
            right += 1;
        }
        let mut bottom = top + 1;
        while bottom < self.height && self.map[bottom * self.width + left] == cell {
            bottom += 1;
        }
        Some(Rect {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn col_count(&self, rel: usize) -> Option<usize> {
        self.cell_index_for(rel).map(|i| i % self.width)
    }

    /// Offset of the neighbouring cell along `axis`, `None` at the table edge
    /// or when the neighbouring slot is empty.
    pub fn next_cell(&self, rel: usize, axis: Axis, forward: bool) -> Option<usize> {
        let rect = self.find_cell(rel)?;
        let index = match (axis, forward) {
            (Axis::Horizontal, false) => {
                rect.left.checked_sub(1)? + rect.top * self.width
            }
            (Axis::Horizontal, true) => {
                if rect.right >= self.width {
                    return None;
                }
                rect.right + rect.top * self.width
            }
            (Axis::Vertical, false) => rect.left + rect.top.checked_sub(1)? * self.width,
            (Axis::Vertical, true) => {
                if rect.bottom >= self.height {
                    return None;
                }
                rect.left + rect.bottom * self.width
            }
        };
        self.map.get(index).copied().flatten()
    }

    /// Smallest rectangle covering the cells at `a` and `b`.
    pub fn rect_between(&self, a: usize, b: usize) -> Option<Rect> {
        let ra = self.find_cell(a)?;
        let rb = self.find_cell(b)?;
        Some(Rect {
            left: ra.left.min(rb.left),
            top: ra.top.min(rb.top),
            right: ra.right.max(rb.right),
            bottom: ra.bottom.max(rb.bottom),
        })
    }

    /// Offsets of the cells whose top-left corner lies inside `rect`.
    pub fn cells_in_rect(&self, rect: Rect) -> Vec<usize> {
        let mut result: Vec<usize> = Vec::new();
        for row in rect.top..rect.bottom.min(self.height) {
            for col in rect.left..rect.right.min(self.width) {
                let index = row * self.width + col;
                let Some(pos) = self.map[index] else {
                    continue;
                };
                if result.contains(&pos) {
                    continue;
                }
                let continues_left = col == rect.left && col > 0 && self.map[index - 1] == Some(pos);
                let continues_up =
                    row == rect.top && row > 0 && self.map[index - self.width] == Some(pos);
                if continues_left || continues_up {
                    continue;
                }
                result.push(pos);
            }
        }
        result
    }

    /// Table-relative position at which a cell starting at (`row`, `col`)
    /// should be inserted: before the first cell of that row at or right of
    /// `col`, or at the end of the row.
    pub fn position_at(&self, row: usize, col: usize, table: &Node) -> usize {
        let mut row_start = 0;
        for (i, row_node) in table.children().enumerate() {
            let row_end = row_start + row_node.node_size();
            if i == row {
                let row_end_index = (row + 1) * self.width;
                let mut index = col + row * self.width;
                while index < row_end_index && self.map[index].is_none_or(|p| p < row_start) {
                    index += 1;
                }
                return match self.map.get(index).copied().flatten() {
                    Some(pos) if index < row_end_index => pos,
                    _ => row_end - 1,
                };
            }
            row_start = row_end;
        }
        row_start
    }

    /// Per-column alignment, taken from the first row that specifies one.
    pub fn column_alignments(&self, table: &Node) -> Vec<Option<Alignment>> {
        (0..self.width)
            .map(|col| {
                (0..self.height).find_map(|row| {
                    let pos = self.map[row * self.width + col]?;
                    table.node_at(pos)?.cell_attrs()?.alignment
                })
            })
            .collect()
    }
}

/// Column count including cells reaching down from earlier rows.
fn find_width(table: &Node) -> usize {
    let mut width = 0;
    let mut has_rowspan = false;
    for (row, row_node) in table.children().enumerate() {
        let mut row_width = 0;
        if has_rowspan {
            for (j, prev) in table.children().take(row).enumerate() {
                row_width += prev
                    .children()
                    .filter(|c| j + c.rowspan() > row)
                    .map(Node::colspan)
                    .sum::<usize>();
            }
        }
        for cell in row_node.children().filter(|c| c.kind().is_cell()) {
            row_width += cell.colspan();
            has_rowspan |= cell.rowspan() > 1;
        }
        width = width.max(row_width);
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attrs, CellAttrs};
    use pretty_assertions::assert_eq;

    fn cell_with(text: &str, colspan: u32, rowspan: u32) -> Node {
        Node::new(
            NodeType::TableCell,
            Attrs::Cell(CellAttrs {
                colspan,
                rowspan,
                ..CellAttrs::default()
            }),
            vec![Node::plain(text)],
        )
    }

    fn cell(text: &str) -> Node {
        cell_with(text, 1, 1)
    }

    fn row(cells: Vec<Node>) -> Node {
        Node::new(NodeType::TableRow, Attrs::None, cells)
    }

    fn table(rows: Vec<Node>) -> Node {
        Node::new(NodeType::Table, Attrs::None, rows)
    }

    #[test]
    fn regular_grid() {
        // each cell is 3 wide, each row 2 + 6
        let t = table(vec![row(vec![cell("a"), cell("b")]), row(vec![cell("c"), cell("d")])]);
        let map = TableMap::compute(&t);
        assert_eq!(map.width, 2);
        assert_eq!(map.height, 2);
        assert_eq!(map.map, vec![Some(1), Some(4), Some(9), Some(12)]);
        assert!(map.problems.is_empty());
    }

    #[test]
    fn short_row_reports_missing() {
        let t = table(vec![row(vec![cell("a"), cell("b")]), row(vec![cell("c")])]);
        let map = TableMap::compute(&t);
        assert_eq!(map.map, vec![Some(1), Some(4), Some(9), None]);
        assert_eq!(map.problems, vec![TableProblem::Missing { row: 1, n: 1 }]);
    }

    #[test]
    fn spans_fill_the_grid() {
        let t = table(vec![
            row(vec![cell_with("a", 2, 1), cell_with("b", 1, 2)]),
            row(vec![cell("c"), cell("d")]),
        ]);
        let map = TableMap::compute(&t);
        assert_eq!(map.width, 3);
        assert_eq!(
            map.map,
            vec![Some(1), Some(1), Some(4), Some(9), Some(12), Some(4)]
        );
        assert_eq!(
            map.find_cell(1),
            Some(Rect {
                left: 0,
                top: 0,
                right: 2,
                bottom: 1
            })
        );
        assert_eq!(
            map.find_cell(4),
            Some(Rect {
                left: 2,
                top: 0,
                right: 3,
                bottom: 2
            })
        );
    }

    #[test]
    fn overlong_rowspan_is_reported() {
        let t = table(vec![row(vec![cell_with("a", 1, 3)])]);
        let map = TableMap::compute(&t);
        assert_eq!(
            map.problems,
            vec![TableProblem::OverlongRowspan { pos: 1, n: 2 }]
        );
    }

    #[test]
    fn lookup_by_exact_offset_or_extent() {
        let t = table(vec![row(vec![cell("abc"), cell("d")])]);
        let map = TableMap::compute(&t);
        assert_eq!(map.cell_index_for(1), Some(0));
        assert_eq!(map.cell_index_for(3), Some(0));
        assert_eq!(map.cell_index_for(6), Some(1));
        assert_eq!(map.cell_index_for(8), Some(1));
        assert_eq!(map.cell_index_for(0), None);
    }

    #[test]
    fn next_cell_stops_at_edges() {
        let t = table(vec![row(vec![cell("a"), cell("b")]), row(vec![cell("c"), cell("d")])]);
        let map = TableMap::compute(&t);
        assert_eq!(map.next_cell(1, Axis::Horizontal, true), Some(4));
        assert_eq!(map.next_cell(1, Axis::Horizontal, false), None);
        assert_eq!(map.next_cell(1, Axis::Vertical, true), Some(9));
        assert_eq!(map.next_cell(9, Axis::Vertical, true), None);
    }

    #[test]
    fn cells_in_rect_skips_spanned_slots() {
        let t = table(vec![
            row(vec![cell_with("a", 2, 1), cell("b")]),
            row(vec![cell("c"), cell("d"), cell("e")]),
        ]);
        let map = TableMap::compute(&t);
        let all = Rect {
            left: 0,
            top: 0,
            right: 3,
            bottom: 2,
        };
        assert_eq!(map.cells_in_rect(all).len(), 5);
        let right_part = Rect {
            left: 1,
            top: 0,
            right: 3,
            bottom: 1,
        };
        assert_eq!(map.cells_in_rect(right_part), vec![4]);
    }

    #[test]
    fn position_at_row_and_column() {
        let t = table(vec![row(vec![cell("a"), cell("b")]), row(vec![cell("c")])]);
        let map = TableMap::compute(&t);
        assert_eq!(map.position_at(0, 1, &t), 4);
        assert_eq!(map.position_at(1, 0, &t), 9);
        // end of the short second row
        assert_eq!(map.position_at(1, 1, &t), 12);
    }

    #[test]
    fn column_alignments_take_first_specified() {
        let aligned = |text, a| {
            Node::new(
                NodeType::TableCell,
                Attrs::Cell(CellAttrs::aligned(Some(a))),
                vec![Node::plain(text)],
            )
        };
        let t = table(vec![
            row(vec![cell("a"), aligned("b", Alignment::Right)]),
            row(vec![aligned("c", Alignment::Center), aligned("d", Alignment::Left)]),
        ]);
        let map = TableMap::compute(&t);
        assert_eq!(
            map.column_alignments(&t),
            vec![Some(Alignment::Center), Some(Alignment::Right)]
        );
    }

    #[test]
    fn cache_returns_same_map_for_same_table() {
        let t = table(vec![row(vec![cell("a")])]);
        let first = TableMap::get(&t);
        let second = TableMap::get(&t.clone());
        assert!(Rc::ptr_eq(&first, &second));
        let edited = t.replace_child(0, row(vec![cell("a"), cell("b")]));
        assert_eq!(TableMap::get(&edited).width, 2);
    }
}
