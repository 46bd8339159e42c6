//! Keeps the host's gap cursor out of tables.
//!
//! A gap cursor sits between block nodes where no textblock exists. Inside a
//! table that is always a position between rows or cells, which the user can
//! neither type into nor see. After each transaction the guard moves such a
//! selection into the nearest cell, preferring the direction the cursor was
//! travelling.

use super::util::in_cell;
use crate::model::Node;
use crate::schema::NodeType;
use crate::state::{EditorState, Selection};
use crate::transform::Transaction;

/// How far the repair searches in each direction. Wider than any run of
/// structural positions a table can produce, small enough to stay cheap on
/// a corrupt document.
pub const GAP_REPAIR_LIMIT: usize = 100;

#[derive(Debug, Default, Clone)]
pub struct GapCursorGuard {
    last_head: Option<usize>,
}

impl GapCursorGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow-up transaction replacing a gap cursor inside a table with a
    /// cursor in the nearest cell, or `None` when the new state is fine.
    pub fn append_transaction(
        &mut self,
        old_state: &EditorState,
        new_state: &EditorState,
    ) -> Option<Transaction> {
        let previous = self.last_head.unwrap_or(old_state.selection().head());
        let selection = new_state.selection();
        self.last_head = Some(selection.head());

        let Selection::Gap { pos } = selection else {
            return None;
        };
        let doc = new_state.doc();
        let inside_table = doc.resolve(pos).is_ok_and(|rp| {
            rp.find_ancestor(|n| matches!(n.kind(), NodeType::Table | NodeType::TableRow))
                .is_some()
        });
        if !inside_table {
            return None;
        }

        let forward = pos >= previous;
        let target = nearest_cell_pos(doc, pos, forward)
            .or_else(|| nearest_cell_pos(doc, pos, !forward))
            .map(Selection::cursor)
            .unwrap_or_else(|| Selection::near(doc, pos));
        log::debug!("gap cursor at {pos} inside table, moving to {target:?}");
        self.last_head = Some(target.head());

        let mut tr = new_state.tr();
        tr.set_selection(target);
        Some(tr)
    }

    /// Applies `tr` and any correction it needs.
    pub fn apply(&mut self, state: &EditorState, tr: Transaction) -> EditorState {
        let next = state.apply(tr);
        match self.append_transaction(state, &next) {
            Some(fix) => next.apply(fix),
            None => next,
        }
    }
}

fn nearest_cell_pos(doc: &Node, pos: usize, forward: bool) -> Option<usize> {
    let size = doc.content_size();
    (1..=GAP_REPAIR_LIMIT)
        .map_while(|i| {
            if forward {
                Some(pos + i).filter(|p| *p <= size)
            } else {
                pos.checked_sub(i)
            }
        })
        .find(|p| in_cell(doc, *p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Cells: A@2 B@5 | 1@10 2@13; rows at 1 and 9
    fn state(selection: Selection) -> EditorState {
        EditorState::from_markdown("| A | B |\n|---|---|\n| 1 | 2 |\n\nafter")
            .with_selection(selection)
    }

    fn jump(guard: &mut GapCursorGuard, from: &EditorState, to: Selection) -> EditorState {
        let mut tr = from.tr();
        tr.set_selection(to);
        guard.apply(from, tr)
    }

    #[test]
    fn moving_forward_lands_in_next_cell() {
        let mut guard = GapCursorGuard::new();
        let start = state(Selection::cursor(7));
        let next = jump(&mut guard, &start, Selection::Gap { pos: 9 });
        assert_eq!(next.selection(), Selection::cursor(11));
    }

    #[test]
    fn moving_backward_lands_in_previous_cell() {
        let mut guard = GapCursorGuard::new();
        let start = state(Selection::cursor(11));
        let next = jump(&mut guard, &start, Selection::Gap { pos: 9 });
        assert_eq!(next.selection(), Selection::cursor(7));
    }

    #[test]
    fn gap_outside_table_is_left_alone() {
        let mut guard = GapCursorGuard::new();
        let start = state(Selection::cursor(20));
        let next = jump(&mut guard, &start, Selection::Gap { pos: 18 });
        assert_eq!(next.selection(), Selection::Gap { pos: 18 });
    }

    #[test]
    fn text_selections_pass_through() {
        let mut guard = GapCursorGuard::new();
        let start = state(Selection::cursor(3));
        let next = start.clone().with_selection(Selection::cursor(14));
        assert!(guard.append_transaction(&start, &next).is_none());
    }
}
