use super::commands::{add_row, go_to_next_cell};
use super::util::{in_cell, selected_rect, table_around};
use crate::command::{Direction, Dispatch, command, send};
use crate::state::{EditorState, Selection};

/// How far a horizontal arrow scans for the next in-cell position. The gap
/// between two cells' contents is three positions (cell end, row boundary
/// or cell start), plus a few more when a row ends; 20 covers any row
/// boundary without letting a damaged document stall the key handler.
pub const HORIZONTAL_SCAN_LIMIT: usize = 20;

/// Left / right arrow inside a table: steps over cell boundaries so the
/// cursor never lands between cells. Returns `false` (leaving the key to
/// the host) when the move stays inside the current cell's text or the scan
/// would leave the table.
pub fn arrow_horizontal(direction: Direction) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    command(move |state: &EditorState, dispatch: Dispatch<'_>| {
        let selection = state.selection();
        if !matches!(selection, Selection::Cursor { .. } | Selection::Gap { .. }) {
            return false;
        }
        let doc = state.doc();
        let head = selection.head();
        let Ok(rp) = doc.resolve(head) else {
            return false;
        };
        let Some(loc) = table_around(&rp) else {
            return false;
        };
        if rp.parent().is_textblock() {
            let offset = rp.parent_offset();
            let within = match direction {
                Direction::Forward => offset < rp.parent().content_size(),
                Direction::Backward => offset > 0,
            };
            if within {
                return false;
            }
        }
        let target = (1..=HORIZONTAL_SCAN_LIMIT)
            .map_while(|i| match direction {
                Direction::Forward => Some(head + i).filter(|p| *p <= loc.end()),
                Direction::Backward => head.checked_sub(i).filter(|p| *p >= loc.start),
            })
            .find(|pos| in_cell(doc, *pos));
        let Some(target) = target else {
            log::trace!("arrow_horizontal: no cell within reach of {head}");
            return false;
        };
        if dispatch.is_some() {
            let mut tr = state.tr();
            tr.set_selection(Selection::cursor(target));
            send(dispatch, tr);
        }
        true
    })
}

/// Up / down arrow inside a table: moves to the cell in the same column of
/// the previous or next row. Returns `false` in the first (up) or last (down)
/// row so the host can leave the table.
pub fn arrow_vertical(direction: Direction) -> impl Fn(&EditorState, Dispatch<'_>) -> bool {
    command(move |state: &EditorState, dispatch: Dispatch<'_>| {
        let selection = state.selection();
        if !matches!(selection, Selection::Cursor { .. } | Selection::Gap { .. }) {
            return false;
        }
        let Some(loc) = state
            .doc()
            .resolve(selection.head())
            .ok()
            .and_then(|rp| table_around(&rp))
        else {
            return false;
        };
        let map = loc.map();
        let Some(rel) = selection.head().checked_sub(loc.start) else {
            return false;
        };
        let Some(rect) = map.find_cell(rel) else {
            return false;
        };
        let row = match direction {
            Direction::Forward => Some(rect.bottom).filter(|r| *r < map.height),
            Direction::Backward => rect.top.checked_sub(1),
        };
        let Some(target) = row.and_then(|row| map.map[row * map.width + rect.left]) else {
            return false;
        };
        if dispatch.is_some() {
            let mut tr = state.tr();
            tr.set_selection(Selection::cursor(loc.start + target + 1));
            send(dispatch, tr);
        }
        true
    })
}

/// Enter in the last cell of a row appends a row below and moves into it.
pub fn enter_add_row(state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    let Selection::Cursor { pos } = state.selection() else {
        return false;
    };
    let Some(ctx) = selected_rect(state) else {
        return false;
    };
    // Short rows end before the table's last column.
    let last_in_row = state
        .doc()
        .resolve(pos)
        .ok()
        .and_then(|rp| {
            let row = rp.find_ancestor(|n| n.kind().is_cell())?.checked_sub(1)?;
            Some(rp.index(row) + 1 == rp.node(row).child_count())
        })
        .unwrap_or(false);
    if !last_in_row && ctx.rect.right != ctx.map.width {
        return false;
    }
    if dispatch.is_none() {
        return true;
    }
    let mut tr = state.tr();
    let row_pos = match add_row(&mut tr, &ctx, ctx.rect.bottom) {
        Ok(row_pos) => row_pos,
        Err(err) => {
            log::warn!("enter_add_row: {err}");
            return false;
        }
    };
    let first_cell = tr
        .doc()
        .node_at(row_pos + 1)
        .is_some_and(|n| n.kind().is_cell());
    if first_cell {
        tr.set_selection(Selection::cursor(row_pos + 2));
    }
    log::debug!("enter_add_row: new row at {row_pos}");
    send(dispatch, tr);
    true
}

/// Keys the table keymap responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Tab,
    ShiftTab,
    Enter,
}

impl Key {
    /// Parses host key names such as `ArrowLeft` or `Shift-Tab`.
    pub fn from_name(name: &str) -> Option<Key> {
        match name {
            "ArrowLeft" => Some(Key::ArrowLeft),
            "ArrowRight" => Some(Key::ArrowRight),
            "ArrowUp" => Some(Key::ArrowUp),
            "ArrowDown" => Some(Key::ArrowDown),
            "Tab" => Some(Key::Tab),
            "Shift-Tab" => Some(Key::ShiftTab),
            "Enter" => Some(Key::Enter),
            _ => None,
        }
    }
}

/// Runs the table command bound to `key`. `false` means the host should
/// apply its default behaviour.
pub fn handle_key(key: Key, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
    match key {
        Key::ArrowLeft => arrow_horizontal(Direction::Backward)(state, dispatch),
        Key::ArrowRight => arrow_horizontal(Direction::Forward)(state, dispatch),
        Key::ArrowUp => arrow_vertical(Direction::Backward)(state, dispatch),
        Key::ArrowDown => arrow_vertical(Direction::Forward)(state, dispatch),
        Key::Tab => go_to_next_cell(Direction::Forward)(state, dispatch),
        Key::ShiftTab => go_to_next_cell(Direction::Backward)(state, dispatch),
        Key::Enter => enter_add_row(state, dispatch),
    }
}
