//! # Tables
//!
//! Grid layout and editing commands for `table` nodes.
//!
//! - **`map`**: [`TableMap`], the span-aware grid view of a table, cached per
//!   table content identity
//! - **`util`**: locating the table and cells around a position or selection
//! - **`commands`**: creating tables, adding and deleting rows and columns,
//!   alignment, Tab navigation and cell selection
//! - **`navigation`**: arrow keys across cell boundaries, Enter-to-add-row and
//!   the [`handle_key`] keymap
//! - **`gap_cursor`**: [`GapCursorGuard`], which keeps gap cursors out of tables
//! - **`normalize`**: column normalization and structural repair
//! - **`menu`**: menu items with enablement from dry runs

pub mod commands;
pub mod gap_cursor;
pub mod map;
pub mod menu;
pub mod navigation;
pub mod normalize;
pub mod util;

pub use commands::{
    add_column, add_column_after, add_column_before, add_row, add_row_after, add_row_before,
    build_table, create_table, delete_column, delete_row, delete_table, go_to_next_cell,
    select_cells, set_cell_alignment, set_column_alignment,
};
pub use gap_cursor::{GAP_REPAIR_LIMIT, GapCursorGuard};
pub use map::{Axis, CellExtent, Rect, TableMap, TableProblem};
pub use menu::{MenuItem, TableAction, table_menu, table_menu_with};
pub use navigation::{
    HORIZONTAL_SCAN_LIMIT, Key, arrow_horizontal, arrow_vertical, enter_add_row, handle_key,
};
pub use normalize::{fix_table, fix_tables, normalize_table_columns, normalize_tables};
pub use util::{
    TableLoc, TableRect, cell_around, in_cell, is_in_table, selected_cells, selected_rect,
    table_around,
};
