use serde::Serialize;

use super::commands::{
    add_column_after, add_column_before, add_row_after, add_row_before, create_table,
    delete_column, delete_row, delete_table, set_cell_alignment,
};
use super::normalize::{fix_tables, normalize_tables};
use super::util::is_in_table;
use crate::command::Dispatch;
use crate::model::Alignment;
use crate::state::EditorState;

/// Actions offered by the table menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TableAction {
    InsertTable {
        rows: usize,
        cols: usize,
        with_header: bool,
    },
    AddRowBefore,
    AddRowAfter,
    AddColumnBefore,
    AddColumnAfter,
    DeleteRow,
    DeleteColumn,
    DeleteTable,
    AlignLeft,
    AlignCenter,
    AlignRight,
    AlignNone,
    NormalizeColumns,
    FixTables,
}

impl TableAction {
    pub fn label(&self) -> &'static str {
        match self {
            TableAction::InsertTable { .. } => "Insert table",
            TableAction::AddRowBefore => "Add row before",
            TableAction::AddRowAfter => "Add row after",
            TableAction::AddColumnBefore => "Add column before",
            TableAction::AddColumnAfter => "Add column after",
            TableAction::DeleteRow => "Delete row",
            TableAction::DeleteColumn => "Delete column",
            TableAction::DeleteTable => "Delete table",
            TableAction::AlignLeft => "Align left",
            TableAction::AlignCenter => "Align center",
            TableAction::AlignRight => "Align right",
            TableAction::AlignNone => "Clear alignment",
            TableAction::NormalizeColumns => "Normalize columns",
            TableAction::FixTables => "Fix tables",
        }
    }

    /// Runs the action's command. Everything except inserting a table is
    /// only available inside a table.
    pub fn run(&self, state: &EditorState, dispatch: Dispatch<'_>) -> bool {
        if !matches!(self, TableAction::InsertTable { .. }) && !is_in_table(state) {
            return false;
        }
        match *self {
            TableAction::InsertTable {
                rows,
                cols,
                with_header,
            } => create_table(rows, cols, with_header)(state, dispatch),
            TableAction::AddRowBefore => add_row_before(state, dispatch),
            TableAction::AddRowAfter => add_row_after(state, dispatch),
            TableAction::AddColumnBefore => add_column_before(state, dispatch),
            TableAction::AddColumnAfter => add_column_after(state, dispatch),
            TableAction::DeleteRow => delete_row(state, dispatch),
            TableAction::DeleteColumn => delete_column(state, dispatch),
            TableAction::DeleteTable => delete_table(state, dispatch),
            TableAction::AlignLeft => set_cell_alignment(Some(Alignment::Left))(state, dispatch),
            TableAction::AlignCenter => {
                set_cell_alignment(Some(Alignment::Center))(state, dispatch)
            }
            TableAction::AlignRight => set_cell_alignment(Some(Alignment::Right))(state, dispatch),
            TableAction::AlignNone => set_cell_alignment(None)(state, dispatch),
            TableAction::NormalizeColumns => normalize_tables(state, dispatch),
            TableAction::FixTables => fix_tables(state, dispatch),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: TableAction,
    pub enabled: bool,
}

/// The table menu with each item enabled when a dry run of its command
/// succeeds. `insert` is the table the insert item creates.
pub fn table_menu_with(state: &EditorState, insert: TableAction) -> Vec<MenuItem> {
    [
        insert,
        TableAction::AddRowBefore,
        TableAction::AddRowAfter,
        TableAction::AddColumnBefore,
        TableAction::AddColumnAfter,
        TableAction::DeleteRow,
        TableAction::DeleteColumn,
        TableAction::DeleteTable,
        TableAction::AlignLeft,
        TableAction::AlignCenter,
        TableAction::AlignRight,
        TableAction::AlignNone,
        TableAction::NormalizeColumns,
        TableAction::FixTables,
    ]
    .into_iter()
    .map(|action| MenuItem {
        label: action.label(),
        action,
        enabled: action.run(state, None),
    })
    .collect()
}

/// [`table_menu_with`] inserting a 3x3 table with a header row.
pub fn table_menu(state: &EditorState) -> Vec<MenuItem> {
    table_menu_with(
        state,
        TableAction::InsertTable {
            rows: 3,
            cols: 3,
            with_header: true,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Selection;
    use insta::assert_snapshot;

    fn enabled(items: &[MenuItem]) -> Vec<&'static str> {
        items.iter().filter(|i| i.enabled).map(|i| i.label).collect()
    }

    #[test]
    fn outside_table_only_insert_is_enabled() {
        let state = EditorState::from_markdown("text");
        assert_eq!(enabled(&table_menu(&state)), vec!["Insert table"]);
    }

    #[test]
    fn inside_table() {
        let state = EditorState::from_markdown("| A | B |\n|---|---|\n| 1 | 2 |\n")
            .with_selection(Selection::cursor(11));
        assert_snapshot!(enabled(&table_menu(&state)).join("\n"), @r"
        Add row before
        Add row after
        Add column before
        Add column after
        Delete row
        Delete column
        Delete table
        Align left
        Align center
        Align right
        ");
    }
}
