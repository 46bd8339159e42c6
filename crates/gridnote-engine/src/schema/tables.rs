use super::NodeType;

/// Node types added on top of the base markdown schema.
///
/// - `table` holds `table_row`s only
/// - `table_row` holds `table_cell` / `table_header`
/// - cells hold inline content and carry [`CellAttrs`](crate::model::CellAttrs)
/// - `wiki_link` is an inline atom carrying `href` and `title`
pub const TABLE_NODES: [NodeType; 5] = [
    NodeType::Table,
    NodeType::TableRow,
    NodeType::TableCell,
    NodeType::TableHeader,
    NodeType::WikiLink,
];
