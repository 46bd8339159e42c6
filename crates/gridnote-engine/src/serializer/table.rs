use super::{Context, MarkdownSerializer};
use crate::model::{Alignment, Node};
use crate::table::TableMap;

const MIN_COLUMN_WIDTH: usize = 3;

/// Delimiter cell for a column. Unpadded tables use the conventional
/// `---`, `:---`, `:---:`, `---:`; padded ones fill the column width.
fn delimiter(alignment: Option<Alignment>, width: Option<usize>) -> String {
    let Some(width) = width.map(|w| w.max(MIN_COLUMN_WIDTH)) else {
        return match alignment {
            Some(Alignment::Left) => ":---",
            Some(Alignment::Center) => ":---:",
            Some(Alignment::Right) => "---:",
            None => "---",
        }
        .to_string();
    };
    match alignment {
        Some(Alignment::Left) => format!(":{}", "-".repeat(width - 1)),
        Some(Alignment::Center) => format!(":{}:", "-".repeat(width - 2)),
        Some(Alignment::Right) => format!("{}:", "-".repeat(width - 1)),
        None => "-".repeat(width),
    }
}

fn line(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// GFM table text. The first row is always written as the header line. Slots
/// covered by a span, or left empty by a short row, become empty cells so
/// every line has the same number of columns.
pub(super) fn render(serializer: &MarkdownSerializer, table: &Node) -> String {
    let map = TableMap::get(table);
    if map.width == 0 || map.height == 0 {
        return String::new();
    }
    let mut grid: Vec<Vec<String>> = Vec::with_capacity(map.height);
    for row in 0..map.height {
        let mut cells = Vec::with_capacity(map.width);
        for col in 0..map.width {
            let index = row * map.width + col;
            let slot = map.map[index];
            let continued = (col > 0 && map.map[index - 1] == slot)
                || (row > 0 && map.map[index - map.width] == slot);
            let text = match slot {
                Some(pos) if !continued => table
                    .node_at(pos)
                    .map(|cell| serializer.inline(cell, Context::Cell))
                    .unwrap_or_default(),
                _ => String::new(),
            };
            cells.push(text);
        }
        grid.push(cells);
    }

    let alignments = map.column_alignments(table);
    let widths: Option<Vec<usize>> = serializer.options.pad_table_cells.then(|| {
        (0..map.width)
            .map(|col| {
                grid.iter()
                    .map(|row| row[col].chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(MIN_COLUMN_WIDTH)
            })
            .collect()
    });
    if let Some(widths) = &widths {
        for row in &mut grid {
            for (cell, width) in row.iter_mut().zip(widths) {
                let pad = width.saturating_sub(cell.chars().count());
                cell.push_str(&" ".repeat(pad));
            }
        }
    }

    let delimiters: Vec<String> = (0..map.width)
        .map(|col| {
            let width = widths.as_ref().map(|w| w[col]);
            delimiter(alignments.get(col).copied().flatten(), width)
        })
        .collect();
    let mut lines = Vec::with_capacity(map.height + 1);
    lines.push(line(&grid[0]));
    lines.push(line(&delimiters));
    lines.extend(grid[1..].iter().map(|row| line(row)));
    lines.join("\n")
}
