// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#[allow(dead_code)]
pub fn generate_table(rows: usize, cols: usize) -> String {
    let mut content = String::new();
    let header: Vec<String> = (0..cols).map(|c| format!("H{c}")).collect();
    content.push_str(&format!("| {} |\n", header.join(" | ")));
    content.push_str(&format!("|{}\n", "---|".repeat(cols)));
    for r in 0..rows {
        let cells: Vec<String> = (0..cols)
            .map(|c| format!("r{r}c{c} [[note-{c}]]"))
            .collect();
        content.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    content
}

#[allow(dead_code)]
pub fn generate_document(tables: usize) -> String {
    let mut content = String::new();
    for t in 0..tables {
        content.push_str(&format!("## Section {t}\n\nSome **text** with a #tag.\n\n"));
        content.push_str(&generate_table(20, 5));
        content.push('\n');
    }
    content
}
