//! # Markdown Serialization
//!
//! Writes a document tree back out as GFM markdown.
//!
//! Blocks are separated by a blank line and container blocks prefix the lines
//! of their children (`> ` for quotes, the list marker and a continuation
//! indent for list items). Inline text is escaped so that re-parsing yields
//! the same tree: markdown punctuation and `|` are backslash-escaped
//! everywhere, and block markers are escaped only at the start of a line.
//!
//! Tables are written by [`table`]; inside a cell `|` is escaped, newlines
//! collapse to spaces and hard breaks become `<br>`.

mod table;

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Attrs, Mark, Node};
use crate::schema::NodeType;

/// Output options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerOptions {
    /// Marker for bullet list items: `-`, `*` or `+`.
    pub bullet: char,
    /// Pad every table column to a common width.
    pub pad_table_cells: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            bullet: '-',
            pad_table_cells: false,
        }
    }
}

/// Document tree to markdown text.
#[derive(Debug, Clone, Default)]
pub struct MarkdownSerializer {
    options: SerializerOptions,
}

/// Serializes with default options.
pub fn serialize(doc: &Node) -> String {
    MarkdownSerializer::default().serialize(doc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Block,
    Heading,
    Cell,
}

impl MarkdownSerializer {
    pub fn new(options: SerializerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> SerializerOptions {
        self.options
    }

    /// The markdown for `doc`, ending in a single newline, or the empty
    /// string for a document without visible content.
    pub fn serialize(&self, doc: &Node) -> String {
        let body = self.blocks(doc.children(), "\n\n");
        if body.is_empty() {
            return body;
        }
        format!("{body}\n")
    }

    /// Joins the rendered blocks. Blocks that render empty, such as the
    /// empty paragraph left after a newly inserted table, are dropped.
    fn blocks<'a>(&self, nodes: impl Iterator<Item = &'a Node>, separator: &str) -> String {
        nodes
            .map(|node| self.block(node))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn block(&self, node: &Node) -> String {
        match node.kind() {
            NodeType::Paragraph => self.inline(node, Context::Block),
            NodeType::Heading => {
                let level = match node.attrs() {
                    Attrs::Heading { level } => (*level).clamp(1, 6),
                    _ => 1,
                };
                let mut text = self.inline(node, Context::Heading);
                // a closing `#` run would be stripped as a heading suffix
                if text.ends_with('#') && !text.ends_with("\\#") {
                    text.insert(text.len() - 1, '\\');
                }
                format!("{} {text}", "#".repeat(level as usize))
            }
            NodeType::CodeBlock => {
                let language = match node.attrs() {
                    Attrs::CodeBlock { language } => language.as_deref().unwrap_or_default(),
                    _ => "",
                };
                let code = node.text_content();
                let fence = "`".repeat((longest_run(&code, '`') + 1).max(3));
                if code.is_empty() {
                    format!("{fence}{language}\n{fence}")
                } else {
                    format!("{fence}{language}\n{code}\n{fence}")
                }
            }
            NodeType::Blockquote => {
                let inner = self.blocks(node.children(), "\n\n");
                prefix_lines(&inner, "> ", ">")
            }
            NodeType::HorizontalRule => "---".to_string(),
            NodeType::BulletList | NodeType::OrderedList => self.list(node),
            NodeType::Table => table::render(self, node),
            _ => self.inline(node, Context::Block),
        }
    }

    fn list(&self, list: &Node) -> String {
        let (tight, start) = match list.attrs() {
            Attrs::List { tight, start } => (*tight, *start),
            _ => (true, None),
        };
        // a table needs blank lines around it, which only a loose list allows
        let has_table = list
            .children()
            .any(|item| item.children().any(|b| b.kind() == NodeType::Table));
        let separator = if tight && !has_table { "\n" } else { "\n\n" };
        list.children()
            .enumerate()
            .map(|(i, item)| {
                let marker = if list.kind() == NodeType::OrderedList {
                    format!("{}.", start.unwrap_or(1) + i as u64)
                } else {
                    self.options.bullet.to_string()
                };
                let indent = " ".repeat(marker.chars().count() + 1);
                let content = self.blocks(item.children(), separator);
                if content.is_empty() {
                    return marker;
                }
                content
                    .lines()
                    .enumerate()
                    .map(|(n, line)| match n {
                        0 => format!("{marker} {line}"),
                        _ if line.is_empty() => String::new(),
                        _ => format!("{indent}{line}"),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn inline(&self, block: &Node, context: Context) -> String {
        let mut writer = InlineWriter::new(context);
        for child in block.children() {
            writer.node(child);
        }
        writer.finish()
    }
}

fn prefix_lines(text: &str, prefix: &str, empty_prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                empty_prefix.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn longest_run(text: &str, c: char) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for ch in text.chars() {
        if ch == c {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

fn ordered_marker_regex() -> &'static Regex {
    static ORDERED_MARKER_REGEX: OnceLock<Regex> = OnceLock::new();
    ORDERED_MARKER_REGEX
        .get_or_init(|| Regex::new(r"^(\d+)([.)])").expect("Invalid ordered marker regex"))
}

fn open_mark(mark: &Mark) -> &'static str {
    match mark {
        Mark::Link { .. } => "[",
        Mark::Strong => "**",
        Mark::Em => "*",
        Mark::Strike => "~~",
        Mark::Code => "`",
    }
}

fn close_mark(mark: &Mark, in_cell: bool) -> String {
    match mark {
        Mark::Link { href, title } => format!("]({})", link_target(href, title.as_deref(), in_cell)),
        other => open_mark(other).to_string(),
    }
}

fn link_target(href: &str, title: Option<&str>, in_cell: bool) -> String {
    let mut target = if href.is_empty() || href.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", href.replace('>', "%3E"))
    } else {
        href.to_string()
    };
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        target.push_str(&format!(" \"{}\"", title.replace('"', "\\\"")));
    }
    if in_cell {
        target = target.replace('|', "\\|");
    }
    target
}

fn code_span(code: &str) -> String {
    let fence = "`".repeat(longest_run(code, '`') + 1);
    let pad = code.starts_with('`')
        || code.ends_with('`')
        || (code.len() > 1 && code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
    if pad {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

/// Writes inline content, moving whitespace outside of emphasis so that a
/// mark never opens or closes next to a space.
struct InlineWriter<'a> {
    context: Context,
    out: String,
    open: Vec<&'a Mark>,
    /// Trailing whitespace of the previous text node, held back until it is
    /// known whether marks close after it.
    held: String,
    line_start: bool,
}

impl<'a> InlineWriter<'a> {
    fn new(context: Context) -> Self {
        Self {
            context,
            out: String::new(),
            open: Vec::new(),
            held: String::new(),
            line_start: true,
        }
    }

    fn in_cell(&self) -> bool {
        self.context == Context::Cell
    }

    fn node(&mut self, node: &'a Node) {
        let is_code = node.marks().contains(&Mark::Code);
        let marks: Vec<&'a Mark> = node.marks().iter().filter(|m| **m != Mark::Code).collect();
        let keep = self
            .open
            .iter()
            .zip(&marks)
            .take_while(|(a, b)| a == b)
            .count();
        while self.open.len() > keep {
            if let Some(mark) = self.open.pop() {
                let close = close_mark(mark, self.in_cell());
                self.out.push_str(&close);
            }
        }
        let held = std::mem::take(&mut self.held);
        self.push_text(&held);

        let text = node.text_str().filter(|_| !is_code);
        let (lead, body, trail) = match text {
            Some(text) => split_whitespace(text),
            None => ("", "", ""),
        };
        if marks.len() > keep {
            self.push_text(lead);
            for mark in &marks[keep..] {
                self.out.push_str(open_mark(mark));
                self.line_start = false;
            }
            self.open.extend_from_slice(&marks[keep..]);
        } else {
            self.push_text(lead);
        }

        match node.kind() {
            NodeType::Text if is_code => {
                let mut span = code_span(node.text_str().unwrap_or_default());
                if self.in_cell() {
                    span = span.replace('|', "\\|");
                }
                self.out.push_str(&span);
                self.line_start = false;
            }
            NodeType::Text => {
                self.push_text(body);
                self.held = trail.to_string();
            }
            NodeType::HardBreak => {
                if self.in_cell() {
                    self.out.push_str("<br>");
                } else {
                    self.out.push_str("\\\n");
                    self.line_start = true;
                }
            }
            NodeType::WikiLink => {
                if let Attrs::WikiLink { href, title } = node.attrs() {
                    let in_cell = self.in_cell();
                    let mut link = format!("[[{}", wiki_text(href, in_cell));
                    if !title.is_empty() && title != href {
                        link.push_str(if in_cell { "\\|" } else { "|" });
                        link.push_str(&wiki_text(title, in_cell));
                    }
                    link.push_str("]]");
                    self.out.push_str(&link);
                    self.line_start = false;
                }
            }
            NodeType::Image => {
                if let Attrs::Image { src, alt, title } = node.attrs() {
                    let alt = alt.replace('[', "\\[").replace(']', "\\]");
                    let target = link_target(src, title.as_deref(), self.in_cell());
                    self.out.push_str(&format!("![{alt}]({target})"));
                    self.line_start = false;
                }
            }
            other => log::warn!("serializer: unexpected inline node `{other}`"),
        }
    }

    /// Appends escaped text.
    fn push_text(&mut self, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                if self.in_cell() {
                    self.out.push(' ');
                } else {
                    self.out.push('\n');
                    self.line_start = true;
                }
            }
            if line.is_empty() {
                continue;
            }
            let mut rest = line;
            if self.line_start && !self.in_cell() {
                let trimmed = rest.trim_start();
                self.out.push_str(&rest[..rest.len() - trimmed.len()]);
                rest = trimmed;
                if let Some(caps) = ordered_marker_regex().captures(rest) {
                    self.out.push_str(&caps[1]);
                    self.out.push('\\');
                    self.out.push_str(&caps[2]);
                    rest = &rest[caps[0].len()..];
                } else if rest.starts_with(['#', '>', '-', '+', '=']) {
                    self.out.push('\\');
                }
                if rest.is_empty() {
                    continue;
                }
            }
            for ch in rest.chars() {
                match ch {
                    '\\' | '*' | '_' | '`' | '[' | ']' | '~' | '<' | '&' => {
                        self.out.push('\\');
                        self.out.push(ch);
                    }
                    '|' => self.out.push_str("\\|"),
                    _ => self.out.push(ch),
                }
            }
            self.line_start = false;
        }
    }

    fn finish(mut self) -> String {
        while let Some(mark) = self.open.pop() {
            let close = close_mark(mark, self.in_cell());
            self.out.push_str(&close);
        }
        self.out
    }
}

/// Escapes the target or title of a wiki link. A `|` only needs escaping in
/// a cell, where it would end the cell.
fn wiki_text(text: &str, in_cell: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '*' | '_' | '`' | '[' | ']' | '~' | '<' | '&' => {
                out.push('\\');
                out.push(ch);
            }
            '|' if in_cell => out.push_str("\\|"),
            _ => out.push(ch),
        }
    }
    out
}

/// Splits text into leading whitespace, body and trailing whitespace.
fn split_whitespace(text: &str) -> (&str, &str, &str) {
    let body_start = text.len() - text.trim_start().len();
    if body_start == text.len() {
        return (text, "", "");
    }
    let body_end = text.trim_end().len();
    (&text[..body_start], &text[body_start..body_end], &text[body_end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellAttrs;
    use crate::parser::parse;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::paragraph("plain text\n")]
    #[case::heading("## Title\n")]
    #[case::emphasis("some **bold** and *em* and ~~gone~~\n")]
    #[case::link("a [link](https://example.com \"Title\") here\n")]
    #[case::code_span("use `x[0]` here\n")]
    #[case::wiki_link("see [[Note]] and [[target|alias]]\n")]
    #[case::hard_break("one\\\ntwo\n")]
    #[case::bullets("- one\n- two\n")]
    #[case::ordered("3. three\n4. four\n")]
    #[case::quote("> quoted\n>\n> more\n")]
    #[case::rule("---\n")]
    #[case::image("![alt](img.png)\n")]
    fn stable_round_trip(#[case] markdown: &str) {
        assert_eq!(serialize(&parse(markdown)), markdown);
    }

    #[rstest]
    #[case::brackets("a [[b", "a \\[\\[b\n")]
    #[case::emphasis_chars("2 * 3 _x_", "2 \\* 3 *x*\n")]
    #[case::heading_marker("\\# not a heading", "\\# not a heading\n")]
    #[case::list_marker("1\\. not a list", "1\\. not a list\n")]
    #[case::leading_pipe("\\| x |\n\\| --- |", "\\| x \\|\n\\| --- \\|\n")]
    fn escapes_markdown(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(serialize(&parse(input)), expected);
    }

    #[rstest]
    #[case("\\| x |\n\\| --- |")]
    #[case("a \\| b\n:-- \\| --")]
    fn pipe_text_stays_a_paragraph(#[case] input: &str) {
        let doc = parse(input);
        assert_eq!(doc.child(0).map(Node::kind), Some(NodeType::Paragraph));

        let reparsed = parse(&serialize(&doc));
        let kinds: Vec<_> = reparsed.children().map(Node::kind).collect();
        assert_eq!(kinds, vec![NodeType::Paragraph]);
        assert_eq!(reparsed.text_content(), doc.text_content());
    }

    fn wiki_links(doc: &Node) -> Vec<Attrs> {
        let mut links = Vec::new();
        doc.descendants(&mut |node, _| {
            if node.kind() == NodeType::WikiLink {
                links.push(node.attrs().clone());
            }
            true
        });
        links
    }

    #[test]
    fn literal_double_brackets_stay_text() {
        let doc = Node::doc(vec![Node::paragraph(vec![Node::plain("x [[a]] y")])]);
        let markdown = serialize(&doc);
        assert_eq!(markdown, "x \\[\\[a\\]\\] y\n");

        let reparsed = parse(&markdown);
        assert!(wiki_links(&reparsed).is_empty());
        assert_eq!(reparsed.text_content(), "x [[a]] y");
    }

    fn wiki_link_doc(in_cell: bool) -> Node {
        let link = Node::leaf(
            NodeType::WikiLink,
            Attrs::WikiLink {
                href: "notes/a_b".into(),
                title: "*x* _y_ `z` | w".into(),
            },
        );
        if !in_cell {
            return Node::doc(vec![Node::paragraph(vec![link])]);
        }
        let cell = Node::new(
            NodeType::TableHeader,
            Attrs::Cell(CellAttrs::default()),
            vec![link],
        );
        let row = Node::new(NodeType::TableRow, Attrs::None, vec![cell]);
        Node::doc(vec![Node::new(NodeType::Table, Attrs::None, vec![row])])
    }

    #[test]
    fn wiki_link_text_is_escaped() {
        assert_snapshot!(
            serialize(&wiki_link_doc(false)).trim_end(),
            @r"[[notes/a\_b|\*x\* \_y\_ \`z\` | w]]"
        );
        assert_snapshot!(
            serialize(&wiki_link_doc(true)).trim_end(),
            @r"
        | [[notes/a\_b\|\*x\* \_y\_ \`z\` \| w]] |
        | --- |
        "
        );
    }

    #[rstest]
    fn wiki_link_with_markdown_characters_survives(#[values(false, true)] in_cell: bool) {
        let doc = wiki_link_doc(in_cell);
        let reparsed = parse(&serialize(&doc));
        assert_eq!(wiki_links(&reparsed), wiki_links(&doc));
    }

    #[test]
    fn whitespace_moves_outside_marks() {
        let doc = Node::doc(vec![Node::paragraph(vec![
            Node::plain("a"),
            Node::text(" b ", vec![Mark::Strong]),
            Node::plain("c"),
        ])]);
        assert_eq!(serialize(&doc), "a **b** c\n");
    }

    #[test]
    fn code_block_fence_outgrows_content() {
        let doc = parse("````\n```\n````\n");
        assert_snapshot!(serialize(&doc).trim_end(), @r"
        ````
        ```
        ````
        ");
    }

    #[test]
    fn loose_list_keeps_blank_lines() {
        let markdown = "- one\n\n- two\n";
        assert_eq!(serialize(&parse(markdown)), markdown);
    }

    #[test]
    fn nested_list_is_indented() {
        let markdown = "- one\n  - inner\n- two\n";
        assert_eq!(serialize(&parse(markdown)), markdown);
    }

    #[test]
    fn empty_document_is_empty() {
        assert_eq!(serialize(&parse("")), "");
    }

    #[test]
    fn custom_bullet() {
        let serializer = MarkdownSerializer::new(SerializerOptions {
            bullet: '*',
            ..SerializerOptions::default()
        });
        assert_eq!(serializer.serialize(&parse("- a\n- b")), "* a\n* b\n");
    }
}
