//! # Markdown Parsing
//!
//! Converts markdown text into a document tree conforming to
//! [`Schema::with_tables`].
//!
//! Block structure comes from `pulldown-cmark` with GFM tables and
//! strikethrough enabled. Each table cell takes the alignment of its column
//! from the delimiter row. Row cell counts are kept as the tokenizer reports
//! them; column normalization is a separate explicit pass
//! ([`normalize_tables`](crate::table::normalize_tables)).
//!
//! ## Wiki links
//!
//! The tokenizer splits text around brackets, so adjacent text events are
//! coalesced before [`wikilink::scan`] runs over them. Code spans arrive as
//! separate events and are never scanned: `` `[[x]]` `` stays code. Brackets
//! written as backslash escapes are literal, so `\[\[x]]` is plain text.
//!
//! Malformed input never fails: anything that is not a table or a wiki link
//! falls through to ordinary paragraphs and text.

pub mod cursor;
pub mod wikilink;

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::model::{Alignment, Attrs, CellAttrs, Mark, Node};
use crate::schema::{ContentRule, NodeType, Schema, SchemaError};
use wikilink::Piece;

/// Markdown to document tree parser.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    options: Options,
}

impl MarkdownParser {
    /// Creates a parser for `schema`, which must register the table and
    /// wiki-link node types.
    pub fn new(schema: &Schema) -> Result<Self, SchemaError> {
        for name in ["table", "table_row", "table_cell", "table_header", "wiki_link"] {
            schema.node_type(name)?;
        }
        Ok(Self::with_options())
    }

    fn with_options() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self { options }
    }

    pub fn parse(&self, markdown: &str) -> Node {
        let mut builder = TreeBuilder::new();
        for (event, range) in Parser::new_ext(markdown, self.options).into_offset_iter() {
            match event {
                Event::Text(text) => {
                    let escaped = escaped_chars(&text, markdown, range);
                    builder.source_text(&text, escaped);
                }
                event => builder.process_event(event),
            }
        }
        builder.finish()
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::with_options()
    }
}

/// Parses markdown with the default table-aware schema.
pub fn parse(markdown: &str) -> Node {
    MarkdownParser::default().parse(markdown)
}

struct Frame {
    kind: NodeType,
    attrs: Attrs,
    children: Vec<Node>,
    /// Paragraph opened for bare inline content (tight list items).
    implicit: bool,
    /// Raw HTML block, kept as literal text.
    raw: bool,
}

impl Frame {
    fn new(kind: NodeType, attrs: Attrs) -> Self {
        Self {
            kind,
            attrs,
            children: Vec::new(),
            implicit: false,
            raw: false,
        }
    }

    fn finish(self) -> Node {
        Node::new(self.kind, self.attrs, self.children)
    }
}

struct ImageState {
    src: String,
    title: Option<String>,
    alt: String,
}

/// Builds the tree from the pulldown-cmark event stream.
///
/// Blocks are tracked on a frame stack whose bottom is the `doc` frame.
/// Inline text is buffered in `pending` until the marks change or the block
/// closes, then scanned for wiki links.
struct TreeBuilder {
    stack: Vec<Frame>,
    marks: Vec<Mark>,
    pending: String,
    /// Byte offsets in `pending` of backslash-escaped characters.
    escaped: Vec<usize>,
    aligns: Vec<Option<Alignment>>,
    column: usize,
    in_head: bool,
    image: Option<ImageState>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::new(NodeType::Doc, Attrs::None)],
            marks: Vec::new(),
            pending: String::new(),
            escaped: Vec::new(),
            aligns: Vec::new(),
            column: 0,
            in_head: false,
            image: None,
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if let Some(image) = &mut self.image {
                    image.alt.push_str(&code);
                    return;
                }
                self.flush_text();
                self.ensure_inline();
                let mut marks = self.marks.clone();
                marks.push(Mark::Code);
                self.push_node(Node::text(code.to_string(), marks));
            }
            Event::Html(html) => self.text(&html),
            Event::InlineHtml(html) => {
                if is_line_break_tag(&html) {
                    self.inline_leaf(NodeType::HardBreak, Attrs::None);
                } else {
                    self.text(&html);
                }
            }
            Event::SoftBreak => self.text("\n"),
            Event::HardBreak => self.inline_leaf(NodeType::HardBreak, Attrs::None),
            Event::Rule => {
                self.close_implicit();
                self.push_node(Node::leaf(NodeType::HorizontalRule, Attrs::None));
            }
            Event::TaskListMarker(checked) => self.text(if checked { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(label) => self.text(&format!("[^{label}]")),
            Event::InlineMath(math) => self.text(&format!("${math}$")),
            Event::DisplayMath(math) => self.text(&format!("$${math}$$")),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.open_block(NodeType::Paragraph, Attrs::None);
                self.mark_list_loose();
            }
            Tag::Heading { level, .. } => {
                self.open_block(NodeType::Heading, Attrs::Heading { level: level as u8 });
            }
            Tag::BlockQuote(_) => self.open_block(NodeType::Blockquote, Attrs::None),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                        Some(lang.trim().to_string())
                    }
                    _ => None,
                };
                self.open_block(NodeType::CodeBlock, Attrs::CodeBlock { language });
            }
            Tag::HtmlBlock => {
                self.open_block(NodeType::Paragraph, Attrs::None);
                if let Some(frame) = self.stack.last_mut() {
                    frame.raw = true;
                }
            }
            Tag::List(start) => {
                let kind = if start.is_some() {
                    NodeType::OrderedList
                } else {
                    NodeType::BulletList
                };
                self.open_block(kind, Attrs::List { tight: true, start });
            }
            Tag::Item => self.open_block(NodeType::ListItem, Attrs::None),
            Tag::Table(aligns) => {
                self.aligns = aligns.into_iter().map(convert_alignment).collect();
                self.open_block(NodeType::Table, Attrs::None);
            }
            Tag::TableHead => {
                self.in_head = true;
                self.column = 0;
                self.open_block(NodeType::TableRow, Attrs::None);
            }
            Tag::TableRow => {
                self.column = 0;
                self.open_block(NodeType::TableRow, Attrs::None);
            }
            Tag::TableCell => {
                let kind = if self.in_head {
                    NodeType::TableHeader
                } else {
                    NodeType::TableCell
                };
                let alignment = self.aligns.get(self.column).copied().flatten();
                self.column += 1;
                self.open_block(kind, Attrs::Cell(CellAttrs::aligned(alignment)));
            }
            Tag::Emphasis => self.push_mark(Mark::Em),
            Tag::Strong => self.push_mark(Mark::Strong),
            Tag::Strikethrough => self.push_mark(Mark::Strike),
            Tag::Link {
                dest_url, title, ..
            } => self.push_mark(Mark::Link {
                href: dest_url.to_string(),
                title: (!title.is_empty()).then(|| title.to_string()),
            }),
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(ImageState {
                    src: dest_url.to_string(),
                    title: (!title.is_empty()).then(|| title.to_string()),
                    alt: String::new(),
                });
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Emphasis => self.pop_mark(&Mark::Em),
            TagEnd::Strong => self.pop_mark(&Mark::Strong),
            TagEnd::Strikethrough => self.pop_mark(&Mark::Strike),
            TagEnd::Link => {
                self.flush_text();
                if let Some(at) = self
                    .marks
                    .iter()
                    .rposition(|m| matches!(m, Mark::Link { .. }))
                {
                    self.marks.remove(at);
                }
            }
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.inline_leaf(
                        NodeType::Image,
                        Attrs::Image {
                            src: image.src,
                            alt: image.alt,
                            title: image.title,
                        },
                    );
                }
            }
            TagEnd::TableHead => {
                self.close_block();
                self.in_head = false;
            }
            TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::CodeBlock
            | TagEnd::HtmlBlock
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::Table
            | TagEnd::TableRow
            | TagEnd::TableCell => self.close_block(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
            return;
        }
        self.ensure_inline();
        self.pending.push_str(text);
    }

    fn source_text(&mut self, text: &str, escaped: Vec<usize>) {
        if self.image.is_some() {
            self.text(text);
            return;
        }
        let base = self.pending.len();
        self.text(text);
        self.escaped.extend(escaped.into_iter().map(|at| base + at));
    }

    fn push_mark(&mut self, mark: Mark) {
        self.flush_text();
        self.marks.push(mark);
    }

    fn pop_mark(&mut self, mark: &Mark) {
        self.flush_text();
        if let Some(at) = self.marks.iter().rposition(|m| m == mark) {
            self.marks.remove(at);
        }
    }

    fn inline_leaf(&mut self, kind: NodeType, attrs: Attrs) {
        self.flush_text();
        self.ensure_inline();
        let leaf = Node::leaf(kind, attrs).with_marks(self.marks.clone());
        self.push_node(leaf);
    }

    fn open_block(&mut self, kind: NodeType, attrs: Attrs) {
        self.close_implicit();
        self.flush_text();
        self.stack.push(Frame::new(kind, attrs));
    }

    fn close_block(&mut self) {
        self.close_implicit();
        self.close_frame();
    }

    fn close_frame(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        self.flush_text();
        if let Some(frame) = self.stack.pop() {
            self.push_node(frame.finish());
        }
    }

    fn close_implicit(&mut self) {
        if self.stack.last().is_some_and(|f| f.implicit) {
            self.close_frame();
        }
    }

    /// Opens an implicit paragraph when inline content lands in a block
    /// container.
    fn ensure_inline(&mut self) {
        let accepts_inline = self.stack.last().is_some_and(|f| {
            matches!(f.kind.content_rule(), ContentRule::Inline | ContentRule::Text)
        });
        if !accepts_inline {
            let mut frame = Frame::new(NodeType::Paragraph, Attrs::None);
            frame.implicit = true;
            self.stack.push(frame);
        }
    }

    /// An explicit paragraph directly inside a list item makes the list loose.
    fn mark_list_loose(&mut self) {
        let n = self.stack.len();
        if n < 3 || self.stack[n - 2].kind != NodeType::ListItem {
            return;
        }
        if let Attrs::List { tight, .. } = &mut self.stack[n - 3].attrs {
            *tight = false;
        }
    }

    fn push_node(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }

    fn flush_text(&mut self) {
        let escaped = std::mem::take(&mut self.escaped);
        if self.pending.is_empty() {
            return;
        }
        let mut text = std::mem::take(&mut self.pending);
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        if frame.kind == NodeType::CodeBlock || frame.raw {
            let trimmed = text.trim_end_matches('\n').len();
            text.truncate(trimmed);
            frame.children.push(Node::plain(text));
            return;
        }
        for piece in wikilink::scan_escaped(&text, &escaped) {
            let node = match piece {
                Piece::Text(t) => Node::text(t, self.marks.clone()),
                Piece::WikiLink { href, title } => Node::leaf(
                    NodeType::WikiLink,
                    Attrs::WikiLink {
                        href: href.to_string(),
                        title: title.to_string(),
                    },
                )
                .with_marks(self.marks.clone()),
            };
            frame.children.push(node);
        }
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close_block();
        }
        self.flush_text();
        let Some(root) = self.stack.pop() else {
            return Node::doc(vec![Node::paragraph(vec![])]);
        };
        if root.children.is_empty() {
            return Node::doc(vec![Node::paragraph(vec![])]);
        }
        root.finish()
    }
}

/// Byte offsets in `text` of characters the source wrote as backslash
/// escapes. `range` is where the tokenizer found `text` in `source`.
fn escaped_chars(text: &str, source: &str, range: Range<usize>) -> Vec<usize> {
    let bytes = source.as_bytes();
    let Some(raw) = bytes.get(range.clone()) else {
        return Vec::new();
    };
    let text = text.as_bytes();
    let mut out = Vec::new();

    // the tokenizer starts a new text run after an escaping backslash
    let backslashes = bytes[..range.start]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    if backslashes % 2 == 1 && raw.first().is_some_and(u8::is_ascii_punctuation) {
        out.push(0);
    }

    let (mut i, mut j) = (0, 0);
    while i < raw.len() && j < text.len() {
        if raw[i] == b'\\'
            && raw
                .get(i + 1)
                .is_some_and(|&b| b.is_ascii_punctuation() && b == text[j])
        {
            out.push(j);
            i += 2;
        } else if raw[i] == text[j] {
            i += 1;
        } else {
            // entity or other rewrite; offsets no longer line up
            break;
        }
        j += 1;
    }
    out
}

fn convert_alignment(alignment: pulldown_cmark::Alignment) -> Option<Alignment> {
    match alignment {
        pulldown_cmark::Alignment::None => None,
        pulldown_cmark::Alignment::Left => Some(Alignment::Left),
        pulldown_cmark::Alignment::Center => Some(Alignment::Center),
        pulldown_cmark::Alignment::Right => Some(Alignment::Right),
    }
}

fn is_line_break_tag(html: &str) -> bool {
    let tag: String = html
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(tag.as_str(), "<br>" | "<br/>")
}
