//! # Schema
//!
//! The closed registry of node types a document may contain.
//!
//! [`Schema::markdown`] is the base document schema (paragraphs, headings,
//! lists, code, quotes). [`Schema::with_tables`] layers the table node kinds
//! and the inline `wiki_link` atom on top of it.
//!
//! Structural facts about a node type (its content rule, group and whether it
//! is an atom) are intrinsic to [`NodeType`]; the schema decides which types
//! are registered. Looking up a type the schema does not register is a
//! programmer error and is reported loudly via [`SchemaError`].

mod tables;

use std::collections::BTreeSet;

use serde::Serialize;

pub use tables::TABLE_NODES;

/// Every node kind the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    BulletList,
    OrderedList,
    ListItem,
    Text,
    HardBreak,
    Image,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    WikiLink,
}

/// Node groups used by content rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Block,
    Inline,
}

/// What a node may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    /// Leaf node, no children.
    Empty,
    /// Unmarked text only (code blocks).
    Text,
    /// Inline nodes (text, hard breaks, images, wiki links).
    Inline,
    /// Block nodes.
    Blocks,
    /// `list_item` children only.
    ListItems,
    /// `table_row` children only.
    Rows,
    /// `table_cell` / `table_header` children only.
    Cells,
}

impl ContentRule {
    /// Whether a node of type `child` may appear under this rule.
    pub fn allows(self, child: NodeType) -> bool {
        match self {
            ContentRule::Empty => false,
            ContentRule::Text => child == NodeType::Text,
            ContentRule::Inline => child.group() == Some(Group::Inline),
            ContentRule::Blocks => child.group() == Some(Group::Block),
            ContentRule::ListItems => child == NodeType::ListItem,
            ContentRule::Rows => child == NodeType::TableRow,
            ContentRule::Cells => child.is_cell(),
        }
    }
}

impl NodeType {
    pub const ALL: [NodeType; 17] = [
        NodeType::Doc,
        NodeType::Paragraph,
        NodeType::Heading,
        NodeType::Blockquote,
        NodeType::CodeBlock,
        NodeType::HorizontalRule,
        NodeType::BulletList,
        NodeType::OrderedList,
        NodeType::ListItem,
        NodeType::Text,
        NodeType::HardBreak,
        NodeType::Image,
        NodeType::Table,
        NodeType::TableRow,
        NodeType::TableCell,
        NodeType::TableHeader,
        NodeType::WikiLink,
    ];

    /// The registry name of this type, e.g. `table_header`.
    pub const fn name(self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::Blockquote => "blockquote",
            NodeType::CodeBlock => "code_block",
            NodeType::HorizontalRule => "horizontal_rule",
            NodeType::BulletList => "bullet_list",
            NodeType::OrderedList => "ordered_list",
            NodeType::ListItem => "list_item",
            NodeType::Text => "text",
            NodeType::HardBreak => "hard_break",
            NodeType::Image => "image",
            NodeType::Table => "table",
            NodeType::TableRow => "table_row",
            NodeType::TableCell => "table_cell",
            NodeType::TableHeader => "table_header",
            NodeType::WikiLink => "wiki_link",
        }
    }

    pub fn from_name(name: &str) -> Option<NodeType> {
        NodeType::ALL.into_iter().find(|t| t.name() == name)
    }

    pub const fn content_rule(self) -> ContentRule {
        match self {
            NodeType::Doc | NodeType::Blockquote | NodeType::ListItem => ContentRule::Blocks,
            NodeType::Paragraph | NodeType::Heading => ContentRule::Inline,
            NodeType::TableCell | NodeType::TableHeader => ContentRule::Inline,
            NodeType::CodeBlock => ContentRule::Text,
            NodeType::BulletList | NodeType::OrderedList => ContentRule::ListItems,
            NodeType::Table => ContentRule::Rows,
            NodeType::TableRow => ContentRule::Cells,
            NodeType::HorizontalRule
            | NodeType::Text
            | NodeType::HardBreak
            | NodeType::Image
            | NodeType::WikiLink => ContentRule::Empty,
        }
    }

    pub const fn group(self) -> Option<Group> {
        match self {
            NodeType::Paragraph
            | NodeType::Heading
            | NodeType::Blockquote
            | NodeType::CodeBlock
            | NodeType::HorizontalRule
            | NodeType::BulletList
            | NodeType::OrderedList
            | NodeType::Table => Some(Group::Block),
            NodeType::Text | NodeType::HardBreak | NodeType::Image | NodeType::WikiLink => {
                Some(Group::Inline)
            }
            NodeType::Doc
            | NodeType::ListItem
            | NodeType::TableRow
            | NodeType::TableCell
            | NodeType::TableHeader => None,
        }
    }

    /// Atoms are opaque to cursor placement: the cursor can sit before or
    /// after them but never inside.
    pub const fn is_atom(self) -> bool {
        matches!(
            self,
            NodeType::HorizontalRule | NodeType::HardBreak | NodeType::Image | NodeType::WikiLink
        )
    }

    pub fn is_textblock(self) -> bool {
        matches!(self.content_rule(), ContentRule::Inline | ContentRule::Text)
    }

    pub fn is_cell(self) -> bool {
        matches!(self, NodeType::TableCell | NodeType::TableHeader)
    }

    pub fn is_table_part(self) -> bool {
        matches!(
            self,
            NodeType::Table | NodeType::TableRow | NodeType::TableCell | NodeType::TableHeader
        )
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("node type `{0}` is not registered in this schema")]
    MissingNodeType(String),
    #[error("`{child}` is not allowed inside `{parent}`")]
    InvalidContent {
        parent: &'static str,
        child: &'static str,
    },
}

/// A closed set of registered node types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    types: BTreeSet<NodeType>,
}

const MARKDOWN_NODES: [NodeType; 12] = [
    NodeType::Doc,
    NodeType::Paragraph,
    NodeType::Heading,
    NodeType::Blockquote,
    NodeType::CodeBlock,
    NodeType::HorizontalRule,
    NodeType::BulletList,
    NodeType::OrderedList,
    NodeType::ListItem,
    NodeType::Text,
    NodeType::HardBreak,
    NodeType::Image,
];

impl Schema {
    /// The base markdown document schema, without tables or wiki links.
    pub fn markdown() -> Self {
        Self {
            types: MARKDOWN_NODES.into_iter().collect(),
        }
    }

    /// The base schema extended with the table node kinds and `wiki_link`.
    pub fn with_tables() -> Self {
        Self::markdown().extend(TABLE_NODES)
    }

    /// Registers additional node types.
    pub fn extend(mut self, types: impl IntoIterator<Item = NodeType>) -> Self {
        self.types.extend(types);
        self
    }

    pub fn has(&self, ty: NodeType) -> bool {
        self.types.contains(&ty)
    }

    /// Looks up a node type by registry name.
    pub fn node_type(&self, name: &str) -> Result<NodeType, SchemaError> {
        match NodeType::from_name(name) {
            Some(ty) if self.has(ty) => Ok(ty),
            _ => {
                log::error!("schema lookup for unregistered node type `{name}`");
                Err(SchemaError::MissingNodeType(name.to_string()))
            }
        }
    }

    /// Asserts that `ty` is registered.
    pub fn require(&self, ty: NodeType) -> Result<NodeType, SchemaError> {
        if self.has(ty) {
            Ok(ty)
        } else {
            log::error!("schema is missing required node type `{ty}`");
            Err(SchemaError::MissingNodeType(ty.name().to_string()))
        }
    }

    pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
        self.types.iter().copied()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::with_tables()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_schema_has_no_tables() {
        let schema = Schema::markdown();
        assert!(schema.has(NodeType::Paragraph));
        assert!(!schema.has(NodeType::Table));
        assert!(!schema.has(NodeType::WikiLink));
    }

    #[test]
    fn table_schema_layers_onto_base() {
        let schema = Schema::with_tables();
        for ty in NodeType::ALL {
            assert!(schema.has(ty), "{ty} should be registered");
        }
    }

    #[test]
    fn lookup_by_name() {
        let schema = Schema::with_tables();
        assert_eq!(schema.node_type("table_header"), Ok(NodeType::TableHeader));
        assert_eq!(schema.node_type("wiki_link"), Ok(NodeType::WikiLink));
    }

    #[test]
    fn missing_type_is_an_error() {
        let schema = Schema::markdown();
        assert_eq!(
            schema.node_type("wiki_link"),
            Err(SchemaError::MissingNodeType("wiki_link".into()))
        );
        assert!(schema.require(NodeType::Table).is_err());
        assert!(Schema::with_tables().node_type("no_such_type").is_err());
    }

    #[test]
    fn content_rules() {
        assert!(NodeType::Table.content_rule().allows(NodeType::TableRow));
        assert!(!NodeType::Table.content_rule().allows(NodeType::TableCell));
        assert!(NodeType::TableRow.content_rule().allows(NodeType::TableHeader));
        assert!(NodeType::TableCell.content_rule().allows(NodeType::WikiLink));
        assert!(!NodeType::TableCell.content_rule().allows(NodeType::Paragraph));
        assert!(NodeType::Doc.content_rule().allows(NodeType::Table));
        assert!(!NodeType::WikiLink.content_rule().allows(NodeType::Text));
    }

    #[test]
    fn cells_are_textblocks_and_wiki_links_are_atoms() {
        assert!(NodeType::TableCell.is_textblock());
        assert!(NodeType::TableHeader.is_textblock());
        assert!(NodeType::WikiLink.is_atom());
        assert_eq!(NodeType::WikiLink.group(), Some(Group::Inline));
    }
}
