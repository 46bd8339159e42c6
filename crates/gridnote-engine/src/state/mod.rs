//! # Editor State
//!
//! A document paired with its selection. States are values: applying a
//! [`Transaction`] produces a new state and leaves the old one intact.

mod selection;

use crate::model::Node;
use crate::parser::MarkdownParser;
use crate::schema::Schema;
use crate::serializer::MarkdownSerializer;
use crate::transform::Transaction;

pub use selection::{Selection, find_text_pos};

#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Schema,
    doc: Node,
    selection: Selection,
}

impl EditorState {
    /// A state with the cursor at the first text position of `doc`.
    pub fn new(schema: Schema, doc: Node) -> Self {
        let selection = Selection::at_start(&doc);
        Self {
            schema,
            doc,
            selection,
        }
    }

    pub fn from_markdown(markdown: &str) -> Self {
        let parser = MarkdownParser::default();
        Self::new(Schema::with_tables(), parser.parse(markdown))
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = clamp(selection, &self.doc);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Starts a transaction against this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(self.doc.clone(), self.selection)
    }

    /// Applies `tr`, mapping the selection when the transaction does not set
    /// one.
    pub fn apply(&self, tr: Transaction) -> EditorState {
        let doc = tr.doc().clone();
        let selection = clamp(tr.selection(), &doc);
        log::trace!(
            "applied transaction: {} step(s), selection {:?}",
            tr.steps().len(),
            selection
        );
        EditorState {
            schema: self.schema.clone(),
            doc,
            selection,
        }
    }

    pub fn to_markdown(&self) -> String {
        MarkdownSerializer::default().serialize(&self.doc)
    }
}

fn clamp(selection: Selection, doc: &Node) -> Selection {
    let size = doc.content_size();
    match selection {
        Selection::Cursor { pos } => Selection::Cursor { pos: pos.min(size) },
        Selection::Range { anchor, head } => Selection::Range {
            anchor: anchor.min(size),
            head: head.min(size),
        },
        Selection::Gap { pos } => Selection::Gap { pos: pos.min(size) },
        Selection::Cell { anchor, head } => Selection::Cell {
            anchor: anchor.min(size),
            head: head.min(size),
        },
    }
}
