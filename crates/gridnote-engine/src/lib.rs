//! Table editing engine for a markdown-backed rich-text editor.
//!
//! Markdown is parsed into an immutable document tree ([`parse`]), edited
//! through [`Transaction`]s produced by commands, and written back out with
//! [`serialize`]. The [`table`] module holds everything specific to GFM
//! tables.

pub mod command;
pub mod decorations;
pub mod model;
pub mod parser;
pub mod schema;
pub mod serializer;
pub mod state;
pub mod table;
pub mod transform;

// Re-export key types for easier usage
pub use command::{Command, Direction, Dispatch, command};
pub use decorations::{Decoration, tag_links};
pub use model::{Alignment, Attrs, CellAttrs, Fragment, Mark, Node, PositionError, ResolvedPos};
pub use parser::{MarkdownParser, parse};
pub use schema::{NodeType, Schema, SchemaError};
pub use serializer::{MarkdownSerializer, SerializerOptions, serialize};
pub use state::{EditorState, Selection};
pub use table::*;
pub use transform::{Assoc, Mapping, Step, StepMap, Transaction, TransformError};
