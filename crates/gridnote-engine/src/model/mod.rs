//! # Document Model
//!
//! Immutable document trees and the flattened position space over them.
//!
//! - **`attrs`**: per-kind attributes, [`CellAttrs`] with its DOM bridge, marks
//! - **`node`**: [`Node`] and [`Fragment`] (shared, identity-carrying children)
//! - **`resolved`**: [`ResolvedPos`], the ancestor-path view of a position

pub mod attrs;
pub mod node;
pub mod resolved;

pub use attrs::{Alignment, Attrs, CellAttrs, Mark};
pub use node::{Fragment, Node};
pub use resolved::{PositionError, ResolvedPos};
