//! The dictionary tree: input tree, builder, traversal, and the facade type.
//!
//! Submodules:
//! - [`source`]    — the conventional node-with-children input tree
//! - [`builder`]   — pre-order layout, optional compression, compact conversion
//! - [`traversal`] — pointer-transparent descent
//! - [`tree`]      — the [`LinkedListTree`] facade with persistence

pub mod builder;
pub mod source;
pub mod traversal;
#[allow(clippy::module_inception)]
pub mod tree;

pub use builder::{BuildOptions, TreeBuilder};
pub use source::{source_from_tokens, IngestOptions, SourceNode};
pub use traversal::{Lookup, Traverser};
pub use tree::LinkedListTree;
