//! Compact linked-list trie with LZ-style self-compression.
//!
//! A dictionary of millions of strings is stored as a flat array of bit-packed
//! structural *units*; repeated subtree fragments are found through a suffix
//! array and rewritten into absolute back-pointers, and lookups follow those
//! pointers transparently.  The resulting structure answers exact lookups at
//! millions of queries per second from a few hundred kilobytes.

pub mod bits;
pub mod cli;
pub mod compress;
pub mod config;
pub mod error;
pub mod format;
pub mod threadpool;
pub mod tree;
pub mod unit;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level convenience re-exports for the most common API entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// Crate-wide error and result types.
pub use error::{Error, Result};

/// Dense bit sequence backed by 64-bit words.
pub use bits::BitArray;
/// Dense integer sequence stored in `w` bits per element, auto-widening.
pub use bits::PackedIntArray;

/// The atom of the trie representation.
pub use unit::Unit;
/// Uniform accessor over the two unit-array representations.
pub use unit::UnitArray;
/// Mutable, primitive-array representation used during construction.
pub use unit::FastUnitArray;
/// Bit-packed, optionally deduplicated, read-only representation.
pub use unit::CompactUnitArray;
/// Shared symbol-to-code dictionary.
pub use unit::ValueMapping;

/// Suffix-array driven subtree deduplication.
pub use compress::LzTrieCompressor;
/// Knobs for the compression pass (worker count, partition bound).
pub use compress::CompressOptions;

/// The completed, queryable dictionary tree.
pub use tree::LinkedListTree;
/// Converts a source tree into a (compressed) linked-list tree.
pub use tree::TreeBuilder;
/// Knobs for the build pass.
pub use tree::BuildOptions;
/// Conventional node-with-children input tree.
pub use tree::SourceNode;
/// Token-list ingestion options shared with the CLI.
pub use tree::IngestOptions;
