//! The completed, queryable dictionary tree.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::compress::{CompressOptions, LzTrieCompressor};
use crate::error::{Error, Result};
use crate::format;
use crate::tree::traversal::{Lookup, Traverser};
use crate::unit::{CompactUnitArray, FastUnitArray, UnitArray};

/// A linked-list tree over either unit-array representation.
///
/// Read-only once built: lookups never mutate, so a completed tree can be
/// queried from any number of threads.
#[derive(Debug, Clone)]
pub struct LinkedListTree {
    units: UnitArray,
}

impl LinkedListTree {
    pub fn from_units(units: UnitArray) -> Self {
        LinkedListTree { units }
    }

    pub fn unit_array(&self) -> &UnitArray {
        &self.units
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Walk `word` character by character.
    pub fn lookup(&self, word: &str) -> Lookup {
        let path: Vec<i32> = word.chars().map(|ch| ch as i32).collect();
        self.lookup_symbols(&path)
    }

    /// Walk a pre-encoded symbol path.
    pub fn lookup_symbols(&self, path: &[i32]) -> Lookup {
        Traverser::new(&self.units).lookup(path)
    }

    /// Walk a symbol path with a caller-supplied frame buffer, so the lookup
    /// itself allocates nothing.
    pub fn lookup_symbols_with_buffer(&self, path: &[i32], buffer: &mut [u32]) -> Lookup {
        Traverser::new(&self.units).lookup_with_buffer(path, buffer)
    }

    /// Whether `word` is a stored key.
    pub fn contains(&self, word: &str) -> bool {
        self.lookup(word).is_word()
    }

    /// The payload stored under `word`, when it is a stored key.
    pub fn data(&self, word: &str) -> Option<u32> {
        self.lookup(word).data()
    }

    pub fn allocation_size(&self) -> usize {
        self.units.allocation_size()
    }

    // ── Compression ───────────────────────────────────────────────────────────

    /// Run the compression pass on a tree still in its fast form.
    ///
    /// A tree that has already been converted to the compact representation
    /// cannot be compressed again; the pass needs the mutable fast layout.
    pub fn compress(&mut self, options: CompressOptions) -> Result<()> {
        let units = std::mem::replace(&mut self.units, UnitArray::Fast(FastUnitArray::default()));
        match units {
            UnitArray::Fast(fast) => {
                let compressed = LzTrieCompressor::new(options).compress(fast)?;
                self.units = UnitArray::Fast(compressed);
                Ok(())
            }
            UnitArray::Compact(compact) => {
                self.units = UnitArray::Compact(compact);
                Err(Error::UnsupportedOperation(
                    "compress a tree already in compact form",
                ))
            }
        }
    }

    // ── Serialization ─────────────────────────────────────────────────────────

    /// Write the tree; always persists the compact form.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        format::write_u8(out, format::TREE_VERSION)?;
        match &self.units {
            UnitArray::Compact(compact) => compact.write(out),
            UnitArray::Fast(fast) => {
                let mut compact = CompactUnitArray::from_fast(fast);
                compact.compact();
                compact.write(out)
            }
        }
    }

    /// Inverse of [`LinkedListTree::write`].
    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        format::check_version(input, format::TREE_VERSION)?;
        let compact = CompactUnitArray::read(input)?;
        Ok(LinkedListTree {
            units: UnitArray::Compact(compact),
        })
    }

    /// Write to a file, buffered.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Read from a file, buffered.
    pub fn load(path: &Path) -> Result<Self> {
        let mut input = BufReader::new(File::open(path)?);
        Self::read(&mut input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::builder::{BuildOptions, TreeBuilder};
    use crate::tree::source::{source_from_tokens, IngestOptions};

    fn sample_tree() -> LinkedListTree {
        let source = source_from_tokens(
            ["alpha", "beta", "betas", "gamma"],
            &IngestOptions::default(),
        );
        TreeBuilder::new(BuildOptions::default()).build(source).unwrap()
    }

    #[test]
    fn stream_roundtrip_preserves_lookups() {
        let tree = sample_tree();
        let mut buf = Vec::new();
        tree.write(&mut buf).unwrap();
        let back = LinkedListTree::read(&mut buf.as_slice()).unwrap();
        for word in ["alpha", "beta", "betas", "gamma", "bet", "delta"] {
            assert_eq!(tree.lookup(word), back.lookup(word), "{word}");
        }
        assert_eq!(tree.allocation_size(), back.allocation_size());
    }

    #[test]
    fn wrong_version_byte_is_rejected() {
        let tree = sample_tree();
        let mut buf = Vec::new();
        tree.write(&mut buf).unwrap();
        buf[0] = 9;
        match LinkedListTree::read(&mut buf.as_slice()) {
            Err(Error::InvalidFormat { found: 9, .. }) => {}
            other => panic!("expected InvalidFormat, got {other:?}"),
        }
    }

    #[test]
    fn compressing_a_compact_tree_is_unsupported() {
        let mut tree = sample_tree();
        match tree.compress(CompressOptions::default()) {
            Err(Error::UnsupportedOperation(_)) => {}
            other => panic!("expected UnsupportedOperation, got {other:?}"),
        }
        // The tree is still intact afterwards.
        assert!(tree.contains("alpha"));
    }

    #[test]
    fn truncated_stream_is_an_io_failure() {
        let tree = sample_tree();
        let mut buf = Vec::new();
        tree.write(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        match LinkedListTree::read(&mut buf.as_slice()) {
            Err(Error::Io(_)) => {}
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
