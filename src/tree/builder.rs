//! Source tree to linked-list tree conversion.

use std::sync::Arc;

use log::info;

use crate::compress::{CompressOptions, LzTrieCompressor};
use crate::config::MAX_PARTITION_SIZE;
use crate::error::Result;
use crate::tree::source::SourceNode;
use crate::tree::tree::LinkedListTree;
use crate::unit::{CompactUnitArray, FastUnitArray, Unit, UnitArray, ValueMapping};

/// Knobs for a build pass.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Run the LZ-trie compression pass after layout.
    pub compress: bool,
    /// Use the partition-parallel compression mode.
    pub parallel: bool,
    /// Worker count for the parallel mode; 0 selects `max(1, cores - 1)`.
    pub nb_workers: usize,
    /// Dismantle the source tree while emitting units, roughly halving the
    /// peak memory of a large build.
    pub clear_base_tree: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            compress: true,
            parallel: false,
            nb_workers: 0,
            clear_base_tree: false,
        }
    }
}

/// Lays a source tree out as units, optionally compresses, and converts the
/// result to the read-only compact form.
pub struct TreeBuilder {
    options: BuildOptions,
}

impl TreeBuilder {
    pub fn new(options: BuildOptions) -> Self {
        TreeBuilder { options }
    }

    /// Lay `source` out as a fast unit array without compressing.
    ///
    /// The layout is a pre-order walk: each node's children go out as one
    /// sibling run directly after the node, ordered by mapped value code,
    /// with every unit's distance back-patched to its next sibling.  A
    /// symbol's code is registered the first time the walk meets it.
    pub fn layout(&self, mut source: SourceNode) -> FastUnitArray {
        let mut mapping = ValueMapping::new();
        let mut fast = FastUnitArray::new(source.node_count());
        fast.add(Unit::node(0, 0, false, !source.children.is_empty(), 0));
        self.emit_children(&mut fast, &mut source, &mut mapping);
        fast.set_value_mapping(Arc::new(mapping));
        fast
    }

    /// Build the dictionary tree from `source`: layout, optional
    /// compression, then conversion to the read-only compact form.
    pub fn build(&self, source: SourceNode) -> Result<LinkedListTree> {
        let fast = self.layout(source);
        let units_before = fast.size();
        let bytes_before = fast.allocation_size();
        info!("laid out {units_before} units ({bytes_before} bytes fast)");

        let fast = if self.options.compress {
            let compressor = LzTrieCompressor::new(CompressOptions {
                parallel: self.options.parallel,
                nb_workers: self.options.nb_workers,
                max_partition_size: MAX_PARTITION_SIZE,
            });
            compressor.compress(fast)?
        } else {
            fast
        };

        let mut compact = CompactUnitArray::from_fast(&fast);
        drop(fast);
        compact.compact();
        compact.trim_to_size();
        info!(
            "compact tree: {} units, {} bytes",
            compact.size(),
            compact.allocation_size()
        );
        Ok(LinkedListTree::from_units(UnitArray::Compact(compact)))
    }

    fn emit_children(
        &self,
        fast: &mut FastUnitArray,
        node: &mut SourceNode,
        mapping: &mut ValueMapping,
    ) {
        // Register codes in stored (symbol) order, then lay the siblings out
        // in code order — for a fresh mapping the two coincide level by
        // level, but subtrees seen later reuse earlier codes.
        for child in &node.children {
            mapping.map_or_add(child.symbol);
        }
        node.children
            .sort_by_key(|child| mapping.code(child.symbol));

        let mut previous: Option<usize> = None;
        for k in 0..node.children.len() {
            let index = fast.size();
            if let Some(prev) = previous {
                fast.set_distance(prev, (index - prev) as u32);
            }
            let child = &mut node.children[k];
            let code = mapping.map_or_add(child.symbol);
            fast.add(Unit::node(
                code,
                0,
                child.word_end,
                !child.children.is_empty(),
                child.data.unwrap_or(0),
            ));
            self.emit_children(fast, child, mapping);
            previous = Some(index);
        }
        if self.options.clear_base_tree {
            node.children = Vec::new();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::source::{source_from_tokens, IngestOptions};
    use crate::tree::traversal::Lookup;

    fn build(tokens: &[&str], options: BuildOptions) -> LinkedListTree {
        let source = source_from_tokens(tokens.iter().copied(), &IngestOptions::default());
        TreeBuilder::new(options).build(source).unwrap()
    }

    #[test]
    fn uncompressed_roundtrip() {
        let tokens = ["abc", "abd", "xyz", "x"];
        let tree = build(
            &tokens,
            BuildOptions {
                compress: false,
                ..BuildOptions::default()
            },
        );
        for token in tokens {
            assert!(tree.contains(token), "{token} must be found");
        }
        assert_eq!(tree.lookup("ab"), Lookup::Prefix);
        assert_eq!(tree.lookup("abx"), Lookup::Absent);
        assert_eq!(tree.lookup("abcd"), Lookup::Absent);
    }

    #[test]
    fn compressed_roundtrip() {
        let tokens = ["abc", "abd", "ebc", "ebd"];
        let tree = build(&tokens, BuildOptions::default());
        for token in tokens {
            assert!(tree.contains(token), "{token} must be found");
        }
        assert_eq!(tree.lookup("eb"), Lookup::Prefix);
        assert_eq!(tree.lookup("ebx"), Lookup::Absent);
    }

    #[test]
    fn sibling_codes_ascend() {
        let tree = build(
            &["b", "a", "c", "ba", "bb"],
            BuildOptions {
                compress: false,
                ..BuildOptions::default()
            },
        );
        let units = tree.unit_array();
        // Walk every sibling run and check the ordering invariant.
        for i in 0..units.size() {
            if units.is_absolute_pointer(i) {
                continue;
            }
            let d = units.distance(i) as usize;
            if d > 0 && !units.is_absolute_pointer(i + d) {
                assert!(
                    units.value_code(i) < units.value_code(i + d),
                    "sibling codes must ascend at {i}"
                );
            }
        }
    }

    #[test]
    fn payloads_survive_the_build() {
        let options = IngestOptions {
            with_data: true,
            ..IngestOptions::default()
        };
        let source = source_from_tokens(["one", "two", "three"], &options);
        let tree = TreeBuilder::new(BuildOptions::default()).build(source).unwrap();
        assert_eq!(tree.data("one"), Some(0));
        assert_eq!(tree.data("two"), Some(1));
        assert_eq!(tree.data("three"), Some(2));
        assert_eq!(tree.data("thre"), None);
    }

    #[test]
    fn clear_base_tree_builds_the_same_tree() {
        let tokens = ["wysoki", "wysokiego", "niewysoki"];
        let keep = build(&tokens, BuildOptions::default());
        let cleared = build(
            &tokens,
            BuildOptions {
                clear_base_tree: true,
                ..BuildOptions::default()
            },
        );
        for token in tokens {
            assert_eq!(keep.lookup(token), cleared.lookup(token));
        }
    }
}
