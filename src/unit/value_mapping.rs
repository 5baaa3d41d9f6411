//! Shared symbol-to-code dictionary.

use std::collections::HashMap;

/// Densely numbered dictionary of the symbols stored in a tree.
///
/// Code 0 is reserved for the root; real symbols receive codes in order of
/// first appearance during the build, and those codes are afterwards the sort
/// key for sibling runs.  A mapping is immutable once the owning array is
/// complete and is shared by reference (`Arc`) between an array and anything
/// derived from it — sub-arrays and compressor output never deep-copy it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMapping {
    /// Position `i` stores the symbol whose code is `i`; position 0 is the
    /// root placeholder.
    values: Vec<i32>,
    codes: HashMap<i32, u32>,
}

impl ValueMapping {
    pub fn new() -> Self {
        ValueMapping {
            values: vec![0],
            codes: HashMap::new(),
        }
    }

    /// Rebuild a mapping from its serialized `values` table.
    pub fn from_values(values: Vec<i32>) -> Self {
        let codes = values
            .iter()
            .enumerate()
            .skip(1)
            .map(|(code, &symbol)| (symbol, code as u32))
            .collect();
        ValueMapping { values, codes }
    }

    /// Number of table entries, including the reserved root slot.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() <= 1
    }

    /// The code for `symbol`, registering a fresh one on first appearance.
    pub fn map_or_add(&mut self, symbol: i32) -> u32 {
        if let Some(&code) = self.codes.get(&symbol) {
            return code;
        }
        let code = self.values.len() as u32;
        self.values.push(symbol);
        self.codes.insert(symbol, code);
        code
    }

    /// The code for `symbol`, or `None` when the tree never stored it.
    #[inline]
    pub fn code(&self, symbol: i32) -> Option<u32> {
        self.codes.get(&symbol).copied()
    }

    /// The symbol behind `code` (reverse mapping).
    #[inline]
    pub fn value(&self, code: u32) -> Option<i32> {
        if code == 0 {
            return None;
        }
        self.values.get(code as usize).copied()
    }

    /// The raw table as serialized: `values[i]` is the symbol with code `i`.
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Approximate heap footprint in bytes.  Counted from the logical sizes
    /// so a freshly built mapping and its deserialized twin agree.
    pub fn allocation_size(&self) -> usize {
        self.values.len() * std::mem::size_of::<i32>()
            + self.codes.len() * (std::mem::size_of::<i32>() + std::mem::size_of::<u32>())
            + std::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_first_appearance() {
        let mut mapping = ValueMapping::new();
        assert_eq!(mapping.map_or_add(120), 1);
        assert_eq!(mapping.map_or_add(97), 2);
        assert_eq!(mapping.map_or_add(120), 1);
        assert_eq!(mapping.code(97), Some(2));
        assert_eq!(mapping.code(98), None);
        assert_eq!(mapping.value(2), Some(97));
    }

    #[test]
    fn zero_is_reserved_for_the_root() {
        let mut mapping = ValueMapping::new();
        mapping.map_or_add(0);
        // Symbol 0 is a normal symbol; it must not collide with the root code.
        assert_eq!(mapping.code(0), Some(1));
        assert_eq!(mapping.value(0), None);
    }

    #[test]
    fn rebuild_from_values_table() {
        let mut mapping = ValueMapping::new();
        for symbol in [10, 20, 30] {
            mapping.map_or_add(symbol);
        }
        let rebuilt = ValueMapping::from_values(mapping.values().to_vec());
        assert_eq!(rebuilt, mapping);
    }
}
