//! The unit-array representation of the trie.
//!
//! Submodules:
//! - [`types`]         — the [`Unit`] atom and its total order
//! - [`value_mapping`] — shared symbol-to-code dictionary
//! - [`fast`]          — mutable parallel-primitive-array representation
//! - [`compact`]       — bit-packed, optionally deduplicated representation
//! - [`array`]         — the [`UnitArray`] enum unifying the two
//!
//! Both representations persist behind a common header carrying the logical
//! size and the value mapping; the helpers for that header live here.

pub mod array;
pub mod compact;
pub mod fast;
pub mod types;
pub mod value_mapping;

pub use array::UnitArray;
pub use compact::CompactUnitArray;
pub use fast::FastUnitArray;
pub use types::Unit;
pub use value_mapping::ValueMapping;

use std::io::{Read, Write};

use crate::error::Result;
use crate::format;

/// Write the shared unit-array header: version, logical size, value mapping.
pub(crate) fn write_header<W: Write>(
    out: &mut W,
    size: usize,
    mapping: Option<&ValueMapping>,
) -> Result<()> {
    format::write_u8(out, format::UNIT_ARRAY_VERSION)?;
    format::write_int(out, size as i32)?;
    match mapping {
        Some(mapping) => {
            format::write_int(out, mapping.len() as i32)?;
            for &symbol in mapping.values() {
                format::write_int(out, symbol)?;
            }
        }
        None => format::write_int(out, 0)?,
    }
    Ok(())
}

/// Inverse of [`write_header`]; returns the logical size and the mapping.
pub(crate) fn read_header<R: Read>(input: &mut R) -> Result<(usize, Option<ValueMapping>)> {
    format::check_version(input, format::UNIT_ARRAY_VERSION)?;
    let size = format::read_len(input)?;
    let vm_len = format::read_len(input)?;
    if vm_len == 0 {
        return Ok((size, None));
    }
    let mut values = Vec::with_capacity(vm_len);
    for _ in 0..vm_len {
        values.push(format::read_int(input)?);
    }
    Ok((size, Some(ValueMapping::from_values(values))))
}
