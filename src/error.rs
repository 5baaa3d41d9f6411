//! Crate-wide error type.
//!
//! Boundary failures (I/O, file format) are surfaced to the caller; internal
//! invariant violations abort the current operation without returning partial
//! state.  Index and value errors carry the offending input so the message
//! pinpoints the caller bug.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Index beyond the logical size of a unit, bit, or packed array.
    #[error("index {index} out of range for array of size {size}")]
    OutOfRange { index: usize, size: usize },

    /// Mutation attempted on an array already frozen by `compact()`.
    #[error("array is compact and can no longer be modified")]
    InvalidMutation,

    /// A negative integer arrived where only non-negative values are stored.
    #[error("cannot store negative value {0}")]
    NegativeValue(i64),

    /// Version byte mismatch while reading a persisted structure.
    #[error("invalid file format: expected version {expected}, found {found}")]
    InvalidFormat { expected: u8, found: u8 },

    /// Underlying stream failure on read or write.
    #[error("i/o failure")]
    Io(#[from] std::io::Error),

    /// The tree encoding is inconsistent, e.g. a sibling pointer landing on
    /// an erased slot.  Indicates a corrupt persisted file or a caller bug.
    #[error("structural invariant violated: {0}")]
    StructuralInvariant(String),

    /// Operation not available on this representation, e.g. compressing a
    /// tree that has already been converted to its read-only compact form.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Assertion failure inside the parallel compression machinery.
    #[error("compression internal error: {0}")]
    CompressionInternal(String),
}

impl Error {
    /// Shorthand for [`Error::OutOfRange`].
    pub(crate) fn out_of_range(index: usize, size: usize) -> Self {
        Error::OutOfRange { index, size }
    }
}
