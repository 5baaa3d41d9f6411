//! The `lztrie` command-line tool: word-list ingestion, build, persist,
//! and verification.
//!
//! Submodules:
//! - [`args`] — argument parsing loop and the [`args::ParsedArgs`] output

pub mod args;

pub use args::{parse_args, parse_args_from, ParsedArgs};
