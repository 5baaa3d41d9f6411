//! Command-line argument parsing for the `lztrie` tool.
//!
//! The entry points are [`parse_args`] (reads `std::env::args()`) and
//! [`parse_args_from`] (takes an explicit slice, suitable for unit tests).
//! Flags follow the tool's historical single-dash spelling (`-parallel`,
//! `-withData`); unrecognised options return an `Err` whose message begins
//! with `"bad usage: "`.

use anyhow::{anyhow, Result};

/// Complete set of options produced by the argument parsing loop.
#[derive(Debug, Default)]
pub struct ParsedArgs {
    /// Path to the word list.
    pub input_path: Option<String>,
    /// Use partition-parallel compression.
    pub parallel: bool,
    /// Insert tokens back-to-front (suffix dictionary).
    pub reverse: bool,
    /// Attach each token's 0-based index as its payload.
    pub with_data: bool,
    /// Split tokens on whitespace before inserting.
    pub split_word: bool,
    /// A help/version flag was handled; the caller should exit 0.
    pub exit_early: bool,
}

/// Usage line printed by `-h` and on bad usage.
pub const USAGE: &str =
    "usage: lztrie <path-to-word-list> [-parallel] [-reverse] [-withData] [-splitWord]";

/// Parse the process arguments (skipping `argv[0]`).
pub fn parse_args() -> Result<ParsedArgs> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    parse_args_from(&argv)
}

/// Parse an explicit argument slice.
pub fn parse_args_from<S: AsRef<str>>(argv: &[S]) -> Result<ParsedArgs> {
    let mut args = ParsedArgs::default();
    for raw in argv {
        let arg = raw.as_ref();
        match arg {
            "-parallel" => args.parallel = true,
            "-reverse" => args.reverse = true,
            "-withData" => args.with_data = true,
            "-splitWord" => args.split_word = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                args.exit_early = true;
                return Ok(args);
            }
            "-V" | "--version" => {
                println!("lztrie {}", env!("CARGO_PKG_VERSION"));
                args.exit_early = true;
                return Ok(args);
            }
            _ if arg.starts_with('-') => {
                return Err(anyhow!("bad usage: unknown option '{arg}'\n{USAGE}"));
            }
            _ => {
                if args.input_path.is_some() {
                    return Err(anyhow!("bad usage: more than one input path\n{USAGE}"));
                }
                args.input_path = Some(arg.to_owned());
            }
        }
    }
    if args.input_path.is_none() {
        return Err(anyhow!("bad usage: missing input path\n{USAGE}"));
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let args =
            parse_args_from(&["words.txt", "-parallel", "-reverse", "-withData", "-splitWord"])
                .unwrap();
        assert_eq!(args.input_path.as_deref(), Some("words.txt"));
        assert!(args.parallel && args.reverse && args.with_data && args.split_word);
        assert!(!args.exit_early);
    }

    #[test]
    fn flags_default_off() {
        let args = parse_args_from(&["words.txt"]).unwrap();
        assert!(!args.parallel && !args.reverse && !args.with_data && !args.split_word);
    }

    #[test]
    fn unknown_option_is_bad_usage() {
        let err = parse_args_from(&["words.txt", "-frobnicate"]).unwrap_err();
        assert!(err.to_string().starts_with("bad usage: "));
    }

    #[test]
    fn missing_path_is_bad_usage() {
        let err = parse_args_from(&["-parallel"]).unwrap_err();
        assert!(err.to_string().contains("missing input path"));
    }

    #[test]
    fn duplicate_path_is_bad_usage() {
        let err = parse_args_from(&["a.txt", "b.txt"]).unwrap_err();
        assert!(err.to_string().contains("more than one input path"));
    }
}
