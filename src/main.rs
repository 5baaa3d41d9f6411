//! Binary entry point for the `lztrie` command-line tool.
//!
//! Reads a word list, builds the compressed dictionary tree, persists it next
//! to the input as `<path>.llt`, re-reads the file, and verifies every token
//! against the reloaded tree.  Diagnostic counts go to the log at INFO level
//! (`RUST_LOG` overrides the filter).
//!
//! Exit codes: 0 on success, 1 on bad usage or any I/O, format, or
//! verification failure.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::info;

use lztrie::cli::args::{parse_args, ParsedArgs};
use lztrie::tree::{source_from_tokens, BuildOptions, IngestOptions, LinkedListTree, TreeBuilder};

fn run(args: ParsedArgs) -> Result<()> {
    let Some(input_path) = args.input_path.clone() else {
        bail!("missing input path");
    };

    let text = fs::read_to_string(&input_path)
        .with_context(|| format!("cannot read word list '{input_path}'"))?;
    let tokens: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    info!("read {} tokens from '{}'", tokens.len(), input_path);
    if tokens.is_empty() {
        bail!("word list '{input_path}' holds no tokens");
    }

    let ingest = IngestOptions {
        reverse: args.reverse,
        with_data: args.with_data,
        split_word: args.split_word,
    };
    let source = source_from_tokens(tokens.iter().copied(), &ingest);

    let started = Instant::now();
    let builder = TreeBuilder::new(BuildOptions {
        compress: true,
        parallel: args.parallel,
        nb_workers: 0,
        clear_base_tree: true,
    });
    let tree = builder.build(source)?;
    info!(
        "built dictionary tree in {:.2?}: {} bytes",
        started.elapsed(),
        tree.allocation_size()
    );

    let output_path = PathBuf::from(format!("{input_path}.llt"));
    tree.save(&output_path)
        .with_context(|| format!("cannot write '{}'", output_path.display()))?;
    info!("wrote '{}'", output_path.display());

    let reloaded = LinkedListTree::load(&output_path)
        .with_context(|| format!("cannot re-read '{}'", output_path.display()))?;
    verify(&reloaded, &tokens, &ingest)?;
    info!("verified {} tokens against the reloaded tree", tokens.len());
    Ok(())
}

/// Check every token (and payload, when attached) against the tree.
///
/// A duplicate token keeps the payload of its last occurrence, mirroring the
/// insert semantics, so the expected payloads are collected first.
fn verify(tree: &LinkedListTree, tokens: &[&str], ingest: &IngestOptions) -> Result<()> {
    let mut expected: Vec<(String, Vec<i32>, u32)> = Vec::with_capacity(tokens.len());
    let mut last_index: std::collections::HashMap<Vec<i32>, u32> = std::collections::HashMap::new();
    for (index, token) in tokens.iter().enumerate() {
        let pieces: Vec<&str> = if ingest.split_word {
            token.split_whitespace().collect()
        } else {
            vec![*token]
        };
        for piece in pieces {
            let mut path: Vec<i32> = piece.chars().map(|ch| ch as i32).collect();
            if ingest.reverse {
                path.reverse();
            }
            last_index.insert(path.clone(), index as u32);
            expected.push((piece.to_owned(), path, index as u32));
        }
    }
    for (piece, path, _) in &expected {
        let lookup = tree.lookup_symbols(path);
        if !lookup.is_word() {
            bail!("verification failed: '{piece}' missing from the built tree");
        }
        if ingest.with_data {
            let want = last_index.get(path).copied();
            if lookup.data() != want {
                bail!(
                    "verification failed: '{piece}' carries {:?}, expected {want:?}",
                    lookup.data()
                );
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("lztrie: {error}");
            std::process::exit(1);
        }
    };
    if args.exit_early {
        return;
    }
    if let Err(error) = run(args) {
        eprintln!("lztrie: {error:#}");
        std::process::exit(1);
    }
}
