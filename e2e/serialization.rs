// e2e/serialization.rs — file-level persistence of built trees.

use std::fs;

use tempfile::TempDir;

use lztrie::error::Error;
use lztrie::tree::{source_from_tokens, BuildOptions, IngestOptions, LinkedListTree, TreeBuilder};

const WORDS: [&str; 8] = [
    "wysoki",
    "wysokiego",
    "wysokiemu",
    "niewysoki",
    "niewysokiego",
    "niewysokiemu",
    "wysoka",
    "wysocy",
];

fn sample_tree() -> LinkedListTree {
    let ingest = IngestOptions {
        with_data: true,
        ..IngestOptions::default()
    };
    let source = source_from_tokens(WORDS.iter().copied(), &ingest);
    TreeBuilder::new(BuildOptions::default())
        .build(source)
        .unwrap()
}

// ── 1. Save / load roundtrip ──────────────────────────────────────────────────

#[test]
fn file_roundtrip_preserves_size_and_lookups() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dictionary.llt");

    let tree = sample_tree();
    tree.save(&path).unwrap();
    let reloaded = LinkedListTree::load(&path).unwrap();

    assert_eq!(
        tree.allocation_size(),
        reloaded.allocation_size(),
        "reloaded tree must occupy the same space"
    );
    for (index, word) in WORDS.iter().enumerate() {
        assert_eq!(tree.lookup(word), reloaded.lookup(word), "{word}");
        assert_eq!(reloaded.data(word), Some(index as u32), "{word}");
    }
    assert_eq!(tree.lookup("wyso"), reloaded.lookup("wyso"));
    assert_eq!(tree.lookup("nope"), reloaded.lookup("nope"));
}

// ── 2. Corrupt inputs ─────────────────────────────────────────────────────────

#[test]
fn corrupt_version_byte_is_invalid_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dictionary.llt");
    sample_tree().save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[0] ^= 0x55;
    fs::write(&path, &bytes).unwrap();

    match LinkedListTree::load(&path) {
        Err(Error::InvalidFormat { .. }) => {}
        other => panic!("expected InvalidFormat, got {other:?}"),
    }
}

#[test]
fn truncated_file_is_an_io_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dictionary.llt");
    sample_tree().save(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 3]).unwrap();

    match LinkedListTree::load(&path) {
        Err(Error::Io(_)) => {}
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_failure() {
    let dir = TempDir::new().unwrap();
    match LinkedListTree::load(&dir.path().join("absent.llt")) {
        Err(Error::Io(_)) => {}
        other => panic!("expected Io, got {other:?}"),
    }
}

// ── 3. Double roundtrip is byte-stable ────────────────────────────────────────

#[test]
fn serialization_is_deterministic() {
    let tree = sample_tree();
    let mut first = Vec::new();
    tree.write(&mut first).unwrap();

    let reloaded = LinkedListTree::read(&mut first.as_slice()).unwrap();
    let mut second = Vec::new();
    reloaded.write(&mut second).unwrap();

    assert_eq!(first, second, "write(read(write(t))) must reproduce the bytes");
}
