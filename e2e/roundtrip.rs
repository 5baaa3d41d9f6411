// e2e/roundtrip.rs — build/lookup roundtrips through the library API.
//
// Covers the shared-suffix dictionary, payload attachment, and the reverse
// (suffix-dictionary) insertion mode, compressed and uncompressed.

use lztrie::tree::{
    source_from_tokens, BuildOptions, IngestOptions, LinkedListTree, Lookup, TreeBuilder,
};

const SHARED_SUFFIX_WORDS: [&str; 8] = [
    "wysoki",
    "wysokiego",
    "wysokiemu",
    "niewysoki",
    "niewysokiego",
    "niewysokiemu",
    "wysoka",
    "wysocy",
];

fn build_tree(tokens: &[&str], ingest: &IngestOptions, compress: bool) -> LinkedListTree {
    let source = source_from_tokens(tokens.iter().copied(), ingest);
    TreeBuilder::new(BuildOptions {
        compress,
        ..BuildOptions::default()
    })
    .build(source)
    .expect("build must succeed")
}

// ── 1. Shared-suffix dictionary ───────────────────────────────────────────────

#[test]
fn shared_suffix_dictionary_after_compression() {
    let tree = build_tree(&SHARED_SUFFIX_WORDS, &IngestOptions::default(), true);
    for word in SHARED_SUFFIX_WORDS {
        assert_eq!(tree.lookup(word), Lookup::Word(0), "{word} must be a word");
    }
    assert_eq!(tree.lookup("wyso"), Lookup::Prefix);
    assert_eq!(tree.lookup("wysokiemuw"), Lookup::Absent);
    assert_eq!(tree.lookup("zzz"), Lookup::Absent);
}

#[test]
fn compression_preserves_every_lookup() {
    let plain = build_tree(&SHARED_SUFFIX_WORDS, &IngestOptions::default(), false);
    let packed = build_tree(&SHARED_SUFFIX_WORDS, &IngestOptions::default(), true);
    // Every stored word, every proper prefix, and some misses agree.
    let mut probes: Vec<String> = Vec::new();
    for word in SHARED_SUFFIX_WORDS {
        for end in 1..=word.len() {
            probes.push(word[..end].to_owned());
        }
        probes.push(format!("{word}x"));
    }
    for probe in &probes {
        assert_eq!(plain.lookup(probe), packed.lookup(probe), "probe '{probe}'");
    }
}

// ── 2. Leaf payloads ──────────────────────────────────────────────────────────

#[test]
fn payloads_are_the_token_indexes() {
    let ingest = IngestOptions {
        with_data: true,
        ..IngestOptions::default()
    };
    let tree = build_tree(&SHARED_SUFFIX_WORDS, &ingest, true);
    assert_eq!(tree.data("wysokiego"), Some(1));
    assert_eq!(tree.data("niewysokiemu"), Some(5));
    assert_eq!(tree.data("wysoki"), Some(0));
    assert_eq!(tree.data("wysocy"), Some(7));
    assert_eq!(tree.data("wyso"), None);
}

// ── 3. Reverse (suffix) dictionary ────────────────────────────────────────────

#[test]
fn reverse_mode_builds_a_suffix_dictionary() {
    let words = ["abcx", "xyzx", "qx", "bzx"];
    let ingest = IngestOptions {
        reverse: true,
        ..IngestOptions::default()
    };
    let tree = build_tree(&words, &ingest, true);
    for word in words {
        let path: Vec<i32> = word.chars().rev().map(|ch| ch as i32).collect();
        assert!(
            tree.lookup_symbols(&path).is_word(),
            "{word} must be found via its reversed path"
        );
    }
    // Every input ends in 'x', so the single-symbol path "x" is a shared
    // non-terminal prefix of the suffix tree.
    assert_eq!(tree.lookup("x"), Lookup::Prefix);
}

// ── 4. Lookup with a caller-supplied buffer ───────────────────────────────────

#[test]
fn buffered_lookup_matches_plain_lookup() {
    let tree = build_tree(&SHARED_SUFFIX_WORDS, &IngestOptions::default(), true);
    let mut buffer = [0u32; 32];
    for word in SHARED_SUFFIX_WORDS {
        let path: Vec<i32> = word.chars().map(|ch| ch as i32).collect();
        assert_eq!(
            tree.lookup_symbols_with_buffer(&path, &mut buffer),
            tree.lookup_symbols(&path),
            "{word}"
        );
    }
}
