// benches/build.rs — build and compression throughput.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use lztrie::compress::{CompressOptions, LzTrieCompressor};
use lztrie::tree::{source_from_tokens, BuildOptions, IngestOptions, TreeBuilder};

/// Inflected-vocabulary generator shared with the e2e suite: stems grouped
/// into paradigms with a fixed ending set.
fn corpus(stems: usize, paradigms: usize, endings: usize) -> Vec<String> {
    let mut state = 0x2545_f491u64;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };
    let ending_sets: Vec<Vec<String>> = (0..paradigms)
        .map(|p| (0..endings).map(|e| format!("a{p}x{e:02}")).collect())
        .collect();
    let mut words = Vec::new();
    for stem_index in 0..stems {
        let stem = format!("stem{stem_index:05}");
        for ending in &ending_sets[next() % ending_sets.len()] {
            words.push(format!("{stem}{ending}"));
        }
    }
    words
}

fn bench_layout(c: &mut Criterion) {
    let words = corpus(400, 6, 12);
    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    c.bench_function("layout_5k_words", |b| {
        b.iter(|| {
            let source = source_from_tokens(refs.iter().copied(), &IngestOptions::default());
            let builder = TreeBuilder::new(BuildOptions::default());
            black_box(builder.layout(source))
        })
    });
}

fn bench_compress(c: &mut Criterion) {
    let words = corpus(400, 6, 12);
    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    let builder = TreeBuilder::new(BuildOptions::default());

    c.bench_function("compress_5k_words", |b| {
        b.iter_batched(
            || builder.layout(source_from_tokens(refs.iter().copied(), &IngestOptions::default())),
            |fast| {
                let compressor = LzTrieCompressor::new(CompressOptions::default());
                black_box(compressor.compress(fast).unwrap())
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("compress_5k_words_parallel", |b| {
        b.iter_batched(
            || builder.layout(source_from_tokens(refs.iter().copied(), &IngestOptions::default())),
            |fast| {
                let compressor = LzTrieCompressor::new(CompressOptions {
                    parallel: true,
                    ..CompressOptions::default()
                });
                black_box(compressor.compress(fast).unwrap())
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_full_build(c: &mut Criterion) {
    let words = corpus(400, 6, 12);
    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    c.bench_function("build_5k_words_to_compact", |b| {
        b.iter(|| {
            let source = source_from_tokens(refs.iter().copied(), &IngestOptions::default());
            let builder = TreeBuilder::new(BuildOptions::default());
            black_box(builder.build(source).unwrap())
        })
    });
}

criterion_group!(benches, bench_layout, bench_compress, bench_full_build);
criterion_main!(benches);
