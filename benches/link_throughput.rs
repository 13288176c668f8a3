//! Benchmarks for address encoding and whole-book linking

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use eblink::{AddressEncoding, BlockAddress, BookAssembler, Position, ReferenceTable, BLOCK_SIZE};
use std::fs;
use tempfile::TempDir;

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("address_encode");

    for encoding in [AddressEncoding::Binary, AddressEncoding::Bcd] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", encoding)),
            &encoding,
            |b, &encoding| {
                b.iter(|| {
                    for pos in (0..1_000_000u64).step_by(997) {
                        black_box(encoding.encode(BlockAddress::from_position(black_box(pos))));
                    }
                });
            },
        );
    }

    group.finish();
}

/// A body with `refs` self references and a three level word index
fn prepare_book(refs: usize) -> (TempDir, BookAssembler) {
    let dir = TempDir::new().unwrap();
    let body = dir.path().join("body");
    fs::write(&body, vec![0u8; refs * 16]).unwrap();
    for level in 1..=3 {
        let len = (BLOCK_SIZE as usize) * level;
        fs::write(dir.path().join(format!("word.{}", level)), vec![0u8; len]).unwrap();
    }

    let mut table = ReferenceTable::new();
    for i in 0..refs {
        let name = format!("entry-{}", i);
        table.put_body_tag(name.clone(), Position::new(&body, (i * 16 + 8) as u64));
        table.put_body_ref(Position::new(&body, (i * 16) as u64), name);
    }
    let level1 = dir.path().join("word.1");
    for i in 0..refs.min(BLOCK_SIZE as usize / 4) {
        table.put_index_ref(Position::new(&level1, (i * 4) as u64), "1");
    }

    let mut book = BookAssembler::new(dir.path().join("honmon"));
    book.set_body_file(&body);
    book.set_word_file(dir.path().join("word"));
    book.set_reference_table(table);
    (dir, book)
}

fn benchmark_link(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_book");
    group.sample_size(20);

    for refs in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(refs), refs, |b, &refs| {
            b.iter_batched(
                || prepare_book(refs),
                |(dir, mut book)| {
                    book.link().unwrap();
                    black_box(book.report().resolved);
                    dir
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_link);
criterion_main!(benches);
