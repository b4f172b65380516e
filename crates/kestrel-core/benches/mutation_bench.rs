//! # Kernel Benchmarks
//!
//! Throughput of the mutation operators and the log header codec.
//!
//! Run with: `cargo bench -p kestrel-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kestrel_core::{
    Database, ExecutionContext, Expression, KernelConfig, LogFormat, LogHeader, MutationOperation,
    QueryState, SetNodeProperty, SetNodePropertiesFromMap, StoreId, Value, encode_log_header,
    read_log_header,
};
use std::hint::black_box;
use std::io::Cursor;

fn map_of(size: usize) -> Expression {
    Expression::map((0..size).map(|i| (format!("key{i}"), Expression::literal(i as i64))))
}

fn bench_set_property(c: &mut Criterion) {
    let db = Database::new(&KernelConfig::default());
    let tx = db.begin();
    let node = tx.create_node(&[]).expect("create");
    let mut state = QueryState::new(&tx);
    let mut row = ExecutionContext::new().with("n", Value::Node(node));
    let op = SetNodeProperty::new("n", "counter", Expression::literal(1i64));

    c.bench_function("set_node_property", |b| {
        b.iter(|| black_box(op.apply(&mut row, &mut state).expect("apply")));
    });
}

fn bench_set_from_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_node_properties_from_map");

    for size in [4, 16, 64] {
        let db = Database::new(&KernelConfig::default());
        let tx = db.begin();
        let node = tx.create_node(&[]).expect("create");
        let mut state = QueryState::new(&tx);
        let mut row = ExecutionContext::new().with("n", Value::Node(node));
        let op = SetNodePropertiesFromMap::new("n", map_of(size), true);

        group.bench_with_input(BenchmarkId::new("replace", size), &size, |b, _| {
            b.iter(|| black_box(op.apply(&mut row, &mut state).expect("apply")));
        });
    }

    group.finish();
}

fn bench_header_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_log_header");
    let store_id = StoreId::new(1, 2, "record", "standard", 5, 0).expect("store id");

    for format in [LogFormat::Compact, LogFormat::Extended, LogFormat::StoreBound] {
        let header = LogHeader::new(
            format,
            7,
            1_000,
            format.has_store_id().then(|| store_id.clone()),
        );
        let bytes = encode_log_header(&header).expect("encode").freeze();

        group.bench_with_input(BenchmarkId::from_parameter(format!("{format:?}")), &bytes, |b, bytes| {
            b.iter(|| {
                let mut cursor = Cursor::new(bytes.as_ref());
                black_box(read_log_header(&mut cursor, true, None).expect("read"))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_set_property, bench_set_from_map, bench_header_decode);
criterion_main!(benches);
