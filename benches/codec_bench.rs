//! Performance benchmarks for LineCodec and the line decoder.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench codec_bench
//! ```

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tictactoe_protocol::{Command, LineCodec, decode_composite, decode_line};
use tokio_util::codec::{Decoder, Encoder};

/// A reconnect line carrying a full board snapshot, the largest message kind.
fn reconnect_line() -> String {
    let cells: Vec<String> = (0..121).map(|i| (i % 3).to_string()).collect();
    format!("RECONNECT;opponent;{};1;", cells.join(","))
}

/// Benchmark encoding a move command.
fn bench_encode_move(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_move");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode_move_command", |b| {
        b.iter(|| {
            let mut codec = LineCodec::new();
            let mut buffer = BytesMut::new();
            codec
                .encode(black_box(Command::Move { row: 5, col: 7 }), &mut buffer)
                .unwrap();
            black_box(buffer);
        });
    });

    group.finish();
}

/// Benchmark decoding individual lines of increasing payload size.
fn bench_decode_lines(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_line");

    let reconnect = reconnect_line();
    let cases = [
        ("ping", "PING;".to_string()),
        ("turn", "OPPONENT_TURN;4;9;".to_string()),
        ("reconnect", reconnect),
    ];

    for (name, line) in cases.iter() {
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| black_box(decode_line(black_box(line))));
        });
    }

    group.finish();
}

/// Benchmark composite lines with duplicates.
fn bench_decode_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_composite");
    group.throughput(Throughput::Elements(1));

    let line = "STATUS;a;%STATUS;a;%STATUS;b;%PING;%YOUR_TURN;1;2;%ping;";

    group.bench_function("composite_with_duplicates", |b| {
        b.iter(|| black_box(decode_composite(black_box(line))));
    });

    group.finish();
}

/// Benchmark framing a batch of lines from one buffer.
fn bench_frame_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_batch");

    for count in [10usize, 100, 1000] {
        let mut wire = String::new();
        for i in 0..count {
            wire.push_str(&format!("OPPONENT_TURN;{};{};\n", i % 11, (i / 11) % 11));
        }

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &wire, |b, wire| {
            b.iter(|| {
                let mut codec = LineCodec::new();
                let mut buffer = BytesMut::from(wire.as_bytes());
                let mut lines = 0;
                while let Ok(Some(frame)) = codec.decode(&mut buffer) {
                    black_box(frame);
                    lines += 1;
                }
                assert_eq!(lines, count);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_move,
    bench_decode_lines,
    bench_decode_composite,
    bench_frame_batch
);
criterion_main!(benches);
