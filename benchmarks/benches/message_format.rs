//! Message Building Benchmarks
//!
//! Cost of the payload builders used to compose replies.
//!
//! Run with: cargo bench --bench message_format

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use obd::prelude::*;

fn empty() -> Message {
    Message::new(Address::BROADCAST, Address::BROADCAST)
}

fn bench_print_int(c: &mut Criterion) {
    let mut group = c.benchmark_group("print_int");

    for (label, format) in [
        ("decimal", Format::Decimal),
        ("hexadecimal", Format::Hexadecimal),
        ("binary", Format::Binary),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut message = empty();
                message.print_int(black_box(0xdead_beef_u64), format);
                message.print_int(black_box(-71i16), format);
                black_box(message)
            })
        });
    }

    group.finish();
}

fn bench_command_parsing(c: &mut Criterion) {
    let message = Message::command(
        Address::BROADCAST,
        Address::new(2),
        "clockpool   pool.ntp.org  fallback.example.org",
    );
    c.bench_function("command_params", |b| {
        b.iter(|| {
            let message = black_box(&message);
            black_box((message.base_command(), message.params()))
        })
    });
}

criterion_group!(benches, bench_print_int, bench_command_parsing);
criterion_main!(benches);
