//! Address parsing and formatting benchmarks.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use netacl::{AddressFamily, NetworkAddress};

// ============================================================================
// Parse Benchmarks
// ============================================================================

fn bench_parse_literal(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_literal");

    let inputs = [
        ("v4", "192.168.100.200", AddressFamily::V4, 24),
        ("v6_compressed", "2001:db8::1", AddressFamily::V6, 64),
        (
            "v6_full",
            "2001:0db8:85a3:0000:0000:8a2e:0370:7334",
            AddressFamily::V6,
            64,
        ),
    ];

    for (name, text, family, prefix) in inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| {
                let net = NetworkAddress::parse(black_box(text), prefix, family);
                black_box(net)
            });
        });
    }

    group.finish();
}

fn bench_parse_cidr(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_cidr");

    for text in ["10.0.0.0/8", "2001:db8::/32", "fe80::1"] {
        group.bench_with_input(BenchmarkId::from_parameter(text), &text, |b, text| {
            b.iter(|| black_box(NetworkAddress::parse_cidr(black_box(text))));
        });
    }

    group.finish();
}

// ============================================================================
// Format Benchmarks
// ============================================================================

fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");

    let networks = [
        ("v4", "172.16.0.0/12"),
        ("v6_zero_run", "2001:db8::/32"),
        ("v6_no_run", "2001:db8:1:2:3:4:5:6/128"),
    ];

    for (name, text) in networks {
        let Ok(net) = NetworkAddress::parse_cidr(text) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &net, |b, net| {
            b.iter(|| black_box(black_box(net).to_string()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_literal, bench_parse_cidr, bench_format);
criterion_main!(benches);
