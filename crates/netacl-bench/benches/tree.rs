//! Policy tree benchmarks.
//!
//! Measures rule insertion (including reparenting under broad rules) and
//! lookup latency as the rule count grows.

use std::hint::black_box;
use std::time::Instant;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use netacl::{AccessList, AddressFamily, NetworkAddress, PolicyTree};
use netacl_bench::{LatencyTracker, Workload};

const SEED: u64 = 0x00AC_1157;

// ============================================================================
// Insert Benchmarks
// ============================================================================

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for count in [100, 1_000, 10_000] {
        let Ok(rules) = Workload::new(SEED).rules(count) else {
            continue;
        };
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &rules, |b, rules| {
            b.iter(|| {
                let list = AccessList::from_rules(false, rules.iter().copied());
                black_box(list)
            });
        });
    }

    group.finish();
}

fn bench_insert_reparenting(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_reparenting");

    // /24 siblings that a single /8 then adopts
    for count in [16, 256, 4096] {
        let Ok(siblings) = (0..count)
            .map(|i: u32| {
                NetworkAddress::new(AddressFamily::V4, u128::from(0x0A00_0000 | (i << 8)), 24)
            })
            .collect::<Result<Vec<_>, _>>()
        else {
            continue;
        };
        let Ok(cover) = NetworkAddress::parse_cidr("10.0.0.0/8") else {
            continue;
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &siblings,
            |b, siblings| {
                b.iter_batched(
                    || {
                        let mut tree = PolicyTree::new(AddressFamily::V4, false);
                        for net in siblings {
                            tree.insert(*net, false).ok();
                        }
                        tree
                    },
                    |mut tree| black_box(tree.insert(cover, true)),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

// ============================================================================
// Lookup Benchmarks
// ============================================================================

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for count in [100, 1_000, 10_000] {
        let Ok(list) = Workload::new(SEED).access_list(count) else {
            continue;
        };
        let probes = Workload::new(SEED + 1).probe_literals(1_024);
        group.throughput(Throughput::Elements(probes.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &probes, |b, probes| {
            b.iter(|| {
                for probe in probes {
                    black_box(list.check_access(black_box(probe)).ok());
                }
            });
        });
    }

    group.finish();
}

fn bench_lookup_typed(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_typed");

    let Ok(list) = Workload::new(SEED).access_list(10_000) else {
        return;
    };
    let mut workload = Workload::new(SEED + 2);
    let probes: Vec<_> = (0..1_024).map(|_| workload.v4_probe()).collect();
    group.throughput(Throughput::Elements(probes.len() as u64));

    group.bench_function("v4_10000_rules", |b| {
        b.iter(|| {
            for probe in &probes {
                black_box(list.check_ip(black_box(*probe)).ok());
            }
        });
    });

    group.finish();
}

fn bench_lookup_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_latency");

    let list = Workload::new(SEED)
        .access_list(10_000)
        .expect("workload list");
    let probes = Workload::new(SEED + 3).probe_literals(4_096);

    group.bench_function("check_access_10000_rules", |b| {
        b.iter_custom(|iters| {
            let mut tracker = LatencyTracker::new().expect("histogram configuration");
            let start = Instant::now();

            for probe in probes.iter().cycle().take(iters as usize) {
                let allowed = tracker.time(|| list.check_access(black_box(probe)));
                black_box(allowed.ok());
            }

            let total = start.elapsed();

            // Per-lookup percentiles
            if iters >= 1000 {
                eprintln!("\n{}", tracker.to_json("check_access"));
            }
            total
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_insert_reparenting,
    bench_lookup,
    bench_lookup_typed,
    bench_lookup_latency
);
criterion_main!(benches);
