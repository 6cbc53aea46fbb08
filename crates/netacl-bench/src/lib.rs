//! # netacl-bench: Performance benchmarks for netacl
//!
//! Deterministic workload generators and latency statistics shared by the
//! criterion benches.
//!
//! ## Benchmarks
//!
//! - **parse**: address and CIDR parsing, canonical formatting
//! - **tree**: rule insertion with reparenting, lookups against large lists,
//!   and per-lookup latency percentiles (`lookup_latency`, printed as JSON)
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p netacl-bench
//!
//! # Run specific benchmark
//! cargo bench -p netacl-bench --bench tree
//!
//! # Save baseline for comparison
//! cargo bench -p netacl-bench --bench tree -- --save-baseline main
//!
//! # Compare against baseline
//! cargo bench -p netacl-bench --bench tree -- --baseline main
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Instant;

use anyhow::{Context, Result};
use hdrhistogram::Histogram;
use netacl::{AccessList, AddressFamily, NetworkAddress, RuleRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded generator of rules and probe addresses.
///
/// The same seed always yields the same workload, so baselines compare.
#[derive(Debug)]
pub struct Workload {
    rng: StdRng,
}

impl Workload {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A random IPv4 network with a prefix in `min_prefix..=32`.
    pub fn v4_network(&mut self, min_prefix: u8) -> Result<NetworkAddress> {
        let bits = self.rng.gen_range(0..=u32::MAX);
        let prefix_len = self.rng.gen_range(min_prefix.min(32)..=32);
        Ok(NetworkAddress::new(
            AddressFamily::V4,
            u128::from(bits),
            prefix_len,
        )?)
    }

    /// A random IPv6 network with a prefix in `min_prefix..=128`.
    pub fn v6_network(&mut self, min_prefix: u8) -> Result<NetworkAddress> {
        let bits = self.rng.gen_range(0..=u128::MAX);
        let prefix_len = self.rng.gen_range(min_prefix.min(128)..=128);
        Ok(NetworkAddress::new(AddressFamily::V6, bits, prefix_len)?)
    }

    /// `count` rules drawn from both families, roughly three IPv4 to one IPv6.
    pub fn rules(&mut self, count: usize) -> Result<Vec<RuleRecord>> {
        (0..count)
            .map(|_| {
                let network = if self.rng.gen_range(0..4) == 0 {
                    self.v6_network(16)?
                } else {
                    self.v4_network(8)?
                };
                Ok(RuleRecord {
                    network,
                    policy: self.rng.gen_range(0..2) == 1,
                })
            })
            .collect()
    }

    pub fn v4_probe(&mut self) -> IpAddr {
        IpAddr::V4(Ipv4Addr::from(self.rng.gen_range(0..=u32::MAX)))
    }

    pub fn v6_probe(&mut self) -> IpAddr {
        IpAddr::V6(Ipv6Addr::from(self.rng.gen_range(0..=u128::MAX)))
    }

    /// Probe addresses as text, the form `check_access` receives.
    pub fn probe_literals(&mut self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                if i % 4 == 3 {
                    self.v6_probe().to_string()
                } else {
                    self.v4_probe().to_string()
                }
            })
            .collect()
    }

    /// A populated list with `rule_count` rules.
    pub fn access_list(&mut self, rule_count: usize) -> Result<AccessList> {
        let rules = self.rules(rule_count)?;
        AccessList::from_rules(false, rules)
            .map(AccessList::without_audit)
            .context("workload rules must insert cleanly")
    }
}

/// Tracks latency percentiles for operations.
#[derive(Debug)]
pub struct LatencyTracker {
    histogram: Histogram<u64>,
}

impl LatencyTracker {
    /// Creates a new latency tracker with 3 significant digits.
    pub fn new() -> Result<Self> {
        Ok(Self {
            histogram: Histogram::new(3).context("histogram configuration")?,
        })
    }

    /// Records a latency measurement in nanoseconds.
    pub fn record(&mut self, latency_ns: u64) {
        self.histogram.record(latency_ns).ok();
    }

    /// Times `op` and records its duration.
    pub fn time<T>(&mut self, op: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = op();
        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.record(elapsed);
        out
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn p50(&self) -> u64 {
        self.histogram.value_at_quantile(0.50)
    }

    pub fn p99(&self) -> u64 {
        self.histogram.value_at_quantile(0.99)
    }

    pub fn p999(&self) -> u64 {
        self.histogram.value_at_quantile(0.999)
    }

    pub fn max(&self) -> u64 {
        self.histogram.max()
    }

    pub fn mean(&self) -> f64 {
        self.histogram.mean()
    }

    /// Exports latency statistics as JSON for CI integration.
    pub fn to_json(&self, operation: &str) -> String {
        serde_json::json!({
            "operation": operation,
            "count": self.count(),
            "p50_ns": self.p50(),
            "p99_ns": self.p99(),
            "p999_ns": self.p999(),
            "max_ns": self.max(),
            "mean_ns": self.mean(),
        })
        .to_string()
    }
}
