//! Metrics instrumentation for registry-dns.
//!
//! All metrics are prefixed with `registry_dns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

use crate::table::BuildReport;

/// Record a DNS query.
pub fn record_query(record_type: &str, result: QueryResult, duration: std::time::Duration) {
    let result_str = match result {
        QueryResult::Found => "found",
        QueryResult::NxDomain => "nxdomain",
        QueryResult::Unsupported => "unsupported",
        QueryResult::DecodeError => "decode_error",
    };

    counter!("registry_dns.query.count", "type" => record_type.to_string(), "result" => result_str)
        .increment(1);
    histogram!("registry_dns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryResult {
    /// Query returned records.
    Found,
    /// Name not in the routing table.
    NxDomain,
    /// Record type not served.
    Unsupported,
    /// Payload could not be decoded.
    DecodeError,
}

/// Record IPs returned for a successful A lookup.
pub fn record_a_ips_returned(count: usize) {
    histogram!("registry_dns.query.a.ips_returned").record(count as f64);
}

/// Record the outcome of one refresh cycle.
pub fn record_refresh(result: RefreshResult, duration: std::time::Duration) {
    let result_str = match result {
        RefreshResult::Ok => "ok",
        RefreshResult::Error => "error",
    };

    counter!("registry_dns.refresh.count", "result" => result_str).increment(1);
    histogram!("registry_dns.refresh.duration.seconds").record(duration.as_secs_f64());
}

/// Refresh outcome for metrics.
#[derive(Debug, Clone, Copy)]
pub enum RefreshResult {
    /// A new table was installed.
    Ok,
    /// Listing the registry failed; the old table stays.
    Error,
}

/// Record per-outcome entry counts of the last build.
pub fn record_build(report: &BuildReport) {
    gauge!("registry_dns.build.entries", "outcome" => "accepted").set(report.accepted as f64);
    gauge!("registry_dns.build.entries", "outcome" => "invalid").set(report.invalid as f64);
    gauge!("registry_dns.build.entries", "outcome" => "externally_resolved")
        .set(report.externally_resolved as f64);
    gauge!("registry_dns.build.entries", "outcome" => "no_addresses")
        .set(report.no_addresses as f64);
}

/// Record the installed table's size and generation.
pub fn record_table(patterns: usize, generation: u64) {
    gauge!("registry_dns.table.patterns").set(patterns as f64);
    gauge!("registry_dns.table.generation").set(generation as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
