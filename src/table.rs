//! Routing table: validated hostname patterns mapped to A-record addresses.
//!
//! A [`RoutingTable`] is built wholesale from one registry listing by
//! [`TableBuilder::build`] and never mutated afterwards. Keys are
//! [`HostPattern`]s:
//!
//! ```text
//! a.example.com      -> Exact("a.example.com.")
//! *.example.com      -> WildcardSuffix("example.com.")   (displayed ".example.com.")
//! ```
//!
//! Lookups try the exact name first, then strip leading labels one at a time
//! and try the remaining suffix as a wildcard, never going below
//! [`MIN_WILDCARD_LABELS`] labels.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

use crate::address;
use crate::entry::{ServiceEntry, WILDCARD_LABEL};

/// Smallest number of labels a wildcard suffix may have to be tried.
///
/// Keeps a wildcard such as `*.com` from answering for `example.com`.
pub const MIN_WILDCARD_LABELS: usize = 2;

/// Normalized table key derived from a hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostPattern {
    /// Dot-terminated, lowercase FQDN.
    Exact(String),
    /// Dot-terminated, lowercase suffix that follows the wildcard label.
    WildcardSuffix(String),
}

impl HostPattern {
    /// Derive the pattern for a configured hostname.
    pub fn from_host(host: &str) -> Self {
        let fqdn = to_fqdn(host);
        match fqdn.split_once('.') {
            Some((WILDCARD_LABEL, suffix)) if !suffix.is_empty() => {
                Self::WildcardSuffix(suffix.to_string())
            }
            _ => Self::Exact(fqdn),
        }
    }

    /// Whether this is a wildcard pattern.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::WildcardSuffix(_))
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::WildcardSuffix(suffix) => write!(f, ".{suffix}"),
        }
    }
}

/// Lowercase a name and make sure it ends with a dot.
pub fn to_fqdn(name: &str) -> String {
    let mut fqdn = name.to_ascii_lowercase();
    if !fqdn.ends_with('.') {
        fqdn.push('.');
    }
    fqdn
}

fn label_count(fqdn: &str) -> usize {
    let name = fqdn.trim_end_matches('.');
    if name.is_empty() {
        0
    } else {
        name.split('.').count()
    }
}

/// Immutable hostname pattern to address mapping.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: HashMap<HostPattern, Arc<[Ipv4Addr]>>,
}

impl RoutingTable {
    /// An empty table (nothing resolves).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Addresses stored under a pattern.
    pub fn get(&self, pattern: &HostPattern) -> Option<&Arc<[Ipv4Addr]>> {
        self.routes.get(pattern)
    }

    /// Match a query name: exact entry first, then wildcard suffixes from the
    /// longest down to [`MIN_WILDCARD_LABELS`] labels.
    pub fn lookup(&self, name: &str) -> Option<Arc<[Ipv4Addr]>> {
        let fqdn = to_fqdn(name);

        if let Some(ips) = self.routes.get(&HostPattern::Exact(fqdn.clone())) {
            return Some(ips.clone());
        }

        let mut rest = fqdn.as_str();
        while let Some((_, suffix)) = rest.split_once('.') {
            if label_count(suffix) < MIN_WILDCARD_LABELS {
                break;
            }
            let candidate = HostPattern::WildcardSuffix(suffix.to_string());
            if let Some(ips) = self.routes.get(&candidate) {
                return Some(ips.clone());
            }
            rest = suffix;
        }

        None
    }

    /// Number of patterns in the table.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no patterns.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate over all patterns and their addresses.
    pub fn iter(&self) -> impl Iterator<Item = (&HostPattern, &Arc<[Ipv4Addr]>)> {
        self.routes.iter()
    }
}

/// Counters describing one build pass, for logs and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Entries seen.
    pub entries: usize,
    /// Entries that contributed patterns.
    pub accepted: usize,
    /// Entries that failed schema validation.
    pub invalid: usize,
    /// Entries with caller-supplied addresses.
    pub externally_resolved: usize,
    /// Entries without a single usable address.
    pub no_addresses: usize,
    /// Patterns in the resulting table.
    pub patterns: usize,
}

/// Drop repeated addresses, keeping the first occurrence of each.
fn dedup_in_order(ips: &mut Vec<Ipv4Addr>) {
    let mut seen = HashSet::with_capacity(ips.len());
    ips.retain(|ip| seen.insert(*ip));
}

/// Builds a [`RoutingTable`] from registry entries.
#[derive(Debug, Default)]
pub struct TableBuilder {
    routes: HashMap<HostPattern, Arc<[Ipv4Addr]>>,
    report: BuildReport,
}

impl TableBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a full listing. Bad entries are skipped, never fatal.
    pub fn build<'a, I>(entries: I) -> (RoutingTable, BuildReport)
    where
        I: IntoIterator<Item = &'a ServiceEntry>,
    {
        let mut builder = Self::new();
        for entry in entries {
            builder.add(entry);
        }
        builder.finish()
    }

    /// Add one entry. Later entries overwrite earlier ones sharing a pattern.
    pub fn add(&mut self, entry: &ServiceEntry) {
        self.report.entries += 1;

        if let Err(e) = entry.validate() {
            debug!(
                name = %entry.name,
                namespace = %entry.namespace,
                reason = e.kind(),
                error = %e,
                "ignoring invalid service entry"
            );
            self.report.invalid += 1;
            return;
        }

        if entry.is_externally_resolved() {
            self.report.externally_resolved += 1;
            return;
        }

        let mut ips = address::to_hosts(&entry.addresses);
        dedup_in_order(&mut ips);
        let ips: Arc<[Ipv4Addr]> = ips.into();
        if ips.is_empty() {
            debug!(
                name = %entry.name,
                namespace = %entry.namespace,
                addresses = ?entry.addresses,
                "service entry has no usable addresses"
            );
            self.report.no_addresses += 1;
            return;
        }

        for host in &entry.hosts {
            self.routes.insert(HostPattern::from_host(host), ips.clone());
        }
        self.report.accepted += 1;
    }

    /// Count registry items that never decoded into an entry as invalid.
    pub fn add_undecodable(&mut self, count: usize) {
        self.report.entries += count;
        self.report.invalid += count;
    }

    /// Freeze the table.
    pub fn finish(mut self) -> (RoutingTable, BuildReport) {
        self.report.patterns = self.routes.len();
        (
            RoutingTable {
                routes: self.routes,
            },
            self.report,
        )
    }
}
