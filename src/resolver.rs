//! Query answering against the current routing table.

use hickory_proto::rr::RecordType;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::trace;

use crate::state::SnapshotStore;

/// Result of a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Addresses for the name, in table order. Never empty.
    Found(Arc<[Ipv4Addr]>),
    /// The name has no entry.
    NotFound,
    /// The record type is not served; an empty, non-error result.
    Unsupported,
}

/// Answers A queries from the [`SnapshotStore`].
#[derive(Debug, Clone)]
pub struct Resolver {
    store: SnapshotStore,
}

impl Resolver {
    /// Create a resolver reading from the given store.
    pub fn new(store: SnapshotStore) -> Self {
        Self { store }
    }

    /// The store this resolver reads from.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Resolve a dot-terminated name.
    ///
    /// Only `A` is answered. The table is fetched once, so a concurrent
    /// replace never mixes two tables within one query.
    pub fn query(&self, name: &str, record_type: RecordType) -> QueryOutcome {
        if record_type != RecordType::A {
            trace!(name, rtype = ?record_type, "unsupported record type");
            return QueryOutcome::Unsupported;
        }

        let table = self.store.get();
        match table.lookup(name) {
            Some(ips) => QueryOutcome::Found(ips),
            None => QueryOutcome::NotFound,
        }
    }
}
