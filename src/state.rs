//! Current routing table, published atomically to concurrent readers.
//!
//! The refresh loop is the only writer. Every [`SnapshotStore::replace`]
//! installs a wholly new table; readers get an `Arc` to whichever table was
//! current when they called [`SnapshotStore::get`] and keep using it even if a
//! replacement lands a moment later.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::metrics;
use crate::table::RoutingTable;

/// Thread-safe holder of the current [`RoutingTable`].
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    inner: Arc<SnapshotStoreInner>,
}

#[derive(Debug)]
struct SnapshotStoreInner {
    current: ArcSwap<RoutingTable>,
    /// Incremented on every replace.
    generation: AtomicU64,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Create a store holding an empty table.
    pub fn new() -> Self {
        Self::with_table(RoutingTable::empty())
    }

    /// Create a store holding the given table.
    pub fn with_table(table: RoutingTable) -> Self {
        Self {
            inner: Arc::new(SnapshotStoreInner {
                current: ArcSwap::from_pointee(table),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Install a new table, superseding the previous one. Returns the new generation.
    pub fn replace(&self, table: RoutingTable) -> u64 {
        let patterns = table.len();
        self.inner.current.store(Arc::new(table));
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;

        debug!(generation, patterns, "installed routing table");
        metrics::record_table(patterns, generation);
        generation
    }

    /// The table current at call time.
    pub fn get(&self) -> Arc<RoutingTable> {
        self.inner.current.load_full()
    }

    /// Number of replacements so far.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::tests::make_entry;
    use crate::table::TableBuilder;

    fn table_for(host: &str, addr: &str) -> RoutingTable {
        TableBuilder::build(&[make_entry(&[host], &[addr])]).0
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = SnapshotStore::new();
        assert!(store.get().is_empty());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_replace_supersedes_previous() {
        let store = SnapshotStore::new();
        store.replace(table_for("a.example.com", "10.0.0.1"));
        assert!(store.get().lookup("a.example.com.").is_some());

        let generation = store.replace(table_for("b.example.com", "10.0.0.2"));
        assert_eq!(generation, 2);

        let current = store.get();
        assert!(current.lookup("a.example.com.").is_none());
        assert!(current.lookup("b.example.com.").is_some());
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let store = SnapshotStore::new();
        store.replace(table_for("a.example.com", "10.0.0.1"));

        let snapshot = store.get();
        store.replace(RoutingTable::empty());

        assert!(snapshot.lookup("a.example.com.").is_some());
        assert!(store.get().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SnapshotStore::new();
        let reader = store.clone();
        store.replace(table_for("a.example.com", "10.0.0.1"));
        assert_eq!(reader.generation(), 1);
        assert_eq!(reader.get().len(), 1);
    }
}
