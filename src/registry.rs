//! Registry collaborators: the authoritative source of service entries.
//!
//! The refresh loop only needs a synchronous "list current entries" call and
//! a way to tell the registry to stop. [`FileRegistry`] reads a JSON document
//! from disk; [`StaticRegistry`] holds entries in memory for embedders and
//! tests.

use parking_lot::RwLock;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::entry::{ServiceEntry, DEFAULT_NAMESPACE};
use crate::error::RegistryError;

/// One listing of the registry.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Entries that decoded.
    pub entries: Vec<ServiceEntry>,
    /// Items that did not decode as a [`ServiceEntry`] and were skipped.
    pub rejected: usize,
}

/// Source of service entries.
pub trait Registry: Send + Sync {
    /// List every entry currently known to the registry.
    fn list_entries(&self) -> Result<Vec<ServiceEntry>, RegistryError>;

    /// List entries along with the number of items that could not be decoded.
    fn list(&self) -> Result<Listing, RegistryError> {
        Ok(Listing {
            entries: self.list_entries()?,
            rejected: 0,
        })
    }

    /// Stop watching the source. Later listings may fail with
    /// [`RegistryError::Stopped`].
    fn stop(&self) {}
}

/// In-memory registry whose entries can be swapped at any time.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    entries: RwLock<Vec<ServiceEntry>>,
    stopped: AtomicBool,
}

impl StaticRegistry {
    /// Create a registry holding the given entries.
    pub fn new(entries: Vec<ServiceEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            stopped: AtomicBool::new(false),
        }
    }

    /// Replace the listed entries.
    pub fn set_entries(&self, entries: Vec<ServiceEntry>) {
        *self.entries.write() = entries;
    }

    /// Whether [`Registry::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl Registry for StaticRegistry {
    fn list_entries(&self) -> Result<Vec<ServiceEntry>, RegistryError> {
        if self.is_stopped() {
            return Err(RegistryError::Stopped);
        }
        Ok(self.entries.read().clone())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// On-disk registry document. Items are decoded one at a time so a single
/// malformed item cannot hide the rest.
#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Registry backed by a JSON document of the form `{"items": [...]}`.
///
/// The document is re-read on every listing, so edits show up on the next
/// refresh.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    namespace: Option<String>,
    stopped: AtomicBool,
}

impl FileRegistry {
    /// Open the registry and read it once. Fails if the document cannot be
    /// read or parsed.
    pub fn connect(
        path: impl Into<PathBuf>,
        namespace: Option<String>,
    ) -> Result<Self, RegistryError> {
        let registry = Self {
            path: path.into(),
            namespace,
            stopped: AtomicBool::new(false),
        };

        let listing = registry.list()?;
        info!(
            path = %registry.path.display(),
            namespace = registry.namespace.as_deref().unwrap_or("*"),
            entries = listing.entries.len(),
            rejected = listing.rejected,
            "connected to registry"
        );

        Ok(registry)
    }

    /// Path of the registry document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<RegistryDocument, RegistryError> {
        let bytes = std::fs::read(&self.path).map_err(|source| RegistryError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| RegistryError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn watches(&self, namespace: &str) -> bool {
        self.namespace.as_deref().map_or(true, |watched| watched == namespace)
    }
}

impl Registry for FileRegistry {
    fn list_entries(&self) -> Result<Vec<ServiceEntry>, RegistryError> {
        Ok(self.list()?.entries)
    }

    fn list(&self) -> Result<Listing, RegistryError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(RegistryError::Stopped);
        }

        let mut listing = Listing::default();
        for item in self.read_document()?.items {
            // Items from other namespaces are skipped even when malformed.
            let namespace = item
                .get("namespace")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(DEFAULT_NAMESPACE)
                .to_string();
            if !self.watches(&namespace) {
                continue;
            }

            let name = item
                .get("name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string();
            match serde_json::from_value::<ServiceEntry>(item) {
                Ok(entry) => listing.entries.push(entry),
                Err(e) => {
                    debug!(
                        path = %self.path.display(),
                        name = %name,
                        namespace = %namespace,
                        error = %e,
                        "skipping undecodable registry item"
                    );
                    listing.rejected += 1;
                }
            }
        }

        debug!(
            path = %self.path.display(),
            entries = listing.entries.len(),
            rejected = listing.rejected,
            "listed registry entries"
        );
        Ok(listing)
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            info!(path = %self.path.display(), "registry stopped");
        }
    }
}
