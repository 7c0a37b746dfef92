//! Error types for registry-dns.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the DNS server.
#[derive(Debug, Error)]
pub enum DnsError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// DNS protocol error while building or encoding a response
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),

    /// Inbound query payload could not be parsed
    #[error("failed to decode DNS query: {0}")]
    Decode(#[source] hickory_proto::ProtoError),

    /// Registry collaborator error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A background task panicked or was cancelled
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors returned by a [`crate::registry::Registry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry source could not be read.
    #[error("failed to read registry source {}: {source}", path.display())]
    Io {
        /// Path of the registry document.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The registry document is not valid.
    #[error("failed to parse registry document {}: {source}", path.display())]
    Parse {
        /// Path of the registry document.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The registry was stopped and no longer serves listings.
    #[error("registry has been stopped")]
    Stopped,
}
