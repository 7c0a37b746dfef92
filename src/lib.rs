//! Registry DNS - An authoritative A-record DNS server backed by a service registry.
//!
//! This crate answers address lookups for logical service names. The mapping
//! from hostnames to addresses is rebuilt from an external registry on a fixed
//! period and swapped in atomically, so every query sees one complete table.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          registry-dns                             │
//! │                                                                   │
//! │  ┌──────────────┐  every 5s  ┌──────────────┐   replace()         │
//! │  │   Registry   │──────────▶│ TableBuilder │────────────┐        │
//! │  │ (list/stop)  │  entries   └──────────────┘            ▼        │
//! │  └──────────────┘                               ┌───────────────┐ │
//! │                                                 │ SnapshotStore │ │
//! │                                                 └───────┬───────┘ │
//! │                                                         │ get()   │
//! │  ┌──────────────────┐      ┌──────────────┐             │         │
//! │  │ Hickory Catalog  │─────▶│   Resolver   │◀────────────┘         │
//! │  │ / PacketHandler  │      └──────────────┘                       │
//! │  └──────────────────┘◀── TCP/UDP :8053                            │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Resolution
//!
//! ```text
//! api.eu.example.com.
//!   → exact entry "api.eu.example.com."?
//!   → wildcard "*.eu.example.com"?
//!   → wildcard "*.example.com"?
//!   → stop (never try "*.com")
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use registry_dns::{Config, DnsServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = Config::default();
//!     config.registry.source = Some("service-entries.json".into());
//!
//!     let shutdown = CancellationToken::new();
//!     let server = DnsServer::new(config);
//!     server.run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod address;
pub mod authority;
pub mod config;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod packet;
pub mod refresh;
pub mod registry;
pub mod resolver;
pub mod response;
pub mod server;
pub mod state;
pub mod table;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DnsConfig, RegistryConfig, TelemetryConfig};
pub use entry::{Resolution, ServiceEntry, ValidationError};
pub use error::{DnsError, RegistryError};
pub use packet::PacketHandler;
pub use refresh::RefreshLoop;
pub use registry::{FileRegistry, Listing, Registry, StaticRegistry};
pub use resolver::{QueryOutcome, Resolver};
pub use server::DnsServer;
pub use state::SnapshotStore;
pub use table::{HostPattern, RoutingTable, TableBuilder};
