//! DNS server setup and lifecycle management.

use hickory_server::authority::{AuthorityObject, Catalog};
use hickory_server::ServerFuture;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::authority::RegistryAuthority;
use crate::config::{Config, DnsConfig};
use crate::error::DnsError;
use crate::registry::{FileRegistry, Registry};
use crate::refresh::RefreshLoop;
use crate::resolver::Resolver;
use crate::state::SnapshotStore;

/// Build a catalog whose root zone is served by a [`RegistryAuthority`].
pub fn build_catalog(resolver: Resolver, ttl: u32) -> Catalog {
    let authority = RegistryAuthority::new(resolver, ttl);
    let origin = authority.origin().clone();
    let authority: Arc<dyn AuthorityObject> = Arc::new(authority);

    let mut catalog = Catalog::new();
    catalog.upsert(origin, vec![authority]);
    catalog
}

/// DNS server answering from a routing table rebuilt from the registry.
pub struct DnsServer {
    config: Config,
    registry: Option<Arc<dyn Registry>>,
    store: SnapshotStore,
}

impl DnsServer {
    /// Create a server that reads the registry document named in `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: None,
            store: SnapshotStore::new(),
        }
    }

    /// Create a server backed by an already connected registry.
    pub fn with_registry(config: Config, registry: Arc<dyn Registry>) -> Self {
        Self {
            config,
            registry: Some(registry),
            store: SnapshotStore::new(),
        }
    }

    /// Get a reference to the routing table store.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    async fn connect_registry(&self) -> Result<Arc<dyn Registry>, DnsError> {
        if let Some(ref registry) = self.registry {
            return Ok(registry.clone());
        }

        let source = self.config.registry.resolved_source();
        let namespace = self.config.registry.namespace.clone();
        let registry =
            tokio::task::spawn_blocking(move || FileRegistry::connect(source, namespace))
                .await??;
        Ok(Arc::new(registry))
    }

    /// Run the DNS server until `shutdown` is cancelled.
    ///
    /// Failing to reach the registry, to build the first table, or to bind
    /// the listeners is fatal.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), DnsError> {
        let dns: &DnsConfig = &self.config.dns;
        dns.validate()?;
        info!(
            listen_addr = %dns.listen_addr,
            refresh_interval = ?dns.refresh_interval(),
            "Starting registry-dns server"
        );

        let registry = self.connect_registry().await?;
        let refresh = RefreshLoop::new(registry.clone(), self.store.clone(), dns.refresh_interval());

        // Initial table before serving
        let report = match refresh.refresh_once().await {
            Ok(report) => report,
            Err(e) => {
                registry.stop();
                return Err(e);
            }
        };
        info!(
            entries = report.entries,
            patterns = report.patterns,
            "Initial routing table built"
        );

        let resolver = Resolver::new(self.store.clone());
        let mut server = ServerFuture::new(build_catalog(resolver, dns.ttl));

        let tcp_listener = match TcpListener::bind(dns.listen_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                registry.stop();
                return Err(e.into());
            }
        };
        info!(addr = %dns.listen_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, dns.tcp_timeout());

        if dns.udp {
            let udp_socket = match UdpSocket::bind(dns.listen_addr).await {
                Ok(socket) => socket,
                Err(e) => {
                    registry.stop();
                    return Err(e.into());
                }
            };
            info!(addr = %dns.listen_addr, "DNS UDP listening");
            server.register_socket(udp_socket);
        }

        let refresh_shutdown = shutdown.clone();
        let refresh_handle = tokio::spawn(refresh.run(refresh_shutdown));

        info!("DNS server ready to serve queries");

        let served = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("DNS server shutdown requested");
                Ok(())
            }
            result = server.block_until_done() => {
                if let Err(ref e) = result {
                    error!("DNS server error: {}", e);
                }
                shutdown.cancel();
                result.map_err(DnsError::from)
            }
        };

        info!("Waiting for refresh loop to stop...");
        if let Err(e) = refresh_handle.await {
            error!("Refresh loop task failed: {}", e);
        }

        info!("DNS server stopped");
        served
    }
}
