//! registry-dns binary entry point.

use clap::Parser;
use registry_dns::{telemetry, Config, DnsServer};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Authoritative A-record DNS server backed by a service registry.
#[derive(Parser, Debug)]
#[command(name = "registry-dns")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML). Optional.
    #[arg(short, long, default_value = "registry-dns.toml")]
    config: PathBuf,

    /// Path to the registry document (overrides `registry.source`).
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Only serve entries from this namespace (overrides `registry.namespace`).
    #[arg(long)]
    namespace: Option<String>,
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn watch_signals(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
    token.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let mut config: Config = config::Config::builder()
        .add_source(config::File::from(args.config.clone()).required(false))
        .add_source(
            config::Environment::with_prefix("REGISTRY_DNS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    if let Some(source) = args.registry {
        config.registry.source = Some(source);
    }
    if let Some(namespace) = args.namespace {
        config.registry.namespace = Some(namespace);
    }

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        listen_addr = %config.dns.listen_addr,
        registry = %config.registry.resolved_source().display(),
        namespace = config.registry.namespace.as_deref().unwrap_or("*"),
        "Starting registry-dns"
    );

    // Setup graceful shutdown
    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    // Run DNS server
    let server = DnsServer::new(config);
    let result = server.run(shutdown).await;

    // Shutdown telemetry
    telemetry::shutdown();

    if let Err(e) = result {
        error!("DNS server error: {}", e);
        return Err(e.into());
    }

    info!("registry-dns shutdown complete");
    Ok(())
}
