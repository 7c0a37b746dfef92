//! Configuration types for registry-dns.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::DnsError;
use crate::refresh::DEFAULT_REFRESH_INTERVAL;
use crate::response::DEFAULT_TTL;

/// Environment variable naming the registry document when none is configured.
pub const REGISTRY_SOURCE_ENV: &str = "REGISTRY_DNS_SOURCE";

/// Registry document used when neither config nor environment name one.
pub const DEFAULT_REGISTRY_SOURCE: &str = "service-entries.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    #[serde(default)]
    pub dns: DnsConfig,

    /// Registry configuration.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address to listen on (TCP, and UDP when enabled).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// TTL for A records in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Seconds between routing table rebuilds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Idle timeout for TCP connections in seconds.
    #[serde(default = "default_tcp_timeout_secs")]
    pub tcp_timeout_secs: u64,

    /// Also serve queries over UDP on `listen_addr`.
    #[serde(default = "default_udp")]
    pub udp: bool,
}

impl DnsConfig {
    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), DnsError> {
        if self.refresh_interval_secs == 0 {
            return Err(DnsError::Config(
                "dns.refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.tcp_timeout_secs == 0 {
            return Err(DnsError::Config(
                "dns.tcp_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval between routing table rebuilds.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Idle timeout for TCP connections.
    pub fn tcp_timeout(&self) -> Duration {
        Duration::from_secs(self.tcp_timeout_secs)
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            ttl: default_ttl(),
            refresh_interval_secs: default_refresh_interval_secs(),
            tcp_timeout_secs: default_tcp_timeout_secs(),
            udp: default_udp(),
        }
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the registry document. Falls back to `$REGISTRY_DNS_SOURCE`,
    /// then `service-entries.json`.
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Only serve entries from this namespace.
    #[serde(default)]
    pub namespace: Option<String>,
}

impl RegistryConfig {
    /// The registry document to read.
    pub fn resolved_source(&self) -> PathBuf {
        self.source
            .clone()
            .or_else(|| std::env::var_os(REGISTRY_SOURCE_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_SOURCE))
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "registry_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,

    /// OpenTelemetry configuration.
    #[serde(default)]
    pub opentelemetry: Option<OpenTelemetryConfig>,
}

/// OpenTelemetry exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTelemetryConfig {
    /// OTLP endpoint (e.g., "http://localhost:4317").
    pub endpoint: String,

    /// Service name for traces.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
            opentelemetry: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "registry-dns".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8053))
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_tcp_timeout_secs() -> u64 {
    30
}

fn default_udp() -> bool {
    true
}
