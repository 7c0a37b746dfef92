//! Service entries as published by the registry, and their schema validation.
//!
//! A [`ServiceEntry`] binds one or more hostnames to a set of virtual
//! addresses. Entries are consumed, never owned: the registry hands out fresh
//! copies on every listing and the table builder drops any entry that fails
//! [`ServiceEntry::validate`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;
use thiserror::Error;

/// Marker label for wildcard hostnames (`*.example.com`).
pub const WILDCARD_LABEL: &str = "*";

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

const PROTOCOLS: &[&str] = &[
    "HTTP", "HTTPS", "HTTP2", "GRPC", "TCP", "TLS", "MONGO", "REDIS", "MYSQL", "UDP",
];

/// How addresses for an entry's hosts are discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Resolution {
    /// The caller supplies the destination IP; no answer is synthesized.
    #[default]
    None,
    /// Endpoints are static IP addresses.
    Static,
    /// Endpoints are resolved through DNS.
    Dns,
}

/// Whether the service lives inside or outside the mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    /// Service is external to the mesh.
    #[default]
    MeshExternal,
    /// Service is part of the mesh.
    MeshInternal,
}

/// A port exposed by a service entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    /// Port number (1-65535).
    pub number: u32,
    /// Application protocol, e.g. `HTTP` or `TCP`.
    pub protocol: String,
    /// Port name, unique within the entry.
    pub name: String,
}

/// A backing endpoint of a service entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// IP address (static resolution) or hostname (DNS resolution).
    pub address: String,
}

/// A service entry read from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Entry name.
    pub name: String,
    /// Namespace the entry lives in.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Hostnames served by this entry; `*.foo.com` marks a wildcard.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Virtual addresses: literal IPs or single-host prefixes.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Exposed ports.
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    /// Mesh location.
    #[serde(default)]
    pub location: Location,
    /// Resolution mode.
    #[serde(default)]
    pub resolution: Resolution,
    /// Backing endpoints.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Namespace assumed for entries that do not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Reasons a service entry is rejected by [`ServiceEntry::validate`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The entry has no name.
    #[error("service entry has no name")]
    MissingName,

    /// The entry lists no hosts.
    #[error("service entry must have at least one host")]
    NoHosts,

    /// A hostname is not a valid (wildcard) domain.
    #[error("invalid host {host:?}: {reason}")]
    InvalidHost {
        /// Offending host.
        host: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The entry declares no ports.
    #[error("service entry must have at least one port")]
    NoPorts,

    /// A port number or name is invalid.
    #[error("invalid port {name:?} ({number})")]
    InvalidPort {
        /// Port name.
        name: String,
        /// Port number.
        number: u32,
    },

    /// Two ports share a name.
    #[error("duplicate port name {0:?}")]
    DuplicatePortName(String),

    /// A port declares an unknown protocol.
    #[error("unsupported protocol {0:?}")]
    InvalidProtocol(String),

    /// Endpoints were given for resolution `NONE`.
    #[error("endpoints must not be set when resolution is NONE")]
    UnexpectedEndpoints,

    /// An endpoint address does not fit the resolution mode.
    #[error("invalid endpoint address {address:?}: {reason}")]
    InvalidEndpoint {
        /// Offending endpoint address.
        address: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// DNS resolution without endpoints cannot resolve a wildcard host.
    #[error("wildcard host {0:?} requires endpoints when resolution is DNS")]
    WildcardWithoutEndpoints(String),
}

impl ValidationError {
    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingName => "missing_name",
            Self::NoHosts => "no_hosts",
            Self::InvalidHost { .. } => "invalid_host",
            Self::NoPorts => "no_ports",
            Self::InvalidPort { .. } => "invalid_port",
            Self::DuplicatePortName(_) => "duplicate_port_name",
            Self::InvalidProtocol(_) => "invalid_protocol",
            Self::UnexpectedEndpoints => "unexpected_endpoints",
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::WildcardWithoutEndpoints(_) => "wildcard_without_endpoints",
        }
    }
}

impl ServiceEntry {
    /// Check the entry against the registry schema. The first violation wins.
    ///
    /// Address tokens are deliberately not checked here; unusable ones are
    /// dropped during conversion instead.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        if self.hosts.is_empty() {
            return Err(ValidationError::NoHosts);
        }
        for host in &self.hosts {
            validate_domain(host, true).map_err(|reason| ValidationError::InvalidHost {
                host: host.clone(),
                reason,
            })?;
        }

        self.validate_ports()?;
        self.validate_endpoints()
    }

    /// Whether the caller supplies its own destination IP.
    pub fn is_externally_resolved(&self) -> bool {
        self.resolution == Resolution::None
    }

    fn validate_ports(&self) -> Result<(), ValidationError> {
        if self.ports.is_empty() {
            return Err(ValidationError::NoPorts);
        }

        let mut names = HashSet::with_capacity(self.ports.len());
        for port in &self.ports {
            if port.name.is_empty() || port.number == 0 || port.number > u16::MAX as u32 {
                return Err(ValidationError::InvalidPort {
                    name: port.name.clone(),
                    number: port.number,
                });
            }
            if !names.insert(port.name.as_str()) {
                return Err(ValidationError::DuplicatePortName(port.name.clone()));
            }
            if !PROTOCOLS
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&port.protocol))
            {
                return Err(ValidationError::InvalidProtocol(port.protocol.clone()));
            }
        }

        Ok(())
    }

    fn validate_endpoints(&self) -> Result<(), ValidationError> {
        match self.resolution {
            Resolution::None => {
                if !self.endpoints.is_empty() {
                    return Err(ValidationError::UnexpectedEndpoints);
                }
            }
            Resolution::Static => {
                if self.endpoints.is_empty() {
                    return Err(ValidationError::InvalidEndpoint {
                        address: String::new(),
                        reason: "static resolution requires at least one endpoint",
                    });
                }
                for endpoint in &self.endpoints {
                    if endpoint.address.parse::<IpAddr>().is_err() {
                        return Err(ValidationError::InvalidEndpoint {
                            address: endpoint.address.clone(),
                            reason: "static endpoints must be IP addresses",
                        });
                    }
                }
            }
            Resolution::Dns => {
                if self.endpoints.is_empty() {
                    if let Some(host) = self.hosts.iter().find(|h| is_wildcard_host(h)) {
                        return Err(ValidationError::WildcardWithoutEndpoints(host.clone()));
                    }
                }
                for endpoint in &self.endpoints {
                    validate_domain(&endpoint.address, false).map_err(|reason| {
                        ValidationError::InvalidEndpoint {
                            address: endpoint.address.clone(),
                            reason,
                        }
                    })?;
                }
            }
        }

        Ok(())
    }
}

/// Whether a hostname carries the wildcard marker as its first label.
pub fn is_wildcard_host(host: &str) -> bool {
    host.split('.').next() == Some(WILDCARD_LABEL)
}

/// Validate a domain name, optionally allowing a leading `*` label.
fn validate_domain(domain: &str, allow_wildcard: bool) -> Result<(), &'static str> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() {
        return Err("empty domain");
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err("domain name too long");
    }

    let mut labels = domain.split('.');
    let mut count = 0usize;

    if allow_wildcard && is_wildcard_host(domain) {
        labels.next();
        count += 1;
        if domain == WILDCARD_LABEL {
            return Err("bare wildcard is not allowed");
        }
    }

    for label in labels {
        validate_label(label)?;
        count += 1;
    }

    if count < 2 {
        return Err("domain must have at least two labels");
    }

    Ok(())
}

fn validate_label(label: &str) -> Result<(), &'static str> {
    if label.is_empty() {
        return Err("empty label");
    }
    if label.len() > MAX_LABEL_LEN {
        return Err("label longer than 63 characters");
    }
    if label.contains('*') {
        return Err("wildcard is only allowed as the whole first label");
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err("label must not start or end with '-'");
    }
    if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err("label contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_entry(hosts: &[&str], addresses: &[&str]) -> ServiceEntry {
        ServiceEntry {
            name: "external-svc".to_string(),
            namespace: "default".to_string(),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
            ports: vec![ServicePort {
                number: 443,
                protocol: "HTTPS".to_string(),
                name: "https".to_string(),
            }],
            location: Location::MeshExternal,
            resolution: Resolution::Static,
            endpoints: vec![Endpoint {
                address: "10.1.1.1".to_string(),
            }],
        }
    }

    #[test]
    fn test_valid_entry_passes() {
        let entry = make_entry(&["a.example.com", "*.example.org"], &["10.0.0.1"]);
        assert_eq!(entry.validate(), Ok(()));
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut entry = make_entry(&["a.example.com"], &["10.0.0.1"]);
        entry.name.clear();
        assert_eq!(entry.validate(), Err(ValidationError::MissingName));
    }

    #[test]
    fn test_no_hosts_rejected() {
        let entry = make_entry(&[], &["10.0.0.1"]);
        assert_eq!(entry.validate(), Err(ValidationError::NoHosts));
    }

    #[test]
    fn test_bad_wildcards_rejected() {
        for host in ["*", "**.example.com", "api.*.example.com", "a*.example.com", "example.*"] {
            let entry = make_entry(&[host], &["10.0.0.1"]);
            assert!(
                matches!(entry.validate(), Err(ValidationError::InvalidHost { .. })),
                "{host} should be rejected"
            );
        }
    }

    #[test]
    fn test_single_label_host_rejected() {
        let entry = make_entry(&["localhost"], &["10.0.0.1"]);
        assert!(matches!(
            entry.validate(),
            Err(ValidationError::InvalidHost { .. })
        ));
    }

    #[test]
    fn test_trailing_dot_host_accepted() {
        let entry = make_entry(&["a.example.com."], &["10.0.0.1"]);
        assert_eq!(entry.validate(), Ok(()));
    }

    #[test]
    fn test_ports_required_and_unique() {
        let mut entry = make_entry(&["a.example.com"], &["10.0.0.1"]);
        entry.ports.clear();
        assert_eq!(entry.validate(), Err(ValidationError::NoPorts));

        let mut entry = make_entry(&["a.example.com"], &["10.0.0.1"]);
        entry.ports.push(entry.ports[0].clone());
        assert_eq!(
            entry.validate(),
            Err(ValidationError::DuplicatePortName("https".to_string()))
        );

        let mut entry = make_entry(&["a.example.com"], &["10.0.0.1"]);
        entry.ports[0].number = 70000;
        assert!(matches!(
            entry.validate(),
            Err(ValidationError::InvalidPort { number: 70000, .. })
        ));

        let mut entry = make_entry(&["a.example.com"], &["10.0.0.1"]);
        entry.ports[0].protocol = "carrier-pigeon".to_string();
        assert!(matches!(
            entry.validate(),
            Err(ValidationError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_protocol_case_insensitive() {
        let mut entry = make_entry(&["a.example.com"], &["10.0.0.1"]);
        entry.ports[0].protocol = "grpc".to_string();
        assert_eq!(entry.validate(), Ok(()));
    }

    #[test]
    fn test_resolution_none_forbids_endpoints() {
        let mut entry = make_entry(&["a.example.com"], &["10.0.0.1"]);
        entry.resolution = Resolution::None;
        assert_eq!(entry.validate(), Err(ValidationError::UnexpectedEndpoints));

        entry.endpoints.clear();
        assert_eq!(entry.validate(), Ok(()));
        assert!(entry.is_externally_resolved());
    }

    #[test]
    fn test_static_requires_ip_endpoints() {
        let mut entry = make_entry(&["a.example.com"], &["10.0.0.1"]);
        entry.endpoints[0].address = "backend.example.com".to_string();
        assert!(matches!(
            entry.validate(),
            Err(ValidationError::InvalidEndpoint { .. })
        ));

        entry.endpoints.clear();
        assert!(matches!(
            entry.validate(),
            Err(ValidationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_dns_wildcard_needs_endpoints() {
        let mut entry = make_entry(&["*.example.com"], &["10.0.0.1"]);
        entry.resolution = Resolution::Dns;
        entry.endpoints.clear();
        assert_eq!(
            entry.validate(),
            Err(ValidationError::WildcardWithoutEndpoints(
                "*.example.com".to_string()
            ))
        );

        entry.endpoints.push(Endpoint {
            address: "upstream.example.net".to_string(),
        });
        assert_eq!(entry.validate(), Ok(()));
    }

    #[test]
    fn test_deserialize_from_registry_json() {
        let json = r#"{
            "name": "httpbin",
            "namespace": "egress",
            "hosts": ["httpbin.org"],
            "addresses": ["10.0.0.5/32"],
            "ports": [{"number": 80, "protocol": "HTTP", "name": "http"}],
            "resolution": "DNS"
        }"#;
        let entry: ServiceEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.namespace, "egress");
        assert_eq!(entry.resolution, Resolution::Dns);
        assert_eq!(entry.location, Location::MeshExternal);
        assert!(entry.endpoints.is_empty());
        assert_eq!(entry.validate(), Ok(()));
    }
}
