//! In-memory model of one WireGuard interface configuration

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Keepalive applied to newly provisioned peers
pub const DEFAULT_KEEPALIVE: u16 = 30;

/// Default WireGuard listen port
pub const DEFAULT_PORT: u16 = 51820;

/// One `[Interface]` block plus its peers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDocument {
    /// Label comment text without the leading `#` (e.g. `Name = wg0`)
    pub label: Option<String>,
    /// Interface address in CIDR form (required)
    pub address: String,
    /// Listen port (0 = omitted)
    pub listen_port: u16,
    /// Base64 private key (required)
    pub private_key: String,
    /// DNS servers
    pub dns_servers: Vec<String>,
    /// Routing table name or id
    pub routing_table: Option<String>,
    /// MTU (<= 0 = omitted)
    pub mtu: i32,
    pub pre_up: Option<String>,
    pub post_up: Option<String>,
    pub pre_down: Option<String>,
    pub post_down: Option<String>,
    /// Peers in file order
    pub peers: Vec<PeerEntry>,
}

/// One `[Peer]` block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    /// Label comment text without the leading `#`
    pub label: Option<String>,
    /// Allowed IP ranges, in order, duplicates kept
    pub allowed_ips: Vec<String>,
    /// Endpoint as `host:port`
    pub endpoint: Option<String>,
    /// Base64 public key (required)
    pub public_key: String,
    /// Keepalive interval in seconds (0 = omitted)
    pub persistent_keepalive_seconds: u16,
}

impl InterfaceDocument {
    /// Create a document holding only the required fields
    pub fn new(address: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            private_key: private_key.into(),
            ..Default::default()
        }
    }

    /// Parse a configuration from text
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        super::parser::parse(content)
    }
}

impl FromStr for InterfaceDocument {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PeerEntry {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            ..Default::default()
        }
    }

    /// Name carried by the label line, if it follows the `Name = x` form
    pub fn name(&self) -> Option<&str> {
        self.label.as_deref().and_then(label_name)
    }
}

/// Build a label carrying a peer or interface name
pub fn label_for(name: &str) -> String {
    format!("Name = {}", name)
}

/// Extract `x` from a `Name = x` (or `# Name = x`) label
pub fn label_name(label: &str) -> Option<&str> {
    let rest = label.trim_start_matches('#').trim_start();
    let rest = rest.strip_prefix("Name")?;
    let value = rest.trim_start().strip_prefix(&['=', ':'][..])?;
    Some(value.trim())
}
