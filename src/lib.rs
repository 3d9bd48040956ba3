//! wgconf - WireGuard configuration management
//!
//! Reads and writes WireGuard interface configuration files and provisions
//! new peers, keeping the server's interface file and the peer's own
//! configuration consistent with each other.
//!
//! # Features
//!
//! - Strict, section-aware parsing of `[Interface]` / `[Peer]` files
//! - Deterministic serialization with required-field validation
//! - Peer provisioning with staged, ordered commits
//! - Key material from `wg genkey`/`wg pubkey` or in-process X25519
//!
//! # Usage
//!
//! ```no_run
//! use wgconf::{NativeKeys, PeerRequest, Provisioner, ProvisionerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provisioner = Provisioner::new(Box::new(NativeKeys), ProvisionerConfig::default());
//!     let mut request = PeerRequest::new("/etc/wireguard/wg0.conf", "10.0.0.2", "10.0.0.0/24");
//!     request.endpoint = Some("vpn.example.com:51820".to_string());
//!     let provisioned = provisioner.provision_peer(&request).await?;
//!     print!("{}", provisioned.peer_text);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod provision;

pub use config::{InterfaceDocument, PeerEntry};
pub use error::{KeygenError, ParseError, ProvisionError, ValidationError, WgConfError};
pub use keys::{KeyTool, NativeKeys, WgTool};
pub use provision::{
    CommitOrder, Initialized, InterfaceSpec, PeerDestination, PeerRequest, PeerSelector,
    Provisioned, Provisioner, ProvisionerConfig,
};
