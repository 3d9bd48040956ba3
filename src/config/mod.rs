//! Configuration model for WireGuard
//!
//! This module parses and writes standard WireGuard `.conf` files made of one
//! `[Interface]` section followed by `[Peer]` sections.

mod document;
mod parser;
mod writer;

pub use document::{label_for, label_name, InterfaceDocument, PeerEntry, DEFAULT_KEEPALIVE, DEFAULT_PORT};
pub use writer::{ALLOWED_IPS_JOIN, DNS_JOIN};
