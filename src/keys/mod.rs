//! Key-generation collaborators
//!
//! Provisioning never touches key material directly: it asks a [`KeyTool`]
//! for a fresh private key and for public keys derived from private keys.
//! Keys travel as base64 strings, exactly as they appear in config files.
//!
//! - [`WgTool`] shells out to `wg genkey` / `wg pubkey`
//! - [`NativeKeys`] computes X25519 keys in-process

mod wg;
mod x25519;

use async_trait::async_trait;

use crate::error::KeygenError;

pub use wg::{WgTool, DEFAULT_KEYGEN_TIMEOUT};
pub use x25519::NativeKeys;

/// Source of WireGuard key material
#[async_trait]
pub trait KeyTool: Send + Sync {
    /// Generate a new base64 private key
    async fn generate_key(&self) -> Result<String, KeygenError>;

    /// Derive the base64 public key for a base64 private key
    async fn derive_public_key(&self, private_key: &str) -> Result<String, KeygenError>;
}
