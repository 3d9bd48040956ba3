//! In-process X25519 key generation
//!
//! Produces the same base64 strings as `wg genkey` / `wg pubkey`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::KeygenError;

use super::KeyTool;

/// Key length for X25519 (both private and public keys are 32 bytes)
pub const KEY_LEN: usize = 32;

/// X25519 keys computed locally, no external tool required
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeKeys;

impl NativeKeys {
    /// Generate a new private key
    pub fn generate(&self) -> String {
        let secret = StaticSecret::random_from_rng(OsRng);
        BASE64.encode(secret.to_bytes())
    }

    /// Derive public key from a base64 private key
    pub fn derive(&self, private_key: &str) -> Result<String, KeygenError> {
        let secret = StaticSecret::from(decode_key(private_key)?);
        Ok(BASE64.encode(PublicKey::from(&secret).to_bytes()))
    }
}

#[async_trait]
impl KeyTool for NativeKeys {
    async fn generate_key(&self) -> Result<String, KeygenError> {
        Ok(self.generate())
    }

    async fn derive_public_key(&self, private_key: &str) -> Result<String, KeygenError> {
        self.derive(private_key)
    }
}

/// Decode a base64-encoded 32-byte key
fn decode_key(value: &str) -> Result<[u8; KEY_LEN], KeygenError> {
    let bytes = BASE64.decode(value.trim()).map_err(|_| KeygenError::InvalidKey)?;
    bytes.try_into().map_err(|_| KeygenError::InvalidKey)
}
