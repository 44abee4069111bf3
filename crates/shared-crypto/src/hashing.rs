//! # Keccak-256 Hashing
//!
//! Ethereum's hash function and the EIP-191 "personal message" digest used
//! by wallet-style signing.

use sha3::{Digest, Keccak256};
use shared_types::Hash;

/// Prefix for EIP-191 version `0x45` messages.
pub const ETH_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// One-shot Keccak-256.
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// EIP-191 personal-message digest.
///
/// `keccak256("\x19Ethereum Signed Message:\n" || len(payload) || payload)`
/// where the length is written in ASCII decimal.
pub fn eth_message_hash(payload: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(ETH_MESSAGE_PREFIX.as_bytes());
    hasher.update(payload.len().to_string().as_bytes());
    hasher.update(payload);
    hasher.finalize().into()
}
