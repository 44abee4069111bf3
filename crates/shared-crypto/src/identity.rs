//! Signing identity capability.
//!
//! The handshake only needs "sign this", "who am I" and "are these the same
//! key". Anything that can answer those can stand in for the local account
//! key, e.g. a hardware-backed signer.

use std::fmt;

use shared_types::{AccountAddress, Hash};

use crate::ecdsa::RecoverableSignature;
use crate::errors::CryptoError;
use crate::hashing::keccak256;

/// Curve tag of a signing identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// secp256k1 (Ethereum account keys)
    Secp256k1,
}

impl KeyType {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Secp256k1 => "secp256k1",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A private key able to produce recoverable signatures.
pub trait SigningIdentity: Send + Sync + fmt::Debug {
    /// Curve of the underlying key.
    fn key_type(&self) -> KeyType;

    /// Compressed SEC1 public key.
    fn public_key_bytes(&self) -> Vec<u8>;

    /// Account address derived from the public key.
    fn address(&self) -> AccountAddress;

    /// Sign a 32-byte digest as-is.
    fn sign_prehash(&self, digest: &Hash) -> Result<RecoverableSignature, CryptoError>;

    /// Sign `keccak256(message)`.
    fn sign(&self, message: &[u8]) -> Result<RecoverableSignature, CryptoError> {
        self.sign_prehash(&keccak256(message))
    }

    /// True when both identities hold the same private key.
    fn equals(&self, other: &Self) -> bool
    where
        Self: Sized;
}
