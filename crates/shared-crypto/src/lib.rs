//! # Shared Crypto - Account Key Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256, EIP-191 | Message digests |
//! | `ecdsa` | secp256k1 | Recoverable signatures, address recovery |
//! | `identity` | - | Signing identity capability used by the handshake |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization (EIP-2)
//! - Secret key bytes leave the key only inside `Zeroizing` buffers
//! - Key equality is constant-time

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod identity;

// Re-exports
pub use ecdsa::{
    address_from_pubkey, normalize_recovery_byte, recover_address, RecoverableSignature,
    Secp256k1Identity, Secp256k1PublicKey, SIGNATURE_LEN,
};
pub use errors::CryptoError;
pub use hashing::{eth_message_hash, keccak256, ETH_MESSAGE_PREFIX};
pub use identity::{KeyType, SigningIdentity};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
