//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Signature has the wrong number of bytes
    #[error("Invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength {
        /// Expected signature length in bytes
        expected: usize,
        /// Actual signature length in bytes
        actual: usize,
    },

    /// Recovery byte outside {0, 1, 27, 28}
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Signature does not verify against the key
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// No public key could be recovered from the signature
    #[error("Public key recovery failed")]
    RecoveryFailed,

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}
