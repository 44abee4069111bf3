//! Handshake error types.

use shared_crypto::CryptoError;
use shared_types::{AccountAddress, PeerIdentity};
use thiserror::Error;

/// Reasons a handshake message fails verification.
///
/// All variants are treated the same by the responder: close, log, no
/// registry change.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// Signature is not hex or not 65 bytes
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Recovery byte outside {0, 1, 27, 28}
    #[error("Invalid recovery byte: {0}")]
    InvalidRecoveryByte(u8),

    /// No public key could be recovered
    #[error("Public key recovery failed")]
    RecoveryFailed,

    /// Recovered signer differs from the claimed address (or the claim is unparseable)
    #[error("Address mismatch: claimed {claimed}, recovered {recovered}")]
    AddressMismatch {
        /// Address text as carried in the message
        claimed: String,
        /// Address the signature actually recovers to
        recovered: AccountAddress,
    },
}

/// Wire decoding/encoding failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Frame missing, truncated or over the size limit
    #[error("Invalid frame: {0}")]
    Frame(String),

    /// Stream ended before a frame arrived
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Frame body is not a handshake JSON object
    #[error("Invalid JSON: {0}")]
    Json(String),

    /// Nonce is not hex or too short
    #[error("Invalid nonce: {0}")]
    InvalidNonce(String),

    /// Encoded message would exceed the frame limit
    #[error("Message too large: {size} > {max}")]
    TooLarge {
        /// Encoded size in bytes
        size: usize,
        /// Configured limit in bytes
        max: usize,
    },
}

/// Outcome of a failed handshake session.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Message could not be decoded
    #[error("Malformed message: {0}")]
    MalformedMessage(#[from] CodecError),

    /// Message decoded but failed verification
    #[error("Verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// Signed peer id differs from the transport-reported peer
    #[error("Peer identity mismatch: message says {claimed}, transport says {transport}")]
    PeerIdentityMismatch {
        /// Peer id from the message
        claimed: String,
        /// Peer id reported by the transport
        transport: PeerIdentity,
    },

    /// Signature already accepted inside the replay window
    #[error("Replayed handshake")]
    Replayed,

    /// Stream I/O failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Handshake exceeded its deadline
    #[error("Handshake timed out")]
    TimedOut,

    /// Shutdown requested while the handshake was in flight
    #[error("Handshake cancelled")]
    Cancelled,

    /// Local key could not sign
    #[error("Signing failed: {0}")]
    Signing(#[from] CryptoError),
}

impl HandshakeError {
    /// Short label used for metrics and structured logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            HandshakeError::MalformedMessage(_) => "malformed",
            HandshakeError::Verification(_) => "rejected",
            HandshakeError::PeerIdentityMismatch { .. } => "peer_mismatch",
            HandshakeError::Replayed => "replayed",
            HandshakeError::Transport(_) => "transport_error",
            HandshakeError::TimedOut => "timed_out",
            HandshakeError::Cancelled => "cancelled",
            HandshakeError::Signing(_) => "signing_error",
        }
    }
}
