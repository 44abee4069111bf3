//! # Identity-Binding Handshake (FM-01)
//!
//! Proves that a transport peer id is controlled by the holder of an EVM
//! account key.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): message format, signing payload, verifier,
//!   registry and replay window. No I/O.
//! - **Ports Layer** (`ports/`): what a handshake stream must provide
//! - **Service Layer** (`service.rs`): initiator and responder roles
//! - **Adapters** (`adapters/`): varint-framed JSON codec, libp2p glue
//!
//! ## Flow
//!
//! ```text
//! initiator                              responder
//!   create_handshake(key, peer, addr)
//!   write frame, close  ───────────────►  read frame
//!                                         verify -> recovered address
//!                                         peer id == transport peer?
//!                                         replay window
//!                                         registry.record(peer, address)
//!                                         close
//! ```
//!
//! ## Security Notes
//!
//! - The responder never mutates the registry before a message has been
//!   fully decoded and verified.
//! - Failed handshakes are silent to the remote side: the stream is closed.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::codec::{
    decode_message, encode_message, read_message, write_frame, write_message,
};
pub use adapters::libp2p::{keypair_from_identity, peer_identity_of, PeerStream};
pub use domain::config::{HandshakeConfig, DEFAULT_PROTOCOL, MIN_NONCE_LEN};
pub use domain::errors::{CodecError, HandshakeError, VerificationError};
pub use domain::message::{
    build_signing_payload, create_handshake, create_handshake_with_nonce, hash_for_signing,
    HandshakeMessage,
};
pub use domain::registry::PeerAddressRegistry;
pub use domain::replay::{ReplayWindow, DEFAULT_REPLAY_CAPACITY};
pub use domain::verifier::{decode_signature, verify};
pub use ports::HandshakeStream;
pub use service::{wait_for_shutdown, HandshakeRole, HandshakeService};
