//! # Network
//!
//! Runs the libp2p swarm and drives the identity handshake over it.
//!
//! ```text
//! ConnectionEstablished (first connection to a peer)
//!     └──→ open stream ──→ HandshakeService::run_initiator
//!
//! Incoming stream on the handshake protocol
//!     └──→ HandshakeService::run_responder ──→ PeerAddressRegistry
//! ```
//!
//! Both sides initiate, so after one connection each node has verified the
//! other.

mod node;
mod swarm;

pub use node::{spawn, NodeEvent, NodeHandle, EVENT_BUFFER};
pub use swarm::{build_swarm, NodeBehaviour};

use shared_crypto::CryptoError;
use thiserror::Error;

use crate::container::ConfigError;

/// Node startup and control errors.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The account key could not be turned into a transport key.
    #[error("Invalid node key: {0}")]
    Key(#[from] CryptoError),

    /// Transport or swarm construction failed.
    #[error("Transport setup failed: {0}")]
    Transport(String),

    /// A listen address was rejected.
    #[error("Cannot listen on {addr}: {reason}")]
    Listen {
        /// Address as configured.
        addr: String,
        /// Why it failed.
        reason: String,
    },

    /// Another handler already accepts the protocol.
    #[error("Handshake protocol {0} already registered")]
    ProtocolRegistered(String),

    /// The node's background task has stopped.
    #[error("Node is not running")]
    Stopped,
}
