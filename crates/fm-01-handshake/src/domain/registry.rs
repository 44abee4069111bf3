//! # Peer Address Registry
//!
//! Verified peer id -> account address. Insert on successful handshake only,
//! last verification wins, nothing expires on its own.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::{AccountAddress, PeerIdentity};

/// Thread-safe registry of verified peers.
#[derive(Debug, Default)]
pub struct PeerAddressRegistry {
    entries: RwLock<HashMap<PeerIdentity, AccountAddress>>,
}

impl PeerAddressRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous address, if any.
    pub fn record(&self, peer: PeerIdentity, address: AccountAddress) -> Option<AccountAddress> {
        self.entries.write().insert(peer, address)
    }

    /// Address bound to `peer`.
    pub fn lookup(&self, peer: &PeerIdentity) -> Option<AccountAddress> {
        self.entries.read().get(peer).copied()
    }

    /// Drop a binding.
    pub fn remove(&self, peer: &PeerIdentity) -> Option<AccountAddress> {
        self.entries.write().remove(peer)
    }

    /// Number of bound peers.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if no peer is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Consistent copy of every binding.
    pub fn snapshot(&self) -> HashMap<PeerIdentity, AccountAddress> {
        self.entries.read().clone()
    }
}
