//! Handshake configuration.

use std::time::Duration;

use super::replay::DEFAULT_REPLAY_CAPACITY;

/// Default stream protocol for the handshake.
pub const DEFAULT_PROTOCOL: &str = "/gaslessOrder/handshake/1.0.0";

/// Shortest nonce, in bytes, that will be generated or accepted.
pub const MIN_NONCE_LEN: usize = 8;

/// Default maximum size of one encoded handshake frame.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024;

/// Handshake tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Stream protocol identifier.
    pub protocol: String,
    /// Random nonce length in bytes (clamped to at least `MIN_NONCE_LEN`).
    pub nonce_len: usize,
    /// Maximum frame payload in bytes.
    pub max_message_size: usize,
    /// Deadline for one whole handshake, open to close.
    pub io_timeout: Duration,
    /// Reject messages whose `PeerID` differs from the transport peer.
    pub require_peer_match: bool,
    /// How long an accepted signature is remembered. Zero disables the check.
    pub replay_window: Duration,
    /// Most signatures remembered before the window rotates early.
    pub replay_capacity: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_PROTOCOL.to_string(),
            nonce_len: MIN_NONCE_LEN,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            io_timeout: Duration::from_secs(10),
            require_peer_match: true,
            replay_window: Duration::from_secs(300),
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
        }
    }
}

impl HandshakeConfig {
    /// Nonce length actually used when generating.
    pub fn effective_nonce_len(&self) -> usize {
        self.nonce_len.max(MIN_NONCE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HandshakeConfig::default();
        assert_eq!(config.protocol, "/gaslessOrder/handshake/1.0.0");
        assert_eq!(config.nonce_len, 8);
        assert_eq!(config.max_message_size, 1024);
        assert!(config.require_peer_match);
        assert_eq!(config.replay_window, Duration::from_secs(300));
        assert_eq!(config.replay_capacity, 65_536);
    }

    #[test]
    fn test_nonce_len_is_clamped() {
        let config = HandshakeConfig {
            nonce_len: 2,
            ..Default::default()
        };
        assert_eq!(config.effective_nonce_len(), MIN_NONCE_LEN);

        let config = HandshakeConfig {
            nonce_len: 32,
            ..Default::default()
        };
        assert_eq!(config.effective_nonce_len(), 32);
    }
}
