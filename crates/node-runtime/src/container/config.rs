//! # Node Configuration
//!
//! Unified configuration for the node runtime.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. TOML file named by `FM_CONFIG`
//! 3. Environment overrides (`FM_LISTEN_ADDR`, `FM_BOOTSTRAP_NODES`,
//!    `FM_KEYSTORE`, `FM_HANDSHAKE_PROTOCOL`)
//!
//! ## Config File Format
//!
//! ```toml
//! [network]
//! listen_addrs = ["/ip4/0.0.0.0/tcp/4001"]
//! bootstrap_nodes = ["/ip4/10.0.0.1/tcp/4001/p2p/16Uiu2HAm..."]
//! idle_connection_timeout_secs = 60
//! status_interval_secs = 30
//!
//! [identity]
//! keystore = "/var/lib/filler/keystore"
//! passphrase_file = "/run/secrets/filler-passphrase"
//!
//! [handshake]
//! protocol = "/gaslessOrder/handshake/1.0.0"
//! nonce_len = 8
//! max_message_size = 1024
//! io_timeout_secs = 10
//! require_peer_match = true
//! replay_window_secs = 300
//! replay_capacity = 65536
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fm_01_handshake::{HandshakeConfig, DEFAULT_PROTOCOL, MIN_NONCE_LEN};
use libp2p::Multiaddr;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "FM_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeConfig {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Where the account key comes from.
    pub identity: IdentityConfig,
    /// Handshake policy and limits.
    pub handshake: HandshakeSettings,
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Multiaddrs to listen on.
    pub listen_addrs: Vec<String>,
    /// Multiaddrs dialed at startup. Bad entries are logged and skipped.
    pub bootstrap_nodes: Vec<String>,
    /// Idle connection timeout in seconds.
    pub idle_connection_timeout_secs: u64,
    /// Interval of the periodic status log line, in seconds.
    pub status_interval_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addrs: vec!["/ip4/0.0.0.0/tcp/4001".to_string()],
            bootstrap_nodes: Vec::new(),
            idle_connection_timeout_secs: 60,
            status_interval_secs: 30,
        }
    }
}

/// Identity configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Encrypted V3 keystore file, or a directory holding one.
    pub keystore: Option<PathBuf>,
    /// File whose first line is the keystore passphrase. `FM_KEYSTORE_PASSPHRASE`
    /// takes precedence.
    pub passphrase_file: Option<PathBuf>,
}

/// Handshake configuration as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeSettings {
    /// Stream protocol identifier.
    pub protocol: String,
    /// Nonce length in bytes.
    pub nonce_len: usize,
    /// Maximum frame size in bytes.
    pub max_message_size: usize,
    /// Per-handshake deadline in seconds.
    pub io_timeout_secs: u64,
    /// Require the signed peer id to match the transport peer.
    pub require_peer_match: bool,
    /// Replay window in seconds (0 disables).
    pub replay_window_secs: u64,
    /// Most signatures remembered per replay window.
    pub replay_capacity: usize,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        let defaults = HandshakeConfig::default();
        Self {
            protocol: defaults.protocol,
            nonce_len: defaults.nonce_len,
            max_message_size: defaults.max_message_size,
            io_timeout_secs: defaults.io_timeout.as_secs(),
            require_peer_match: defaults.require_peer_match,
            replay_window_secs: defaults.replay_window.as_secs(),
            replay_capacity: defaults.replay_capacity,
        }
    }
}

impl HandshakeSettings {
    /// Convert to the handshake crate's config.
    pub fn to_handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            protocol: self.protocol.clone(),
            nonce_len: self.nonce_len,
            max_message_size: self.max_message_size,
            io_timeout: Duration::from_secs(self.io_timeout_secs),
            require_peer_match: self.require_peer_match,
            replay_window: Duration::from_secs(self.replay_window_secs),
            replay_capacity: self.replay_capacity,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parsing error.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A value is out of range or malformed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    network: NetworkFile,
    #[serde(default)]
    identity: IdentityFile,
    #[serde(default)]
    handshake: HandshakeFile,
}

#[derive(Debug, Deserialize, Default)]
struct NetworkFile {
    listen_addrs: Option<Vec<String>>,
    bootstrap_nodes: Option<Vec<String>>,
    idle_connection_timeout_secs: Option<u64>,
    status_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct IdentityFile {
    keystore: Option<PathBuf>,
    passphrase_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct HandshakeFile {
    protocol: Option<String>,
    nonce_len: Option<usize>,
    max_message_size: Option<usize>,
    io_timeout_secs: Option<u64>,
    require_peer_match: Option<bool>,
    replay_window_secs: Option<u64>,
    replay_capacity: Option<usize>,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string. Missing keys keep defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let net = NetworkConfig::default();
        let network = NetworkConfig {
            listen_addrs: file.network.listen_addrs.unwrap_or(net.listen_addrs),
            bootstrap_nodes: file.network.bootstrap_nodes.unwrap_or(net.bootstrap_nodes),
            idle_connection_timeout_secs: file
                .network
                .idle_connection_timeout_secs
                .unwrap_or(net.idle_connection_timeout_secs),
            status_interval_secs: file
                .network
                .status_interval_secs
                .unwrap_or(net.status_interval_secs),
        };

        let hs = HandshakeSettings::default();
        let handshake = HandshakeSettings {
            protocol: file.handshake.protocol.unwrap_or(hs.protocol),
            nonce_len: file.handshake.nonce_len.unwrap_or(hs.nonce_len),
            max_message_size: file.handshake.max_message_size.unwrap_or(hs.max_message_size),
            io_timeout_secs: file.handshake.io_timeout_secs.unwrap_or(hs.io_timeout_secs),
            require_peer_match: file
                .handshake
                .require_peer_match
                .unwrap_or(hs.require_peer_match),
            replay_window_secs: file
                .handshake
                .replay_window_secs
                .unwrap_or(hs.replay_window_secs),
            replay_capacity: file.handshake.replay_capacity.unwrap_or(hs.replay_capacity),
        };

        Ok(Self {
            network,
            identity: IdentityConfig {
                keystore: file.identity.keystore,
                passphrase_file: file.identity.passphrase_file,
            },
            handshake,
        })
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addrs) = lookup("FM_LISTEN_ADDR") {
            self.network.listen_addrs = split_list(&addrs);
        }
        if let Some(nodes) = lookup("FM_BOOTSTRAP_NODES") {
            self.network.bootstrap_nodes = split_list(&nodes);
        }
        if let Some(path) = lookup("FM_KEYSTORE") {
            self.identity.keystore = Some(PathBuf::from(path));
        }
        if let Some(protocol) = lookup("FM_HANDSHAKE_PROTOCOL") {
            self.handshake.protocol = protocol;
        }
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.listen_addrs.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one listen address is required".to_string(),
            ));
        }
        for addr in &self.network.listen_addrs {
            addr.parse::<Multiaddr>().map_err(|e| {
                ConfigError::Invalid(format!("listen address {:?}: {}", addr, e))
            })?;
        }
        if self.handshake.nonce_len < MIN_NONCE_LEN {
            return Err(ConfigError::Invalid(format!(
                "handshake.nonce_len must be at least {}",
                MIN_NONCE_LEN
            )));
        }
        if self.handshake.max_message_size == 0 {
            return Err(ConfigError::Invalid(
                "handshake.max_message_size must be positive".to_string(),
            ));
        }
        if !self.handshake.protocol.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "handshake.protocol must start with '/', got {:?} (default {})",
                self.handshake.protocol, DEFAULT_PROTOCOL
            )));
        }
        if self.handshake.io_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "handshake.io_timeout_secs must be positive".to_string(),
            ));
        }
        if self.handshake.replay_capacity == 0 {
            return Err(ConfigError::Invalid(
                "handshake.replay_capacity must be positive".to_string(),
            ));
        }
        if self.network.status_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "network.status_interval_secs must be positive".to_string(),
            ));
        }
        if self.network.idle_connection_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "network.idle_connection_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from `FM_CONFIG` (if set) and the environment, then
/// validate it.
pub fn load_config() -> Result<NodeConfig, ConfigError> {
    let mut config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => NodeConfig::load(path)?,
        Err(_) => NodeConfig::default(),
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
