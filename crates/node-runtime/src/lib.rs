//! # Node Runtime Library
//!
//! Wires a Filler Mesh node together. The `main.rs` binary is a thin shell
//! over this library; integration tests drive it directly.
//!
//! ## Modules
//!
//! - `container/` - Configuration (defaults, TOML file, environment)
//! - `keystore` - Account key loading and key file generation
//! - `network/` - libp2p swarm and handshake task wiring
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry
//! 2. Load and validate configuration
//! 3. Load the account key (fatal if missing)
//! 4. Build the swarm from the same key, bind listeners, dial bootstrap peers
//! 5. Handshake with every connected peer until shutdown

#![warn(missing_docs)]

pub mod container;
pub mod keystore;
pub mod network;

pub use container::{load_config, ConfigError, NodeConfig};
pub use keystore::{generate_key_file, load_identity, load_local_identity, KeyError};
pub use network::{spawn, NodeError, NodeEvent, NodeHandle};
