//! # Node Container
//!
//! Configuration for every part of the node, with file and environment
//! loading.

pub mod config;

pub use config::{
    load_config, ConfigError, HandshakeSettings, IdentityConfig, NetworkConfig, NodeConfig,
};
