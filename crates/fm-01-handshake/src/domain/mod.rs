//! # Domain Layer
//!
//! Pure handshake logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod config;
pub mod errors;
pub mod message;
pub mod registry;
pub mod replay;
pub mod verifier;
