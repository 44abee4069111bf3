//! # Shared Types Crate
//!
//! Identity types shared by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the text form of an [`AccountAddress`] is
//!   produced and parsed only here, so signer and verifier always agree.
//! - **Opaque Peers**: a [`PeerIdentity`] is whatever string the transport
//!   assigns; nothing in this crate derives one from key material.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
