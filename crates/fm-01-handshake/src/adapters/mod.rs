//! # Adapters
//!
//! - `codec`: unsigned-varint framed JSON on any `AsyncRead`/`AsyncWrite`
//! - `libp2p`: peer id and keypair conversion, stream wrapper

pub mod codec;
pub mod libp2p;
