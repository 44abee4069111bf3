//! # Ports
//!
//! The handshake needs one thing from the transport: a byte stream whose
//! remote peer id is known. Opening, accepting and multiplexing streams
//! stays on the transport side.

use futures::{AsyncRead, AsyncWrite};
use shared_types::PeerIdentity;

/// A bidirectional stream bound to a transport-authenticated remote peer.
pub trait HandshakeStream: AsyncRead + AsyncWrite + Unpin + Send {
    /// Peer id the transport reports for the other end.
    fn remote_peer(&self) -> &PeerIdentity;
}

impl<T: HandshakeStream + ?Sized> HandshakeStream for &mut T {
    fn remote_peer(&self) -> &PeerIdentity {
        (**self).remote_peer()
    }
}
