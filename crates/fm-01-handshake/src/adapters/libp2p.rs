//! libp2p glue: peer id and key conversions, and a stream wrapper that
//! carries the transport-authenticated remote peer.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{AsyncRead, AsyncWrite};
use libp2p::{identity, PeerId, Stream};
use shared_crypto::{CryptoError, Secp256k1Identity};
use shared_types::PeerIdentity;

use crate::ports::HandshakeStream;

/// String form of a libp2p peer id.
pub fn peer_identity_of(peer: &PeerId) -> PeerIdentity {
    PeerIdentity::new(peer.to_base58())
}

/// Reuse the account key as the libp2p node key.
///
/// The peer id is then derived from the same secp256k1 public key that
/// backs the account address.
pub fn keypair_from_identity(
    identity: &Secp256k1Identity,
) -> Result<identity::Keypair, CryptoError> {
    let mut secret = identity.secret_bytes();
    // try_from_bytes wipes the buffer it is given
    let secret_key = identity::secp256k1::SecretKey::try_from_bytes(&mut secret[..])
        .map_err(|_| CryptoError::InvalidPrivateKey)?;
    Ok(identity::Keypair::from(identity::secp256k1::Keypair::from(
        secret_key,
    )))
}

/// A stream plus the peer id the transport authenticated for it.
#[derive(Debug)]
pub struct PeerStream<S = Stream> {
    remote: PeerIdentity,
    io: S,
}

impl<S> PeerStream<S> {
    /// Bind `io` to `remote`.
    pub fn new(remote: PeerIdentity, io: S) -> Self {
        Self { remote, io }
    }

    /// Bind `io` to a libp2p peer.
    pub fn from_peer_id(peer: &PeerId, io: S) -> Self {
        Self::new(peer_identity_of(peer), io)
    }

    /// Give back the inner stream.
    pub fn into_inner(self) -> S {
        self.io
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for PeerStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for PeerStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_close(cx)
    }
}

impl<S> HandshakeStream for PeerStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn remote_peer(&self) -> &PeerIdentity {
        &self.remote
    }
}
