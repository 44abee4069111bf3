//! # Handshake Service
//!
//! Runs one side of a handshake over one stream.
//!
//! ## Responder
//!
//! 1. Read and decode one message
//! 2. Verify the signature against the claimed address
//! 3. Check the signed peer id against the transport peer (if enabled)
//! 4. Reject signatures already accepted inside the replay window
//! 5. Record `transport peer -> address`
//! 6. Close the stream, whatever happened
//!
//! ## Initiator
//!
//! Sign a fresh message, write it, close. No acknowledgement is awaited.
//!
//! Both roles are bounded by `io_timeout` and abort on shutdown. Timeouts
//! and cancellation never touch the registry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::AsyncWriteExt;
use shared_crypto::SigningIdentity;
use shared_types::{AccountAddress, PeerIdentity};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::adapters::codec::{encode_message, read_message, write_frame};
use crate::domain::config::HandshakeConfig;
use crate::domain::errors::HandshakeError;
use crate::domain::message::{create_handshake, HandshakeMessage};
use crate::domain::registry::PeerAddressRegistry;
use crate::domain::replay::ReplayWindow;
use crate::domain::verifier::{decode_signature, verify};
use crate::ports::HandshakeStream;

/// Which side of the handshake a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeRole {
    /// Opened the stream and sends the proof
    Initiator,
    /// Accepted the stream and verifies the proof
    Responder,
}

impl HandshakeRole {
    /// Lowercase name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandshakeRole::Initiator => "initiator",
            HandshakeRole::Responder => "responder",
        }
    }
}

impl fmt::Display for HandshakeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handshake orchestrator.
///
/// Holds the local key, the local transport identity and the shared
/// registry. One instance serves every stream of a node.
pub struct HandshakeService<I: SigningIdentity> {
    identity: Arc<I>,
    local_peer: PeerIdentity,
    registry: Arc<PeerAddressRegistry>,
    replay: ReplayWindow,
    config: HandshakeConfig,
    shutdown: watch::Receiver<bool>,
}

impl<I: SigningIdentity> HandshakeService<I> {
    /// Create a service.
    ///
    /// # Arguments
    /// * `identity` - local account key
    /// * `local_peer` - our transport peer id, signed into every message we send
    /// * `registry` - where verified peers are recorded
    /// * `config` - limits and policy
    /// * `shutdown` - flips to `true` to cancel in-flight handshakes
    pub fn new(
        identity: Arc<I>,
        local_peer: PeerIdentity,
        registry: Arc<PeerAddressRegistry>,
        config: HandshakeConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let replay = ReplayWindow::with_capacity(config.replay_window, config.replay_capacity);
        Self {
            identity,
            local_peer,
            registry,
            replay,
            config,
            shutdown,
        }
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<PeerAddressRegistry> {
        &self.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Our account address.
    pub fn local_address(&self) -> AccountAddress {
        self.identity.address()
    }

    /// Our transport peer id.
    pub fn local_peer(&self) -> &PeerIdentity {
        &self.local_peer
    }

    /// Address verified for `peer`, if any.
    pub fn lookup(&self, peer: &PeerIdentity) -> Option<AccountAddress> {
        self.registry.lookup(peer)
    }

    /// Accept one handshake on `stream` and record the sender on success.
    pub async fn run_responder<T: HandshakeStream>(
        &self,
        mut stream: T,
    ) -> Result<AccountAddress, HandshakeError> {
        let remote = stream.remote_peer().clone();
        debug!(peer = %remote, "Handshake stream accepted");

        let result = self.guarded(self.respond(&remote, &mut stream)).await;
        self.close(&mut stream).await;

        match &result {
            Ok(address) => info!(peer = %remote, %address, "Peer verified"),
            Err(error) => warn!(peer = %remote, %error, outcome = error.outcome(), "Handshake rejected"),
        }
        result
    }

    /// Send our signed proof on `stream`.
    pub async fn run_initiator<T: HandshakeStream>(
        &self,
        mut stream: T,
    ) -> Result<HandshakeMessage, HandshakeError> {
        let remote = stream.remote_peer().clone();
        debug!(peer = %remote, "Sending handshake");

        let result = self.guarded(self.initiate(&mut stream)).await;
        self.close(&mut stream).await;

        match &result {
            Ok(_) => debug!(peer = %remote, "Handshake sent"),
            Err(error) => warn!(peer = %remote, %error, outcome = error.outcome(), "Handshake send failed"),
        }
        result
    }

    async fn respond<T: HandshakeStream>(
        &self,
        remote: &PeerIdentity,
        stream: &mut T,
    ) -> Result<AccountAddress, HandshakeError> {
        let msg = read_message(stream, self.config.max_message_size).await?;
        let address = verify(&msg)?;

        if self.config.require_peer_match && msg.peer_identity != remote.as_str() {
            return Err(HandshakeError::PeerIdentityMismatch {
                claimed: msg.peer_identity,
                transport: remote.clone(),
            });
        }

        let signature = decode_signature(&msg.signature)?;
        if !self.replay.check_and_insert(&signature) {
            return Err(HandshakeError::Replayed);
        }

        if let Some(previous) = self.registry.record(remote.clone(), address) {
            if previous != address {
                info!(peer = %remote, %previous, %address, "Peer rebound to a new address");
            }
        }
        Ok(address)
    }

    async fn initiate<T: HandshakeStream>(
        &self,
        stream: &mut T,
    ) -> Result<HandshakeMessage, HandshakeError> {
        let msg = create_handshake(
            self.identity.as_ref(),
            &self.local_peer,
            &self.identity.address(),
            self.config.effective_nonce_len(),
        )?;
        let body = encode_message(&msg, self.config.max_message_size)?;

        write_frame(stream, body, self.config.max_message_size)
            .await
            .map_err(|e| HandshakeError::Transport(e.to_string()))?;
        stream
            .close()
            .await
            .map_err(|e| HandshakeError::Transport(e.to_string()))?;
        Ok(msg)
    }

    async fn guarded<T, F>(&self, fut: F) -> Result<T, HandshakeError>
    where
        F: Future<Output = Result<T, HandshakeError>>,
    {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return Err(HandshakeError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => Err(HandshakeError::Cancelled),
            res = tokio::time::timeout(self.config.io_timeout, fut) => match res {
                Ok(result) => result,
                Err(_) => Err(HandshakeError::TimedOut),
            },
        }
    }

    async fn close<T: HandshakeStream>(&self, stream: &mut T) {
        // Already closed after a successful send; a second close is a no-op.
        match tokio::time::timeout(self.config.io_timeout, stream.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => debug!(%error, "Stream close failed"),
            Err(_) => debug!("Stream close timed out"),
        }
    }
}

/// Resolves once the shutdown flag is set. Never resolves if the sender is gone.
///
/// Holds no borrow of the channel value once it returns, so it can sit in a
/// `select!` next to arms that need the rest of the caller's state.
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
