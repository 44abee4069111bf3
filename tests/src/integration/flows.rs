//! # Handshake Flows
//!
//! Two or more `HandshakeService`s wired back to back through in-memory
//! streams: whatever one node's initiator writes is delivered to another
//! node's responder, with the transport peer id set the way libp2p would
//! set it.
//!
//! ## Flows Tested:
//!
//! 1. **Mutual binding**: both sides initiate, both registries learn the other
//! 2. **Forgery**: a claim signed by the wrong key never reaches the registry
//! 3. **Theft**: a captured handshake replayed by another peer or resent later is refused
//! 4. **Concurrency**: many responders share one registry
//! 5. **Cancellation**: shutdown ends handshakes stuck on a silent peer

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use fm_01_handshake::{
        create_handshake_with_nonce, keypair_from_identity, peer_identity_of, write_message,
        HandshakeConfig, HandshakeError, HandshakeMessage, HandshakeService, PeerAddressRegistry,
        PeerStream, VerificationError,
    };
    use futures::io::Cursor;
    use futures::{AsyncRead, AsyncWrite};
    use shared_crypto::{Secp256k1Identity, SigningIdentity};
    use shared_types::{AccountAddress, PeerIdentity};
    use tokio::sync::watch;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct TestNode {
        peer: PeerIdentity,
        address: AccountAddress,
        service: Arc<HandshakeService<Secp256k1Identity>>,
    }

    fn test_node(config: HandshakeConfig, shutdown: &watch::Receiver<bool>) -> TestNode {
        let identity = Secp256k1Identity::generate();
        let peer_id = keypair_from_identity(&identity)
            .unwrap()
            .public()
            .to_peer_id();
        let peer = peer_identity_of(&peer_id);
        let address = identity.address();

        let service = HandshakeService::new(
            Arc::new(identity),
            peer.clone(),
            Arc::new(PeerAddressRegistry::new()),
            config,
            shutdown.clone(),
        );

        TestNode {
            peer,
            address,
            service: Arc::new(service),
        }
    }

    /// Run `from`'s initiator against `to` and return the bytes it wrote.
    async fn send(from: &TestNode, to: &TestNode) -> Vec<u8> {
        let mut stream = PeerStream::new(to.peer.clone(), Cursor::new(Vec::new()));
        from.service.run_initiator(&mut stream).await.unwrap();
        stream.into_inner().into_inner()
    }

    /// Hand `bytes` to `to`'s responder as if they arrived from `remote`.
    async fn deliver(
        bytes: Vec<u8>,
        remote: &PeerIdentity,
        to: &TestNode,
    ) -> Result<AccountAddress, HandshakeError> {
        to.service
            .run_responder(PeerStream::new(remote.clone(), Cursor::new(bytes)))
            .await
    }

    /// `msg` as it travels on the wire: varint length prefix, then JSON.
    async fn frame(msg: &HandshakeMessage) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_message(&mut cursor, msg, 1024).await.unwrap();
        cursor.into_inner()
    }

    /// A peer that never sends anything.
    struct Silent;

    impl AsyncRead for Silent {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut [u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Pending
        }
    }

    impl AsyncWrite for Silent {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    // =============================================================================
    // MUTUAL BINDING
    // =============================================================================

    #[tokio::test]
    async fn test_both_sides_learn_each_other() {
        let (_tx, rx) = watch::channel(false);
        let alice = test_node(HandshakeConfig::default(), &rx);
        let bob = test_node(HandshakeConfig::default(), &rx);

        let to_bob = send(&alice, &bob).await;
        let to_alice = send(&bob, &alice).await;

        assert_eq!(deliver(to_bob, &alice.peer, &bob).await.unwrap(), alice.address);
        assert_eq!(deliver(to_alice, &bob.peer, &alice).await.unwrap(), bob.address);

        assert_eq!(bob.service.lookup(&alice.peer), Some(alice.address));
        assert_eq!(alice.service.lookup(&bob.peer), Some(bob.address));
        assert_eq!(alice.service.registry().len(), 1);
        assert_eq!(bob.service.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_signed_peer_id_is_the_senders_own() {
        let (_tx, rx) = watch::channel(false);
        let alice = test_node(HandshakeConfig::default(), &rx);
        let bob = test_node(HandshakeConfig::default(), &rx);

        let mut stream = PeerStream::new(bob.peer.clone(), Cursor::new(Vec::new()));
        let msg = alice.service.run_initiator(&mut stream).await.unwrap();

        assert_eq!(msg.peer_identity, alice.peer.as_str());
        assert_eq!(msg.claimed_address, alice.address.to_checksum_hex());
    }

    // =============================================================================
    // FORGERY
    // =============================================================================

    #[tokio::test]
    async fn test_claiming_someone_elses_address_is_rejected() {
        let (_tx, rx) = watch::channel(false);
        let victim = test_node(HandshakeConfig::default(), &rx);
        let bob = test_node(HandshakeConfig::default(), &rx);

        let attacker = Secp256k1Identity::generate();
        let attacker_peer = PeerIdentity::from("16Uiu2HAmAttacker");
        let forged = create_handshake_with_nonce(
            &attacker,
            &attacker_peer,
            &victim.address,
            &[0x5a; 8],
        )
        .unwrap();
        let err = deliver(frame(&forged).await, &attacker_peer, &bob)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HandshakeError::Verification(VerificationError::AddressMismatch { .. })
        ));
        assert!(bob.service.registry().is_empty());
    }

    #[tokio::test]
    async fn test_unframed_json_is_malformed() {
        let (_tx, rx) = watch::channel(false);
        let alice = test_node(HandshakeConfig::default(), &rx);
        let bob = test_node(HandshakeConfig::default(), &rx);

        let msg = create_handshake_with_nonce(
            &Secp256k1Identity::generate(),
            &alice.peer,
            &alice.address,
            &[0x11; 8],
        )
        .unwrap();
        let body = fm_01_handshake::encode_message(&msg, 1024).unwrap().to_vec();

        let err = deliver(body, &alice.peer, &bob).await.unwrap_err();
        assert!(matches!(err, HandshakeError::MalformedMessage(_)));
        assert!(bob.service.registry().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected_before_parsing() {
        let (_tx, rx) = watch::channel(false);
        let bob = test_node(HandshakeConfig::default(), &rx);

        // varint(4096) followed by a body far over the 1024 byte limit
        let mut bytes = vec![0x80, 0x20];
        bytes.extend(std::iter::repeat(b'{').take(4096));

        let err = deliver(bytes, &PeerIdentity::from("16Uiu2HAmBig"), &bob)
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::MalformedMessage(_)));
        assert!(bob.service.registry().is_empty());
    }

    // =============================================================================
    // THEFT
    // =============================================================================

    #[tokio::test]
    async fn test_captured_handshake_cannot_be_reused() {
        let (_tx, rx) = watch::channel(false);
        let alice = test_node(HandshakeConfig::default(), &rx);
        let bob = test_node(HandshakeConfig::default(), &rx);
        let mallory = PeerIdentity::from("16Uiu2HAmMallory");

        let captured = send(&alice, &bob).await;

        // Relayed by another peer: the signed peer id gives it away.
        let err = deliver(captured.clone(), &mallory, &bob).await.unwrap_err();
        assert!(matches!(err, HandshakeError::PeerIdentityMismatch { .. }));
        assert_eq!(bob.service.lookup(&mallory), None);

        // The genuine delivery still goes through.
        assert_eq!(
            deliver(captured.clone(), &alice.peer, &bob).await.unwrap(),
            alice.address
        );

        // Sent again inside the window.
        let err = deliver(captured, &alice.peer, &bob).await.unwrap_err();
        assert!(matches!(err, HandshakeError::Replayed));
    }

    #[tokio::test]
    async fn test_relaxed_matching_binds_the_transport_peer() {
        let (_tx, rx) = watch::channel(false);
        let relaxed = HandshakeConfig {
            require_peer_match: false,
            ..Default::default()
        };
        let alice = test_node(HandshakeConfig::default(), &rx);
        let bob = test_node(relaxed, &rx);
        let relay = PeerIdentity::from("16Uiu2HAmRelay");

        let bytes = send(&alice, &bob).await;
        assert_eq!(deliver(bytes, &relay, &bob).await.unwrap(), alice.address);

        assert_eq!(bob.service.lookup(&relay), Some(alice.address));
        assert_eq!(bob.service.lookup(&alice.peer), None);
    }

    #[tokio::test]
    async fn test_fresh_handshake_rebinds_after_key_rotation() {
        let (_tx, rx) = watch::channel(false);
        let bob = test_node(HandshakeConfig::default(), &rx);
        let peer = PeerIdentity::from("16Uiu2HAmRotating");

        let old_key = Secp256k1Identity::generate();
        let new_key = Secp256k1Identity::generate();

        for key in [&old_key, &new_key] {
            let msg = create_handshake_with_nonce(key, &peer, &key.address(), &nonce_for(key))
                .unwrap();
            assert_eq!(
                deliver(frame(&msg).await, &peer, &bob).await.unwrap(),
                key.address()
            );
        }

        assert_eq!(bob.service.lookup(&peer), Some(new_key.address()));
        assert_eq!(bob.service.registry().len(), 1);
    }

    fn nonce_for(key: &Secp256k1Identity) -> Vec<u8> {
        key.address().as_bytes()[..8].to_vec()
    }

    // =============================================================================
    // CONCURRENCY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_responders_share_one_registry() {
        let (_tx, rx) = watch::channel(false);
        let bob = Arc::new(test_node(HandshakeConfig::default(), &rx));

        let mut senders = Vec::new();
        for _ in 0..32 {
            senders.push(test_node(HandshakeConfig::default(), &rx));
        }

        let mut tasks = Vec::new();
        for sender in &senders {
            let bytes = send(sender, &bob).await;
            let remote = sender.peer.clone();
            let bob = bob.clone();
            tasks.push(tokio::spawn(async move {
                deliver(bytes, &remote, &bob).await
            }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(bob.service.registry().len(), senders.len());
        for sender in &senders {
            assert_eq!(bob.service.lookup(&sender.peer), Some(sender.address));
        }
    }

    // =============================================================================
    // CANCELLATION
    // =============================================================================

    #[tokio::test]
    async fn test_shutdown_ends_stuck_handshakes() {
        let (tx, rx) = watch::channel(false);
        let config = HandshakeConfig {
            io_timeout: Duration::from_secs(60),
            ..Default::default()
        };
        let bob = Arc::new(test_node(config, &rx));

        let mut pending = Vec::new();
        for i in 0..4 {
            let bob = bob.clone();
            let remote = PeerIdentity::new(format!("16Uiu2HAmSilent{}", i));
            pending.push(tokio::spawn(async move {
                bob.service.run_responder(PeerStream::new(remote, Silent)).await
            }));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        for task in pending {
            let result = tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("responder did not observe shutdown")
                .unwrap();
            assert!(matches!(result, Err(HandshakeError::Cancelled)));
        }
        assert!(bob.service.registry().is_empty());
    }
}
