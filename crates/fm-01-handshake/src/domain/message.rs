//! # Handshake Message
//!
//! Wire record and the canonical bytes it signs.
//!
//! ```text
//! payload = PeerID | "|" | FillerAddr | "|" | Nonce
//! digest  = keccak256("\x19Ethereum Signed Message:\n" || len(payload) || payload)
//! ```
//!
//! The digest is the EIP-191 personal-message hash, so a wallet's
//! `personal_sign` over the payload produces a valid signature.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use shared_crypto::{eth_message_hash, CryptoError, SigningIdentity};
use shared_types::{AccountAddress, Hash, PeerIdentity};

use super::config::MIN_NONCE_LEN;

/// Field separator inside the signing payload.
pub const PAYLOAD_SEPARATOR: u8 = b'|';

/// One handshake, as carried on the wire.
///
/// Fields stay in their text form so the verifier signs over exactly what
/// was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    /// Sender's transport peer id.
    #[serde(rename = "PeerID")]
    pub peer_identity: String,
    /// `0x`-prefixed account address the sender claims.
    #[serde(rename = "FillerAddr")]
    pub claimed_address: String,
    /// Hex nonce, fresh per attempt.
    #[serde(rename = "Nonce")]
    pub nonce: String,
    /// Hex `r || s || v` signature, optional `0x`.
    #[serde(rename = "Signature")]
    pub signature: String,
}

impl HandshakeMessage {
    /// Canonical payload of this message's signed fields.
    pub fn signing_payload(&self) -> Vec<u8> {
        build_signing_payload(&self.peer_identity, &self.claimed_address, &self.nonce)
    }
}

/// `peer_identity | claimed_address | nonce`.
pub fn build_signing_payload(peer_identity: &str, claimed_address: &str, nonce: &str) -> Vec<u8> {
    let mut payload =
        Vec::with_capacity(peer_identity.len() + claimed_address.len() + nonce.len() + 2);
    payload.extend_from_slice(peer_identity.as_bytes());
    payload.push(PAYLOAD_SEPARATOR);
    payload.extend_from_slice(claimed_address.as_bytes());
    payload.push(PAYLOAD_SEPARATOR);
    payload.extend_from_slice(nonce.as_bytes());
    payload
}

/// EIP-191 digest of a signing payload.
pub fn hash_for_signing(payload: &[u8]) -> Hash {
    eth_message_hash(payload)
}

/// Build and sign a handshake with a fresh random nonce.
///
/// `nonce_len` below `MIN_NONCE_LEN` is raised to the minimum.
pub fn create_handshake<I>(
    identity: &I,
    peer_identity: &PeerIdentity,
    claimed_address: &AccountAddress,
    nonce_len: usize,
) -> Result<HandshakeMessage, CryptoError>
where
    I: SigningIdentity + ?Sized,
{
    let mut nonce = vec![0u8; nonce_len.max(MIN_NONCE_LEN)];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    create_handshake_with_nonce(identity, peer_identity, claimed_address, &nonce)
}

/// Build and sign a handshake over a caller-chosen nonce.
pub fn create_handshake_with_nonce<I>(
    identity: &I,
    peer_identity: &PeerIdentity,
    claimed_address: &AccountAddress,
    nonce: &[u8],
) -> Result<HandshakeMessage, CryptoError>
where
    I: SigningIdentity + ?Sized,
{
    let peer_identity = peer_identity.as_str().to_string();
    let claimed_address = claimed_address.to_checksum_hex();
    let nonce = hex::encode(nonce);

    let payload = build_signing_payload(&peer_identity, &claimed_address, &nonce);
    let signature = identity.sign_prehash(&hash_for_signing(&payload))?;

    Ok(HandshakeMessage {
        peer_identity,
        claimed_address,
        nonce,
        signature: signature.to_hex(),
    })
}
