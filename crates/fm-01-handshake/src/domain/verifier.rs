//! # Handshake Verifier
//!
//! Recovers the signer of a handshake and checks it against the claimed
//! address. Pure and deterministic.

use shared_crypto::{recover_address, CryptoError, RecoverableSignature};
use shared_types::{strip_hex_prefix, AccountAddress};

use super::errors::VerificationError;
use super::message::{hash_for_signing, HandshakeMessage};

/// Parse the hex signature field (optional `0x`, any case, 65 bytes).
pub fn decode_signature(text: &str) -> Result<RecoverableSignature, VerificationError> {
    let raw = hex::decode(strip_hex_prefix(text))
        .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
    RecoverableSignature::from_slice(&raw)
        .map_err(|e| VerificationError::MalformedSignature(e.to_string()))
}

/// Verify a handshake and return the address that signed it.
pub fn verify(msg: &HandshakeMessage) -> Result<AccountAddress, VerificationError> {
    let signature = decode_signature(&msg.signature)?;

    let digest = hash_for_signing(&msg.signing_payload());

    let recovered = recover_address(&digest, &signature).map_err(|e| match e {
        CryptoError::InvalidRecoveryId(v) => VerificationError::InvalidRecoveryByte(v),
        _ => VerificationError::RecoveryFailed,
    })?;

    // An unparseable claim can never match.
    match AccountAddress::parse_hex(&msg.claimed_address) {
        Ok(claimed) if claimed == recovered => Ok(recovered),
        _ => Err(VerificationError::AddressMismatch {
            claimed: msg.claimed_address.clone(),
            recovered,
        }),
    }
}
