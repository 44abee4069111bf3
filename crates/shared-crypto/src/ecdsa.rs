//! # ECDSA Signatures (secp256k1)
//!
//! Ethereum-style recoverable signatures over the secp256k1 curve.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization (EIP-2)
//! - Constant-time key comparison
//!
//! ## Wire Layout
//!
//! A recoverable signature is 65 bytes: `r (32) || s (32) || v (1)`, with
//! `v` in `{0, 1}`. Recovery also accepts the legacy `{27, 28}` form.

use std::fmt;

use k256::ecdsa::{
    signature::hazmat::PrehashVerifier, RecoveryId, Signature, SigningKey, VerifyingKey,
};
use shared_types::{AccountAddress, Hash};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::errors::CryptoError;
use crate::hashing::keccak256;
use crate::identity::{KeyType, SigningIdentity};

/// Length of a recoverable signature in bytes.
pub const SIGNATURE_LEN: usize = 65;

/// Map a recovery byte onto `{0, 1}`.
///
/// Accepts the raw form (0/1) and the legacy Ethereum form (27/28).
pub fn normalize_recovery_byte(v: u8) -> Result<u8, CryptoError> {
    match v {
        0 | 27 => Ok(0),
        1 | 28 => Ok(1),
        _ => Err(CryptoError::InvalidRecoveryId(v)),
    }
}

// =============================================================================
// RECOVERABLE SIGNATURE
// =============================================================================

/// 65-byte `r || s || v` signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Wrap raw bytes. No validation happens until recovery.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy from a slice that must be exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SIGNATURE_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidSignatureLength {
                    expected: SIGNATURE_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// The `r` scalar bytes.
    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    /// The `s` scalar bytes.
    pub fn s(&self) -> &[u8] {
        &self.0[32..64]
    }

    /// The recovery byte, as carried.
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Same `r || s` with a different recovery byte.
    pub fn with_v(mut self, v: u8) -> Self {
        self.0[64] = v;
        self
    }

    /// Lowercase hex without a `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature(0x{})", self.to_hex())
    }
}

// =============================================================================
// PUBLIC KEY / RECOVERY
// =============================================================================

/// secp256k1 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey(VerifyingKey);

impl Secp256k1PublicKey {
    /// Parse SEC1 bytes (compressed or uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Compressed SEC1 form (33 bytes).
    pub fn to_compressed(&self) -> [u8; 33] {
        let point = self.0.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Uncompressed SEC1 form (65 bytes, leading 0x04).
    pub fn to_uncompressed(&self) -> [u8; 65] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; 65];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Account address of this key.
    pub fn to_address(&self) -> AccountAddress {
        address_from_pubkey(self)
    }

    /// Verify a signature over `keccak256(message)`. The recovery byte is ignored.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &RecoverableSignature,
    ) -> Result<(), CryptoError> {
        let sig = Signature::from_slice(&signature.as_bytes()[..64])
            .map_err(|_| CryptoError::SignatureVerificationFailed)?;
        self.0
            .verify_prehash(&keccak256(message), &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Account address of a public key: the last 20 bytes of
/// `keccak256(uncompressed[1..])`.
pub fn address_from_pubkey(key: &Secp256k1PublicKey) -> AccountAddress {
    let uncompressed = key.to_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    AccountAddress::new(addr)
}

/// Recover the signer's address from a digest and a recoverable signature.
///
/// High-S signatures are folded into low-S form with the parity flipped, so
/// signers that skip EIP-2 normalization still recover to their own key.
pub fn recover_address(
    digest: &Hash,
    signature: &RecoverableSignature,
) -> Result<AccountAddress, CryptoError> {
    let v = normalize_recovery_byte(signature.v())?;

    let mut sig = Signature::from_slice(&signature.as_bytes()[..64])
        .map_err(|_| CryptoError::RecoveryFailed)?;
    let mut recovery_id =
        RecoveryId::from_byte(v).ok_or(CryptoError::InvalidRecoveryId(signature.v()))?;

    if let Some(low_s) = sig.normalize_s() {
        sig = low_s;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let recovered = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    Ok(address_from_pubkey(&Secp256k1PublicKey(recovered)))
}

// =============================================================================
// LOCAL IDENTITY
// =============================================================================

/// secp256k1 account key held in memory.
pub struct Secp256k1Identity {
    signing_key: SigningKey,
    public_key: Secp256k1PublicKey,
    address: AccountAddress,
}

impl Secp256k1Identity {
    /// Generate a random key.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Load from 32 secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Load from hex secret key text (64 digits, optional `0x`, surrounding
    /// whitespace ignored).
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        let digits = shared_types::strip_hex_prefix(text.trim());
        let bytes = Zeroizing::new(hex::decode(digits).map_err(|_| CryptoError::InvalidPrivateKey)?);
        Self::from_secret_bytes(&bytes)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = Secp256k1PublicKey(*signing_key.verifying_key());
        let address = address_from_pubkey(&public_key);
        Self {
            signing_key,
            public_key,
            address,
        }
    }

    /// The public half.
    pub fn public_key(&self) -> Secp256k1PublicKey {
        self.public_key
    }

    /// Secret key bytes, wiped on drop.
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing_key.to_bytes().into())
    }
}

impl SigningIdentity for Secp256k1Identity {
    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.to_compressed().to_vec()
    }

    fn address(&self) -> AccountAddress {
        self.address
    }

    fn sign_prehash(&self, digest: &Hash) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        // x-reduced ids cannot be expressed in a single 0/1 parity byte
        if recovery_id.is_x_reduced() {
            return Err(CryptoError::SigningFailed(
                "x-reduced recovery id".to_string(),
            ));
        }

        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(RecoverableSignature(bytes))
    }

    fn equals(&self, other: &Self) -> bool {
        let a = self.secret_bytes();
        let b = other.secret_bytes();
        a.as_slice().ct_eq(b.as_slice()).into()
    }
}

impl PartialEq for Secp256k1Identity {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Secp256k1Identity {}

impl fmt::Debug for Secp256k1Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1Identity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
