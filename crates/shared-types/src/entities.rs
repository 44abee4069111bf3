//! # Core Identity Entities
//!
//! ## Clusters
//!
//! - **Accounts**: `AccountAddress` (20-byte EVM address, EIP-55 text form)
//! - **Networking**: `PeerIdentity` (transport-assigned, opaque)

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::errors::TypeError;

/// A 32-byte Keccak-256 digest.
pub type Hash = [u8; 32];

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Strip an optional `0x` / `0X` prefix from a hex string.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

// =============================================================================
// ACCOUNT ADDRESS
// =============================================================================

/// Ethereum-style account address (last 20 bytes of keccak256(pubkey)).
///
/// Displayed in EIP-55 checksum form; parsed case-insensitively with or
/// without the `0x` prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountAddress([u8; ADDRESS_LEN]);

impl AccountAddress {
    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Parse a hex address.
    ///
    /// Accepts 40 hex digits in any case, optionally prefixed with `0x`.
    /// The checksum casing is not enforced.
    pub fn parse_hex(s: &str) -> Result<Self, TypeError> {
        let digits = strip_hex_prefix(s);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(TypeError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                actual: digits.len(),
            });
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_lower_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum encoding, `0x`-prefixed.
    pub fn to_checksum_hex(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl From<[u8; ADDRESS_LEN]> for AccountAddress {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for AccountAddress {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_checksum_hex())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum_hex())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex(&s).map_err(de::Error::custom)
    }
}

// =============================================================================
// PEER IDENTITY
// =============================================================================

/// Transport-assigned peer identifier, kept in its string form.
///
/// The handshake only compares and hashes these; it never builds one from a
/// public key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    /// Wrap a transport peer id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerIdentity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerIdentity({})", self.0)
    }
}
