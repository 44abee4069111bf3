//! # Error Types
//!
//! Parsing errors for the shared identity types.

use thiserror::Error;

/// Errors raised while decoding shared types from their text form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Input is not valid hexadecimal.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded value has the wrong number of hex digits.
    #[error("Invalid length: expected {expected} hex chars, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
