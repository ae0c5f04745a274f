//! Error types for the payload decode pipeline

use thiserror::Error;

/// A payload could not be turned into a JSON object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("value is not a string")]
    NotString,

    #[error("value is not plausible base64")]
    NotBase64,

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("JSON payload is not an object")]
    NotObject,
}

/// An envelope could not be opened (or sealed).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("envelope is not valid base64")]
    Envelope,

    /// Envelope must carry the IV plus at least one byte of ciphertext
    #[error("envelope too short: {0} bytes")]
    TooShort(usize),

    #[error("invalid key or IV length")]
    KeyLength,

    #[error("decryption failed (wrong key or bad padding)")]
    Padding,

    #[error("random IV unavailable: {0}")]
    Rng(String),
}
