//! Error types of the traceable ABE scheme.

use std::num::TryFromIntError;

use cosmian_crypto_core::CryptoCoreError;
use thiserror::Error;

use crate::abe_policy;

/// Reasons a key fails to decrypt a ciphertext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("attributes do not satisfy policy")]
    UnsatisfiedPolicy,
    #[error("no LSSS solution found among {0} candidates")]
    NoLsssSolution(usize),
    #[error("missing key component for {0}")]
    MissingComponent(String),
    #[error("degenerate {0}")]
    DegenerateElement(&'static str),
    #[error("the key and the ciphertext do not share the same user grid")]
    PositionMismatch,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("setup error: {0}")]
    Setup(String),
    #[error("encryption error: {0}")]
    Encryption(String),
    #[error("decryption error: {0}")]
    Decryption(#[from] DecryptionError),
    #[error(transparent)]
    Parse(#[from] abe_policy::Error),
    #[error("key error: {0}")]
    Key(String),
    #[error("invalid size: {0}")]
    InvalidSize(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("conversion failed")]
    ConversionFailed,
    #[error("{0}")]
    CryptoCoreError(CryptoCoreError),
    #[error("json parsing error: {0}")]
    JsonParsing(String),
    #[error("{0}")]
    Other(String),
}

impl From<TryFromIntError> for Error {
    fn from(_e: TryFromIntError) -> Self {
        Self::ConversionFailed
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::JsonParsing(e.to_string())
    }
}

impl From<CryptoCoreError> for Error {
    fn from(e: CryptoCoreError) -> Self {
        Self::CryptoCoreError(e)
    }
}

impl From<ark_serialize::SerializationError> for Error {
    fn from(e: ark_serialize::SerializationError) -> Self {
        Self::Serialization(e.to_string())
    }
}
