//! This crate implements the traceable ciphertext-policy attribute-based
//! encryption scheme of Liu and Wong, which allows to:
//! - encrypt messages under a boolean or threshold policy over attributes;
//! - decrypt messages with any user key whose attributes satisfy the policy;
//! - revoke users at encryption time;
//! - trace the keys used to build a pirate decryption box.
//!
//! Users are laid out on an `m × m` grid fixed at setup. Attributes are
//! arbitrary strings hashed into the scalar field and need not be known at
//! setup.
//!
//! The `core` module exposes the scheme primitives, the `api` module a
//! `TraceableAbe` object owning a random number generator, and the `hybrid`
//! module the encryption of arbitrary data with AES-256-GCM.

mod ae;
mod error;

pub mod abe_policy;
pub mod access_structure;
pub mod api;
pub mod bilinear;
pub mod core;
pub mod hybrid;
pub mod traitor_tracing;
pub mod traits;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use error::{DecryptionError, Error};

pub use self::{
    api::TraceableAbe,
    core::{CipherText, PrivateKey, PublicKey, SecretMasterKey},
    hybrid::AbeEncrypted,
};
