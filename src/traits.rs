use cosmian_crypto_core::{
    reexport::{rand_core::CryptoRngCore, zeroize::Zeroizing},
    SymmetricKey,
};

use crate::hybrid::AbeEncrypted;

/// Authenticated encryption of the payload of hybrid ciphertexts.
pub trait AE<const KEY_LENGTH: usize> {
    type Error: std::error::Error;

    /// Encrypts the given plaintext using the given key, binding the
    /// authentication tag to `ad`.
    fn encrypt(
        rng: &mut impl CryptoRngCore,
        key: &SymmetricKey<KEY_LENGTH>,
        ptx: &[u8],
        ad: &[u8],
    ) -> Result<Vec<u8>, Self::Error>;

    /// Decrypts the given ciphertext using the given key.
    ///
    /// # Error
    ///
    /// Returns an error if the integrity of the ciphertext or of `ad` could
    /// not be verified.
    fn decrypt(
        key: &SymmetricKey<KEY_LENGTH>,
        ctx: &[u8],
        ad: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, Self::Error>;
}

/// Decryption device under investigation by the tracing algorithm.
///
/// The device may hold any number of keys and may fail arbitrarily: any
/// answer other than the exact plaintext counts as a failure.
pub trait DecryptionBlackBox {
    fn decrypt(&self, ciphertext: &AbeEncrypted) -> Option<Vec<u8>>;
}
