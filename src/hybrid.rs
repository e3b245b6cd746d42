//! Hybrid encryption of arbitrary data.
//!
//! The `GT` element encapsulated by an ABE ciphertext is hashed into an
//! AES-256-GCM key which encrypts the payload. The policy is authenticated
//! along with the payload.

use cosmian_crypto_core::{
    kdf256,
    reexport::{rand_core::CryptoRngCore, zeroize::Zeroizing},
    Aes256Gcm, FixedSizeCBytes, SymmetricKey,
};
use tracing::instrument;

use crate::{
    abe_policy::AccessPolicy,
    access_structure::AccessStructureKind,
    bilinear::{to_bytes, Gt, GT_LENGTH},
    core::{
        primitives::{self, DecryptionOptions},
        CipherText, PrivateKey, PublicKey,
    },
    traits::AE,
    Error,
};

/// Length of the symmetric key derived from the ABE secret.
pub const SYM_KEY_LENGTH: usize = Aes256Gcm::KEY_LENGTH;

const KEY_DERIVATION_INFO: &[u8] = b"traceable ABE symmetric key";

/// Derives the symmetric key encapsulated by an ABE ciphertext.
pub fn derive_key(secret: &Gt) -> Result<SymmetricKey<SYM_KEY_LENGTH>, Error> {
    let bytes = Zeroizing::new(to_bytes::<_, GT_LENGTH>(secret)?);
    let mut seed = Zeroizing::new([0; SYM_KEY_LENGTH]);
    kdf256!(&mut *seed, &*bytes, KEY_DERIVATION_INFO);
    Ok(SymmetricKey::try_from_slice(&*seed)?)
}

/// ABE ciphertext followed by the payload it protects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbeEncrypted {
    pub cipher_text: CipherText,
    pub data: Vec<u8>,
}

/// Encrypts `plaintext` for the users satisfying `policy`.
///
/// # Parameters
///
/// - `rng`             : random number generator
/// - `mpk`             : public key
/// - `policy`          : access policy
/// - `kind`            : access structure to build
/// - `revoked`         : slots that must not decrypt
/// - `encryptor_slot`  : first slot able to decrypt, `0` outside of tracing
/// - `plaintext`       : data to encrypt
#[instrument(level = "debug", skip_all, fields(len = plaintext.len()))]
pub fn encrypt_data(
    rng: &mut impl CryptoRngCore,
    mpk: &PublicKey,
    policy: &AccessPolicy,
    kind: AccessStructureKind,
    revoked: &[usize],
    encryptor_slot: usize,
    plaintext: &[u8],
) -> Result<AbeEncrypted, Error> {
    let (cipher_text, secret) =
        primitives::encrypt(rng, mpk, policy, kind, revoked, encryptor_slot)?;
    let key = derive_key(&secret)?;
    let data = <Aes256Gcm as AE<SYM_KEY_LENGTH>>::encrypt(
        rng,
        &key,
        plaintext,
        policy.to_string().as_bytes(),
    )?;
    Ok(AbeEncrypted { cipher_text, data })
}

/// Decrypts the payload of `encrypted`.
///
/// # Error
///
/// Besides the ABE decryption errors, fails on an authentication error,
/// which is how revoked keys and keys before the ciphertext cut show up.
#[instrument(level = "debug", skip_all)]
pub fn decrypt_data(
    usk: &PrivateKey,
    encrypted: &AbeEncrypted,
    options: &DecryptionOptions,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let secret = primitives::decrypt_with_options(usk, &encrypted.cipher_text, options)?;
    let key = derive_key(&secret)?;
    <Aes256Gcm as AE<SYM_KEY_LENGTH>>::decrypt(
        &key,
        &encrypted.data,
        encrypted.cipher_text.policy.to_string().as_bytes(),
    )
}
