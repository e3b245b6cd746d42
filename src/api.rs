use std::sync::{Mutex, MutexGuard};

use cosmian_crypto_core::{reexport::rand_core::SeedableRng, CsRng};
use zeroize::Zeroizing;

use crate::{
    abe_policy::AccessPolicy,
    access_structure::AccessStructureKind,
    bilinear::{Gt, Scalar},
    core::{
        primitives::{self, DecryptionOptions},
        AttributeComponent, CipherText, PrivateKey, PublicKey, SecretMasterKey, SlotAllocator,
    },
    hybrid::{self, AbeEncrypted},
    traitor_tracing::{self, TracingParameters},
    traits::DecryptionBlackBox,
    Error,
};

/// Entry point of the traceable ABE scheme.
///
/// It owns the random number generator used by every operation.
#[derive(Debug)]
pub struct TraceableAbe {
    rng: Mutex<CsRng>,
}

impl Default for TraceableAbe {
    fn default() -> Self {
        Self {
            rng: Mutex::new(CsRng::from_entropy()),
        }
    }
}

impl PartialEq for TraceableAbe {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl TraceableAbe {
    pub fn rng(&self) -> MutexGuard<CsRng> {
        self.rng.lock().expect("poisoned mutex")
    }

    /// Generates the keys of a grid able to hold `user_count` users.
    pub fn setup(&self, user_count: usize) -> Result<(PublicKey, SecretMasterKey), Error> {
        primitives::setup(&mut *self.rng(), user_count)
    }

    /// Issues the next slot of the master key along with its secret.
    pub fn issue_user_slot(&self, msk: &mut SecretMasterKey) -> Result<(Scalar, usize), Error> {
        msk.issue_user_slot(&mut *self.rng())
    }

    /// Issues a slot through a shared allocator.
    pub fn allocate_user_slot(
        &self,
        allocator: &impl SlotAllocator,
    ) -> Result<(Scalar, usize), Error> {
        primitives::issue_user_slot(&mut *self.rng(), allocator)
    }

    /// Generates the private key of a slot. Returns `None` for the reserved
    /// slot.
    pub fn keygen(
        &self,
        msk: &SecretMasterKey,
        sigma: &Scalar,
        slot: usize,
        attributes: &[&str],
    ) -> Result<Option<PrivateKey>, Error> {
        primitives::keygen(&mut *self.rng(), msk, sigma, slot, attributes)
    }

    /// Issues a new slot and generates its key.
    ///
    /// # Error
    ///
    /// Fails once the grid is full.
    pub fn generate_user_key(
        &self,
        msk: &mut SecretMasterKey,
        attributes: &[&str],
    ) -> Result<PrivateKey, Error> {
        let (sigma, slot) = self.issue_user_slot(msk)?;
        self.keygen(msk, &sigma, slot, attributes)?
            .ok_or_else(|| Error::Key(format!("slot {slot} is reserved")))
    }

    /// Generates components to be added to the key of `(sigma, slot)` with
    /// [`PrivateKey::with_added_attributes`].
    pub fn keygen_attributes(
        &self,
        msk: &SecretMasterKey,
        sigma: &Scalar,
        slot: usize,
        attributes: &[&str],
    ) -> Result<Vec<AttributeComponent>, Error> {
        primitives::keygen_attributes(&mut *self.rng(), msk, sigma, slot, attributes)
    }

    /// Encrypts a random `GT` element under the given policy.
    ///
    /// - `mpk`             : public key
    /// - `policy`          : policy expression, see [`AccessPolicy::parse`]
    /// - `kind`            : access structure to build
    /// - `revoked`         : slots that must not decrypt
    /// - `encryptor_slot`  : first slot able to decrypt
    pub fn encrypt(
        &self,
        mpk: &PublicKey,
        policy: &str,
        kind: AccessStructureKind,
        revoked: &[usize],
        encryptor_slot: usize,
    ) -> Result<(CipherText, Gt), Error> {
        primitives::encrypt(
            &mut *self.rng(),
            mpk,
            &AccessPolicy::parse(policy)?,
            kind,
            revoked,
            encryptor_slot,
        )
    }

    pub fn decrypt(&self, usk: &PrivateKey, ciphertext: &CipherText) -> Result<Gt, Error> {
        primitives::decrypt(usk, ciphertext)
    }

    pub fn decrypt_with_options(
        &self,
        usk: &PrivateKey,
        ciphertext: &CipherText,
        options: &DecryptionOptions,
    ) -> Result<Gt, Error> {
        primitives::decrypt_with_options(usk, ciphertext, options)
    }

    #[must_use]
    pub fn can_decrypt(&self, usk: &PrivateKey, ciphertext: &CipherText) -> bool {
        primitives::can_decrypt(usk, ciphertext)
    }

    /// Encrypts `plaintext` for every non-revoked user satisfying `policy`.
    pub fn encrypt_data(
        &self,
        mpk: &PublicKey,
        policy: &str,
        kind: AccessStructureKind,
        revoked: &[usize],
        plaintext: &[u8],
    ) -> Result<AbeEncrypted, Error> {
        hybrid::encrypt_data(
            &mut *self.rng(),
            mpk,
            &AccessPolicy::parse(policy)?,
            kind,
            revoked,
            0,
            plaintext,
        )
    }

    pub fn decrypt_data(
        &self,
        usk: &PrivateKey,
        encrypted: &AbeEncrypted,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        hybrid::decrypt_data(usk, encrypted, &DecryptionOptions::default())
    }

    /// Returns the slots of the keys used to build `black_box`.
    pub fn trace(
        &self,
        mpk: &PublicKey,
        policy: &str,
        black_box: &impl DecryptionBlackBox,
        parameters: &TracingParameters,
    ) -> Result<Vec<usize>, Error> {
        traitor_tracing::trace(
            &mut *self.rng(),
            mpk,
            &AccessPolicy::parse(policy)?,
            black_box,
            parameters,
        )
    }
}
