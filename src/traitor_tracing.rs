//! Black-box traitor tracing.
//!
//! A pirate decryption box is queried with ciphertexts whose cut is moved
//! across the user grid. The probability that the box decrypts drops
//! noticeably when the cut passes the slot of a key it holds.

use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    abe_policy::AccessPolicy,
    access_structure::AccessStructureKind,
    core::{
        primitives::{can_decrypt, DecryptionOptions},
        PrivateKey, PublicKey,
    },
    hybrid::{decrypt_data, encrypt_data, AbeEncrypted},
    traits::DecryptionBlackBox,
    Error,
};

/// Length of the random plaintexts submitted to the box.
const PROBE_LENGTH: usize = 50;

/// Parameters of the tracing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracingParameters {
    /// Lower bound on the probability that the box decrypts, in `(0, 1]`.
    pub confidence: f64,
    /// Dispersion constant `λ` scaling the number of probes per cut.
    pub dispersion: f64,
    /// Access structure of the probe ciphertexts.
    pub kind: AccessStructureKind,
}

impl Default for TracingParameters {
    fn default() -> Self {
        Self {
            confidence: 0.9,
            dispersion: 0.1,
            kind: AccessStructureKind::default(),
        }
    }
}

impl TracingParameters {
    fn validate(&self) -> Result<(), Error> {
        if !(self.confidence > 0.0 && self.confidence <= 1.0) {
            return Err(Error::Other(format!(
                "tracing confidence must lie in (0, 1], got {}",
                self.confidence
            )));
        }
        if !(self.dispersion > 0.0 && self.dispersion.is_finite()) {
            return Err(Error::Other(format!(
                "tracing dispersion must be positive, got {}",
                self.dispersion
            )));
        }
        Ok(())
    }

    /// Returns the number of probes per cut, `⌈8 λ (N / ε)²⌉`.
    #[must_use]
    pub fn repetitions(&self, user_count: usize) -> usize {
        let ratio = user_count as f64 / self.confidence;
        (8.0 * self.dispersion * ratio * ratio).ceil() as usize
    }
}

/// Estimates the probability that the box decrypts ciphertexts cut at
/// `encryptor_slot`.
fn decryption_probability(
    rng: &mut impl CryptoRngCore,
    mpk: &PublicKey,
    policy: &AccessPolicy,
    black_box: &impl DecryptionBlackBox,
    kind: AccessStructureKind,
    encryptor_slot: usize,
    repeat: usize,
) -> Result<f64, Error> {
    let mut successes = 0;
    let mut plaintext = [0; PROBE_LENGTH];
    for _ in 0..repeat {
        rng.fill_bytes(&mut plaintext);
        let probe = encrypt_data(rng, mpk, policy, kind, &[], encryptor_slot, &plaintext)?;
        if black_box.decrypt(&probe).as_deref() == Some(&plaintext[..]) {
            successes += 1;
        }
    }
    Ok(successes as f64 / repeat as f64)
}

/// Returns the slots of the keys used to build the decryption box.
///
/// # Parameters
///
/// - `rng`         : random number generator
/// - `mpk`         : public key
/// - `policy`      : policy the box is known to decrypt
/// - `black_box`   : decryption box under investigation
/// - `parameters`  : tracing parameters
///
/// # Error
///
/// Only invalid parameters and encryption failures are reported: the box
/// failing to decrypt is a measurement, not an error.
#[instrument(level = "info", skip_all, fields(policy = %policy))]
pub fn trace(
    rng: &mut impl CryptoRngCore,
    mpk: &PublicKey,
    policy: &AccessPolicy,
    black_box: &impl DecryptionBlackBox,
    parameters: &TracingParameters,
) -> Result<Vec<usize>, Error> {
    parameters.validate()?;
    let n = mpk.capacity();
    let repeat = parameters.repetitions(n);
    info!(users = n, repeat, "tracing decryption box");

    let probabilities = (0..=n)
        .map(|k| {
            let p_k =
                decryption_probability(rng, mpk, policy, black_box, parameters.kind, k, repeat)?;
            debug!(cut = k, p_k, "estimated decryption probability");
            Ok::<_, Error>(p_k)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let threshold = parameters.confidence / (4 * n) as f64;
    Ok(probabilities
        .windows(2)
        .enumerate()
        .filter(|(_, p)| p[0] - p[1] >= threshold)
        .map(|(k, _)| k)
        .collect())
}

/// Decryption box holding a set of user keys.
///
/// Every key whose attributes satisfy the ciphertext policy is tried until one
/// decrypts.
#[derive(Debug, Default, Clone)]
pub struct KeyBlackBox {
    keys: Vec<PrivateKey>,
}

impl KeyBlackBox {
    #[must_use]
    pub fn new(keys: Vec<PrivateKey>) -> Self {
        Self { keys }
    }

    #[must_use]
    pub fn keys(&self) -> &[PrivateKey] {
        &self.keys
    }
}

impl DecryptionBlackBox for KeyBlackBox {
    fn decrypt(&self, ciphertext: &AbeEncrypted) -> Option<Vec<u8>> {
        self.keys
            .iter()
            .filter(|key| can_decrypt(key, &ciphertext.cipher_text))
            .find_map(|key| decrypt_data(key, ciphertext, &DecryptionOptions::default()).ok())
            .map(|plaintext| plaintext.to_vec())
    }
}
