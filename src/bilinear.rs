//! Bilinear group engine used by the scheme, instantiated over BLS12-381.
//!
//! The scheme is written for a symmetric pairing `e: G × G → GT`. BLS12-381
//! is asymmetric, so every base that appears on both sides of a pairing is
//! published as a [`MirroredPoint`]: the same discrete logarithm taken in
//! `G1` and in `G2`. Ciphertext elements live in `G1`, key elements in `G2`.

use std::ops::{Add, Mul, Neg};

use ark_bls12_381::{Bls12_381, Fr, G1Projective, G2Projective};
use ark_ec::{
    pairing::{Pairing, PairingOutput},
    PrimeGroup,
};
use ark_ff::{PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::UniformRand;
use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Sha3};

use crate::Error;

/// Element of the scalar field `Zr`.
pub type Scalar = Fr;

/// Element of the first source group, holding ciphertext components.
pub type G1 = G1Projective;

/// Element of the second source group, holding key components.
pub type G2 = G2Projective;

/// Element of the target group, written additively.
pub type Gt = PairingOutput<Bls12_381>;

/// Compressed length of a scalar.
pub const SCALAR_LENGTH: usize = 32;

/// Compressed length of a `G1` point.
pub const G1_LENGTH: usize = 48;

/// Compressed length of a `G2` point.
pub const G2_LENGTH: usize = 96;

/// Compressed length of a `GT` element.
pub const GT_LENGTH: usize = 576;

/// Pairing-friendly curves supported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    #[default]
    Bls12_381,
}

impl Curve {
    /// Returns the descriptor byte written in serialized keys.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Bls12_381 => 1,
        }
    }

    /// Reads a curve descriptor byte.
    pub fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            1 => Ok(Self::Bls12_381),
            b => Err(Error::Serialization(format!("unknown curve descriptor {b}"))),
        }
    }
}

/// A point known in both source groups under the same discrete logarithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirroredPoint {
    pub(crate) g1: G1,
    pub(crate) g2: G2,
}

impl MirroredPoint {
    /// Length of the serialized point.
    pub const LENGTH: usize = G1_LENGTH + G2_LENGTH;

    /// Returns the pair of canonical generators.
    #[must_use]
    pub fn generator() -> Self {
        Self {
            g1: G1::generator(),
            g2: G2::generator(),
        }
    }

    /// Returns the copy living in `G1`.
    #[must_use]
    pub fn g1(&self) -> &G1 {
        &self.g1
    }

    /// Returns the copy living in `G2`.
    #[must_use]
    pub fn g2(&self) -> &G2 {
        &self.g2
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.g1.is_zero() || self.g2.is_zero()
    }
}

impl Mul<&Scalar> for &MirroredPoint {
    type Output = MirroredPoint;

    fn mul(self, rhs: &Scalar) -> Self::Output {
        MirroredPoint {
            g1: self.g1 * rhs,
            g2: self.g2 * rhs,
        }
    }
}

impl Add<&MirroredPoint> for &MirroredPoint {
    type Output = MirroredPoint;

    fn add(self, rhs: &MirroredPoint) -> Self::Output {
        MirroredPoint {
            g1: self.g1 + rhs.g1,
            g2: self.g2 + rhs.g2,
        }
    }
}

impl Neg for MirroredPoint {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            g1: -self.g1,
            g2: -self.g2,
        }
    }
}

/// Samples a uniformly random non-zero scalar.
pub fn random_scalar<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Scalar {
    loop {
        let s = Scalar::rand(rng);
        if !s.is_zero() {
            return s;
        }
    }
}

/// Samples a random element of the target group.
pub fn random_gt(rng: &mut impl CryptoRngCore) -> Gt {
    gt_generator() * random_scalar(rng)
}

/// Returns `e(g1, g2)` for the canonical generators.
#[must_use]
pub fn gt_generator() -> Gt {
    pairing(&G1::generator(), &G2::generator())
}

pub fn pairing(lhs: &G1, rhs: &G2) -> Gt {
    Bls12_381::pairing(*lhs, *rhs)
}

/// Computes `Σ e(lhs_k, rhs_k)` with a single final exponentiation.
pub fn multi_pairing(lhs: &[G1], rhs: &[G2]) -> Gt {
    Bls12_381::multi_pairing(lhs.iter().copied(), rhs.iter().copied())
}

/// Hashes an attribute string into the scalar field.
#[must_use]
pub fn hash_to_scalar(attribute: &str) -> Scalar {
    let mut hasher = Sha3::v256();
    hasher.update(attribute.as_bytes());
    let mut digest = [0; 32];
    hasher.finalize(&mut digest);
    Scalar::from_le_bytes_mod_order(&digest)
}

/// Converts a signed integer into a scalar.
#[cfg(test)]
pub(crate) fn scalar_from_i64(value: i64) -> Scalar {
    let s = Scalar::from(value.unsigned_abs());
    if value < 0 {
        -s
    } else {
        s
    }
}

/// Serializes an element into its fixed-length compressed encoding.
pub fn to_bytes<T: CanonicalSerialize, const LENGTH: usize>(
    element: &T,
) -> Result<[u8; LENGTH], Error> {
    let mut bytes = Vec::with_capacity(LENGTH);
    element.serialize_compressed(&mut bytes)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        Error::InvalidSize(format!("expected: {LENGTH}, given: {}", bytes.len()))
    })
}

/// Deserializes and validates a compressed element.
pub fn from_bytes<T: CanonicalDeserialize>(bytes: &[u8]) -> Result<T, Error> {
    Ok(T::deserialize_compressed(bytes)?)
}
