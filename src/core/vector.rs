//! Fixed-length vectors of scalars and group elements.
//!
//! Rows and columns of the user grid are tied together through 3-dimensional
//! vectors: the ciphertext hides the encryptor's cut in the choice of the
//! subspace each row vector lives in.

use std::ops::Add;

use ark_ec::PrimeGroup;
use ark_ff::{PrimeField, Zero};
use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;

use crate::bilinear::{multi_pairing, random_scalar, Gt, Scalar, G1, G2};

/// Dimension of the hidden subspace vectors.
pub const VECTOR_DIMENSION: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementVector<T>(pub(crate) [T; VECTOR_DIMENSION]);

pub type ScalarVector = ElementVector<Scalar>;

impl ScalarVector {
    /// Samples a vector with non-zero coordinates.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self([
            random_scalar(rng),
            random_scalar(rng),
            random_scalar(rng),
        ])
    }

    /// Returns the dot product of the two vectors.
    #[must_use]
    pub fn dot(&self, other: &Self) -> Scalar {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| *a * b)
            .sum()
    }

    #[must_use]
    pub fn scale(&self, factor: &Scalar) -> Self {
        Self(self.0.map(|a| a * factor))
    }

    /// Lifts the vector into the group generated by `base`: `(base^v_1, …)`.
    #[must_use]
    pub fn power_in_base<G: PrimeGroup<ScalarField = Scalar>>(&self, base: &G) -> ElementVector<G> {
        ElementVector(self.0.map(|a| base.mul_bigint(a.into_bigint())))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Zero::is_zero)
    }
}

impl<T: Copy + Add<Output = T>> Add for ElementVector<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let mut res = self.0;
        for (a, b) in res.iter_mut().zip(rhs.0) {
            *a = *a + b;
        }
        Self(res)
    }
}

impl<T: Zero> ElementVector<T> {
    /// Checks whether one of the coordinates is the neutral element.
    pub fn is_degenerate(&self) -> bool {
        self.0.iter().any(Zero::is_zero)
    }
}

/// Computes `Π e(lhs_k, rhs_k)`, written additively in `GT`.
pub fn pair_sum(lhs: &ElementVector<G1>, rhs: &ElementVector<G2>) -> Gt {
    multi_pairing(&lhs.0, &rhs.0)
}

/// Builds the basis `(x1, x2, x3)` where `x3` is orthogonal to `x1` and `x2`.
pub fn orthogonal_basis(rng: &mut impl CryptoRngCore) -> (ScalarVector, ScalarVector, ScalarVector) {
    let rx = random_scalar(rng);
    let ry = random_scalar(rng);
    let rz = random_scalar(rng);
    let x1 = ElementVector([rx, Scalar::zero(), rz]);
    let x2 = ElementVector([Scalar::zero(), ry, rz]);
    let x3 = ElementVector([-(ry * rz), -(rx * rz), rx * ry]);
    (x1, x2, x3)
}

#[cfg(test)]
mod tests {
    use cosmian_crypto_core::{reexport::rand_core::SeedableRng, CsRng};

    use super::*;
    use crate::bilinear::{pairing, MirroredPoint};

    #[test]
    fn test_orthogonal_basis() {
        let mut rng = CsRng::from_entropy();
        let (x1, x2, x3) = orthogonal_basis(&mut rng);
        assert!(x1.dot(&x3).is_zero());
        assert!(x2.dot(&x3).is_zero());
        assert!(!x3.is_zero());

        let c1 = random_scalar(&mut rng);
        let c2 = random_scalar(&mut rng);
        let v = x1.scale(&c1) + x2.scale(&c2);
        assert!(v.dot(&x3).is_zero());
    }

    #[test]
    fn test_pair_sum_computes_the_dot_product() {
        let mut rng = CsRng::from_entropy();
        let g = MirroredPoint::generator();
        let a = ScalarVector::random(&mut rng);
        let b = ScalarVector::random(&mut rng);
        let lhs = a.power_in_base(g.g1());
        let rhs = b.power_in_base(g.g2());
        assert!(!lhs.is_degenerate());
        assert_eq!(pair_sum(&lhs, &rhs), pairing(g.g1(), g.g2()) * a.dot(&b));
    }

    #[test]
    fn test_group_addition() {
        let mut rng = CsRng::from_entropy();
        let g = MirroredPoint::generator();
        let a = ScalarVector::random(&mut rng);
        let b = ScalarVector::random(&mut rng);
        assert_eq!(
            a.power_in_base(g.g1()) + b.power_in_base(g.g1()),
            (a + b).power_in_base(g.g1())
        );
    }
}
