//! Implements the cryptographic primitives of the traceable CP-ABE scheme of
//! Liu and Wong.
//!
//! Users are laid out on an `m × m` grid. Each ciphertext hides a cut of the
//! grid: users at or after the cut decrypt, users before it cannot. Normal
//! encryption puts the cut at slot 0, tracing moves it.

use std::collections::HashSet;

use ark_ff::Zero;
use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use super::{
    vector::{orthogonal_basis, pair_sum, ElementVector, ScalarVector},
    AttributeComponent, CipherText, EncryptedAccessStructure, PrivateKey, PublicKey,
    SecretMasterKey, ShareComponent, SlotAllocator,
};
use crate::{
    abe_policy::AccessPolicy,
    access_structure::{AccessStructureKind, AccessTree, LsssMatrix},
    bilinear::{
        hash_to_scalar, multi_pairing, pairing, random_gt, random_scalar, Curve, Gt,
        MirroredPoint, Scalar, G1,
    },
    DecryptionError, Error,
};

/// Tuning of the decryption.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionOptions {
    /// Maximum number of candidate row subsets examined when solving an LSSS
    /// matrix. The search is exhaustive if `None`.
    pub lsss_budget: Option<usize>,
}

/// Returns the smallest `m` such that `m² ≥ user_count + 1`.
fn grid_width(user_count: usize) -> Result<usize, Error> {
    let too_large = || Error::Setup(format!("{user_count} users do not fit in a user grid"));
    let slots = user_count.checked_add(1).ok_or_else(too_large)?;
    // the floating point root is only an estimate for large counts
    let mut m = (slots as f64).sqrt() as usize;
    while m.checked_mul(m).map_or(true, |square| square > slots) {
        m -= 1;
    }
    if m * m < slots {
        m += 1;
        m.checked_mul(m).ok_or_else(too_large)?;
    }
    Ok(m)
}

/// Returns the exponent vector of each grid column: `v + μ_j·x3` with a fresh
/// `μ_j` before the cut, `v` from the cut on.
fn column_exponents(
    rng: &mut impl CryptoRngCore,
    v: &ScalarVector,
    x3: &ScalarVector,
    j_bar: usize,
    m: usize,
) -> Vec<ScalarVector> {
    (0..m)
        .map(|j| {
            if j < j_bar {
                *v + x3.scale(&random_scalar(rng))
            } else {
                *v
            }
        })
        .collect()
}

fn random_point(rng: &mut impl CryptoRngCore, base: &MirroredPoint) -> MirroredPoint {
    base * &random_scalar(rng)
}

/// Generates the master secret key and the public key of the scheme.
///
/// # Parameters
///
/// - `rng`         : random number generator
/// - `user_count`  : number of users the grid must hold
///
/// # Error
///
/// At least two users are needed.
#[instrument(level = "info", skip_all, fields(user_count = user_count))]
pub fn setup(
    rng: &mut impl CryptoRngCore,
    user_count: usize,
) -> Result<(PublicKey, SecretMasterKey), Error> {
    if user_count < 2 {
        return Err(Error::Setup(format!(
            "the user grid needs room for at least 2 users, {user_count} requested"
        )));
    }
    let m = grid_width(user_count)?;

    let g = random_point(rng, &MirroredPoint::generator());
    let h = random_point(rng, &g);
    let f = random_point(rng, &g);
    let big_g = random_point(rng, &g);
    let big_h = random_point(rng, &g);

    let f_j = (0..m).map(|_| random_point(rng, &g)).collect::<Vec<_>>();
    let alpha_i = (0..m).map(|_| random_scalar(rng)).collect::<Vec<_>>();
    let r_i = (0..m).map(|_| random_scalar(rng)).collect::<Vec<_>>();
    let c_j = (0..m).map(|_| random_scalar(rng)).collect::<Vec<_>>();
    // `z_i` is only needed to build `Z_i`
    let z_i = (0..m).map(|_| random_point(rng, &g)).collect::<Vec<_>>();

    let e_gg = pairing(g.g1(), g.g2());
    let public_key = PublicKey {
        curve: Curve::default(),
        m,
        e_i: alpha_i.iter().map(|alpha| e_gg * alpha).collect(),
        g_i: r_i.iter().map(|r| &g * r).collect(),
        h_j: c_j.iter().map(|c| g.g2 * c).collect(),
        z_i,
        f_j,
        g,
        h,
        f,
        big_g,
        big_h,
    };
    debug!(m, capacity = public_key.capacity(), "generated master keys");

    Ok((
        public_key.clone(),
        SecretMasterKey {
            public_key,
            alpha_i,
            r_i,
            c_j,
            counter: 0,
        },
    ))
}

/// Reserves a new user slot and draws the secret `σ` bound to it.
///
/// # Parameters
///
/// - `rng`         : random number generator
/// - `allocator`   : source of fresh slots
pub fn issue_user_slot(
    rng: &mut impl CryptoRngCore,
    allocator: &impl SlotAllocator,
) -> Result<(Scalar, usize), Error> {
    let slot = allocator.allocate()?;
    trace!(slot, "issued user slot");
    Ok((random_scalar(rng), slot))
}

fn attribute_component(
    rng: &mut impl CryptoRngCore,
    mpk: &PublicKey,
    sigma: &Scalar,
    attribute: &str,
) -> AttributeComponent {
    let hashed_attribute = hash_to_scalar(attribute);
    let delta = random_scalar(rng);
    AttributeComponent {
        attribute: attribute.to_string(),
        hashed_attribute,
        k1: mpk.g.g2 * delta,
        k2: (mpk.big_h.g2 * hashed_attribute + mpk.h.g2) * delta - mpk.big_g.g2 * sigma,
    }
}

/// Generates the attribute components of the key issued for `(sigma, slot)`.
/// Repeated attributes yield a single component.
///
/// # Error
///
/// The slot must lie inside the user grid.
pub fn keygen_attributes(
    rng: &mut impl CryptoRngCore,
    msk: &SecretMasterKey,
    sigma: &Scalar,
    slot: usize,
    attributes: &[&str],
) -> Result<Vec<AttributeComponent>, Error> {
    msk.public_key.position(slot)?;
    let mut seen = HashSet::with_capacity(attributes.len());
    Ok(attributes
        .iter()
        .filter(|attribute| seen.insert(**attribute))
        .map(|attribute| attribute_component(rng, &msk.public_key, sigma, attribute))
        .collect())
}

/// Generates the private key of the user holding `slot`.
///
/// # Parameters
///
/// - `rng`         : random number generator
/// - `msk`         : master secret key
/// - `sigma`       : secret drawn when the slot was issued
/// - `slot`        : user slot
/// - `attributes`  : attributes granted to the user
///
/// Returns `None` for the last slot of the grid, which is never given out.
///
/// # Error
///
/// The slot must lie inside the user grid.
#[instrument(level = "info", skip_all, fields(slot = slot))]
pub fn keygen(
    rng: &mut impl CryptoRngCore,
    msk: &SecretMasterKey,
    sigma: &Scalar,
    slot: usize,
    attributes: &[&str],
) -> Result<Option<PrivateKey>, Error> {
    let mpk = &msk.public_key;
    let position = mpk.position(slot)?;
    if slot == mpk.capacity() {
        debug!(slot, "no key is issued for the reserved slot");
        return Ok(None);
    }
    let (i, j) = (position.row(), position.column());

    let k1 = mpk.g.g2 * msk.alpha_i[i]
        + mpk.g_i[i].g2 * msk.c_j[j]
        + (mpk.f.g2 + mpk.f_j[j].g2) * sigma;
    let k_ijj = mpk
        .f_j
        .iter()
        .enumerate()
        .map(|(column, f_j)| (column != j).then(|| f_j.g2 * sigma))
        .collect();

    Ok(Some(PrivateKey {
        position,
        k1,
        k2: mpk.g.g2 * sigma,
        k3: mpk.z_i[i].g2 * sigma,
        k_ijj,
        components: keygen_attributes(rng, msk, sigma, slot, attributes)?,
        additional_data: Default::default(),
    }))
}

fn share_component<R: CryptoRngCore + ?Sized>(
    rng: &mut R,
    mpk: &PublicKey,
    hashed_attribute: &Scalar,
    share: Scalar,
) -> ShareComponent {
    let e = random_scalar(rng);
    ShareComponent {
        p1: mpk.f.g1 * share + mpk.big_g.g1 * e,
        p2: (mpk.big_h.g1 * hashed_attribute + mpk.h.g1) * (-e),
        p3: mpk.g.g1 * e,
    }
}

/// Returns `f · Π f_j` over the columns of row `i` that are not revoked.
fn row_base(mpk: &PublicKey, revoked: &[usize], i: usize) -> G1 {
    (0..mpk.m)
        .filter(|j| revoked.binary_search(&(i * mpk.m + j)).is_err())
        .fold(mpk.f.g1, |acc, j| acc + mpk.f_j[j].g1)
}

/// Encrypts a random `GT` element for the users satisfying `policy`.
///
/// # Parameters
///
/// - `rng`             : random number generator
/// - `mpk`             : public key
/// - `policy`          : access policy
/// - `kind`            : access structure to build
/// - `revoked`         : slots that must not decrypt
/// - `encryptor_slot`  : first slot able to decrypt, `0` outside of tracing
///
/// Returns the ciphertext and the encrypted element.
///
/// # Error
///
/// Slots must lie inside the user grid and the policy must convert into the
/// requested access structure.
#[instrument(level = "info", skip_all, fields(policy = %policy, kind = ?kind, encryptor_slot = encryptor_slot))]
pub fn encrypt(
    rng: &mut impl CryptoRngCore,
    mpk: &PublicKey,
    policy: &AccessPolicy,
    kind: AccessStructureKind,
    revoked: &[usize],
    encryptor_slot: usize,
) -> Result<(CipherText, Gt), Error> {
    let m = mpk.m;
    let encryptor = mpk
        .position(encryptor_slot)
        .map_err(|e| Error::Encryption(e.to_string()))?;
    let mut revoked = revoked.to_vec();
    revoked.sort_unstable();
    revoked.dedup();
    if let Some(slot) = revoked.iter().find(|slot| **slot >= m * m) {
        return Err(Error::Encryption(format!(
            "revoked slot {slot} is outside of the user grid"
        )));
    }
    let (i_bar, j_bar) = (encryptor.row(), encryptor.column());

    let message = random_gt(rng);
    let kappa = random_scalar(rng);
    let tau = random_scalar(rng);
    let pi = random_scalar(rng);
    let (x1, x2, x3) = orthogonal_basis(rng);
    let v = ScalarVector::random(rng);

    let mut r1 = Vec::with_capacity(m);
    let mut r2 = Vec::with_capacity(m);
    let mut q1 = Vec::with_capacity(m);
    let mut q2 = Vec::with_capacity(m);
    let mut q3 = Vec::with_capacity(m);
    let mut t = Vec::with_capacity(m);
    for i in 0..m {
        let s_i = random_scalar(rng);
        let t_i = random_scalar(rng);
        // rows after the cut live in span{x1, x2}, orthogonal to x3
        let v_i = if i <= i_bar {
            ScalarVector::random(rng)
        } else {
            x1.scale(&random_scalar(rng)) + x2.scale(&random_scalar(rng))
        };
        let f_temp = row_base(mpk, &revoked, i);
        let blinding = mpk.z_i[i].g1 * t_i + mpk.f.g1 * pi;
        if i < i_bar {
            let s_hat = random_scalar(rng);
            r1.push(v_i.power_in_base(&mpk.g.g1));
            r2.push(v_i.power_in_base(&(mpk.g.g1 * kappa)));
            q1.push(mpk.g.g1 * s_i);
            q2.push(f_temp * s_i + blinding);
            t.push(mpk.e_i[i] * s_hat);
        } else {
            let vv_i = v.dot(&v_i);
            if vv_i.is_zero() {
                return Err(Error::Encryption(format!(
                    "degenerate vector for row {i}"
                )));
            }
            let t_s = vv_i * s_i * tau;
            let base = mpk.g_i[i].g1 * s_i;
            r1.push(v_i.power_in_base(&base));
            r2.push(v_i.power_in_base(&(base * kappa)));
            q1.push(mpk.g.g1 * t_s);
            q2.push(f_temp * t_s + blinding);
            t.push(mpk.e_i[i] * t_s + message);
        }
        q3.push(mpk.g.g1 * t_i);
    }

    let g_kappa = mpk.g.g2 * kappa;
    let mut c1 = Vec::with_capacity(m);
    let mut c2 = Vec::with_capacity(m);
    for (h_j, exponent) in mpk.h_j.iter().zip(column_exponents(rng, &v, &x3, j_bar, m)) {
        let w_j = ScalarVector::random(rng);
        c1.push(exponent.scale(&tau).power_in_base(h_j) + w_j.power_in_base(&g_kappa));
        c2.push(w_j.power_in_base(&mpk.g.g2));
    }

    if r1.iter().chain(&r2).any(ElementVector::is_degenerate)
        || c1.iter().chain(&c2).any(ElementVector::is_degenerate)
        || q1.iter().chain(&q2).chain(&q3).any(Zero::is_zero)
    {
        return Err(Error::Encryption("degenerate group element".to_string()));
    }

    let access_structure = match kind {
        AccessStructureKind::Matrix => {
            let matrix = LsssMatrix::from_policy(policy);
            let mut u = Vec::with_capacity(matrix.columns());
            u.push(pi);
            for _ in 1..matrix.columns() {
                u.push(random_scalar(rng));
            }
            let components = matrix
                .rows()
                .iter()
                .zip(matrix.share(&u))
                .map(|(row, share)| share_component(&mut *rng, mpk, &row.hashed_attribute, share))
                .collect();
            EncryptedAccessStructure::Matrix { matrix, components }
        }
        AccessStructureKind::Tree => {
            let tree = AccessTree::from_policy(policy)?;
            EncryptedAccessStructure::Tree(tree.share(
                rng,
                pi,
                &mut |rng, hashed_attribute, share| {
                    Ok(share_component(rng, mpk, hashed_attribute, share))
                },
            )?)
        }
    };
    debug!(m, revoked = revoked.len(), "encrypted");

    Ok((
        CipherText {
            policy: policy.clone(),
            access_structure,
            r1,
            r2,
            q1,
            q2,
            q3,
            t,
            c1,
            c2,
            revoked,
        },
        message,
    ))
}

/// Checks whether the attributes of the key satisfy the ciphertext policy.
/// No pairing is computed.
#[must_use]
pub fn can_decrypt(usk: &PrivateKey, ciphertext: &CipherText) -> bool {
    match &ciphertext.access_structure {
        EncryptedAccessStructure::Matrix { .. } => satisfies_policy(usk, &ciphertext.policy),
        EncryptedAccessStructure::Tree(tree) => tree.is_satisfied_by(&usk.hashed_attributes()),
    }
}

/// Checks whether the attributes of the key satisfy the given policy.
#[must_use]
pub fn satisfies_policy(usk: &PrivateKey, policy: &AccessPolicy) -> bool {
    policy.is_satisfied_by(&usk.attributes())
}

/// Computes `e(P1, k2) · e(P2, K1) · e(P3, K2)` for the key component of the
/// given attribute.
fn share_pairing(
    usk: &PrivateKey,
    attribute: &str,
    hashed_attribute: &Scalar,
    share: &ShareComponent,
) -> Result<Gt, Error> {
    let component = usk
        .satisfying_component(hashed_attribute)
        .ok_or_else(|| DecryptionError::MissingComponent(attribute.to_string()))?;
    Ok(multi_pairing(
        &[share.p1, share.p2, share.p3],
        &[usk.k2, component.k1, component.k2],
    ))
}

/// Decrypts the ciphertext with default options.
///
/// See [`decrypt_with_options`].
pub fn decrypt(usk: &PrivateKey, ciphertext: &CipherText) -> Result<Gt, Error> {
    decrypt_with_options(usk, ciphertext, &DecryptionOptions::default())
}

/// Recovers the `GT` element encrypted in `ciphertext`.
///
/// A key whose slot is before the ciphertext cut, or revoked, yields a random
/// element: this cannot be detected here, and surfaces as an authentication
/// failure in the hybrid layer.
///
/// # Error
///
/// Fails without computing any pairing if the key attributes do not satisfy
/// the policy.
#[instrument(level = "info", skip_all, fields(slot = usk.position.counter()))]
pub fn decrypt_with_options(
    usk: &PrivateKey,
    ciphertext: &CipherText,
    options: &DecryptionOptions,
) -> Result<Gt, Error> {
    if !can_decrypt(usk, ciphertext) {
        return Err(DecryptionError::UnsatisfiedPolicy.into());
    }
    let m = ciphertext.grid_width();
    if usk.position.grid_width() != m || usk.k_ijj.len() != m {
        return Err(DecryptionError::PositionMismatch.into());
    }
    let (i, j) = (usk.position.row(), usk.position.column());

    let attributes = usk.hashed_attributes();
    let d_p = match &ciphertext.access_structure {
        EncryptedAccessStructure::Matrix { matrix, components } => {
            let weights = matrix.reconstruction(&attributes, &ciphertext.policy, options.lsss_budget)?;
            let mut d_p = Gt::zero();
            for (k, w) in weights {
                let row = &matrix.rows()[k];
                let share = components
                    .get(k)
                    .ok_or_else(|| DecryptionError::MissingComponent(row.attribute.clone()))?;
                d_p += share_pairing(usk, &row.attribute, &row.hashed_attribute, share)? * w;
            }
            d_p
        }
        EncryptedAccessStructure::Tree(tree) => {
            let witness = tree
                .witness(&attributes)
                .ok_or(DecryptionError::UnsatisfiedPolicy)?;
            tree.recombine(&witness, &mut |attribute, hashed_attribute, share| {
                share_pairing(usk, attribute, hashed_attribute, share)
            })?
        }
    };

    let mut k_bar = usk.k1;
    for (column, k) in usk.k_ijj.iter().enumerate() {
        if column == j || ciphertext.revoked.binary_search(&(i * m + column)).is_ok() {
            continue;
        }
        k_bar += k.ok_or_else(|| {
            DecryptionError::MissingComponent(format!("cross-column term {column}"))
        })?;
    }

    let (r1, r2) = (&ciphertext.r1[i], &ciphertext.r2[i]);
    let (c1, c2) = (&ciphertext.c1[j], &ciphertext.c2[j]);
    if r1.is_degenerate() || r2.is_degenerate() {
        return Err(DecryptionError::DegenerateElement("row vector").into());
    }
    if c1.is_degenerate() || c2.is_degenerate() {
        return Err(DecryptionError::DegenerateElement("column vector").into());
    }
    if k_bar.is_zero() || usk.k2.is_zero() || usk.k3.is_zero() {
        return Err(DecryptionError::DegenerateElement("key element").into());
    }

    let d_i = multi_pairing(
        &[ciphertext.q1[i], ciphertext.q3[i], -ciphertext.q2[i]],
        &[k_bar, usk.k3, usk.k2],
    ) + pair_sum(r2, c2)
        - pair_sum(r1, c1);
    trace!(row = i, column = j, "recombined grid term");

    Ok(ciphertext.t[i] - (d_p + d_i))
}

#[cfg(test)]
mod tests {
    use super::*;

    use cosmian_crypto_core::{reexport::rand_core::SeedableRng, CsRng};

    #[test]
    fn test_grid_width() -> Result<(), Error> {
        assert_eq!(grid_width(2)?, 2);
        assert_eq!(grid_width(3)?, 2);
        assert_eq!(grid_width(4)?, 3);
        assert_eq!(grid_width(8)?, 3);
        assert_eq!(grid_width(100)?, 11);
        assert_eq!(grid_width(120)?, 11);
        assert_eq!(grid_width(121)?, 12);
        // 2^32 - 1 users fill the 2^16 x 2^16 grid up to the reserved slot
        assert_eq!(grid_width((1 << 32) - 1)?, 1 << 16);
        assert_eq!(grid_width(1 << 32)?, (1 << 16) + 1);
        assert!(matches!(grid_width(usize::MAX), Err(Error::Setup(_))));
        assert!(matches!(grid_width(usize::MAX - 1), Err(Error::Setup(_))));
        Ok(())
    }

    #[test]
    fn test_column_exponents() {
        let mut rng = CsRng::from_entropy();
        let (x1, x2, x3) = orthogonal_basis(&mut rng);
        let v = ScalarVector::random(&mut rng);
        let exponents = column_exponents(&mut rng, &v, &x3, 3, 5);
        assert_eq!(exponents.len(), 5);
        assert_eq!(exponents[3..], [v, v]);
        for (j, e) in exponents[..3].iter().enumerate() {
            // only the x3 component moves
            assert_eq!(e.dot(&x1), v.dot(&x1));
            assert_eq!(e.dot(&x2), v.dot(&x2));
            assert_ne!(*e, v);
            // each column draws its own blinding factor
            for other in &exponents[j + 1..3] {
                assert_ne!(e, other);
            }
        }
    }
}
