//! Implements the key and ciphertext model of the traceable ABE scheme.

use std::collections::{BTreeMap, HashSet};

use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;

use crate::{
    abe_policy::AccessPolicy,
    access_structure::{AccessStructureKind, AccessTree, LsssMatrix},
    bilinear::{Curve, Gt, MirroredPoint, Scalar, G1, G2},
    Error,
};

pub(crate) mod matrix;
pub mod primitives;
mod slot;
pub(crate) mod vector;

#[cfg(feature = "serialization")]
pub mod serialization;


pub use slot::{AtomicSlotAllocator, SlotAllocator};
pub use vector::{ElementVector, ScalarVector};

/// Position of a user in the `m × m` grid.
///
/// The counter `i · m + j` identifies the user, `i` is its row and `j` its
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPosition {
    m: usize,
    counter: usize,
}

impl GridPosition {
    /// Returns the position of the given counter.
    ///
    /// # Error
    ///
    /// The counter must lie inside the grid.
    pub fn new(m: usize, counter: usize) -> Result<Self, Error> {
        if counter >= m * m {
            return Err(Error::Key(format!(
                "slot {counter} is outside of the {m}x{m} user grid"
            )));
        }
        Ok(Self { m, counter })
    }

    #[must_use]
    pub fn counter(&self) -> usize {
        self.counter
    }

    #[must_use]
    pub fn row(&self) -> usize {
        self.counter / self.m
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.counter % self.m
    }

    #[must_use]
    pub fn grid_width(&self) -> usize {
        self.m
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) curve: Curve,
    pub(crate) m: usize,
    pub(crate) g: MirroredPoint,
    pub(crate) h: MirroredPoint,
    pub(crate) f: MirroredPoint,
    pub(crate) big_g: MirroredPoint,
    pub(crate) big_h: MirroredPoint,
    pub(crate) f_j: Vec<MirroredPoint>,
    pub(crate) e_i: Vec<Gt>,
    pub(crate) g_i: Vec<MirroredPoint>,
    pub(crate) z_i: Vec<MirroredPoint>,
    pub(crate) h_j: Vec<G2>,
}

impl PublicKey {
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Returns the width of the user grid.
    #[must_use]
    pub fn grid_width(&self) -> usize {
        self.m
    }

    /// Returns the number of slots that can be issued to users. The last slot
    /// of the grid is never issued.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.m * self.m - 1
    }

    /// Returns the position of the given slot.
    pub fn position(&self, slot: usize) -> Result<GridPosition, Error> {
        GridPosition::new(self.m, slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMasterKey {
    pub(crate) public_key: PublicKey,
    pub(crate) alpha_i: Vec<Scalar>,
    pub(crate) r_i: Vec<Scalar>,
    pub(crate) c_j: Vec<Scalar>,
    pub(crate) counter: usize,
}

impl SecretMasterKey {
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Returns the next slot to issue.
    #[must_use]
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Returns the last slot that may be issued to a user.
    #[must_use]
    pub fn last_slot(&self) -> usize {
        self.public_key.capacity() - 1
    }

    /// Records the slots issued through a shared allocator so that the
    /// counter persisted with the key never goes back.
    pub fn record_issued(&mut self, allocator: &impl SlotAllocator) {
        self.counter = self.counter.max(allocator.issued());
    }

    /// Issues the next slot of this key. Use an [`AtomicSlotAllocator`] when
    /// the key is shared between issuers.
    pub fn issue_user_slot(
        &mut self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<(Scalar, usize), Error> {
        let allocator = AtomicSlotAllocator::new(self);
        let res = primitives::issue_user_slot(rng, &allocator)?;
        self.record_issued(&allocator);
        Ok(res)
    }
}

/// Key component bound to one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeComponent {
    pub(crate) attribute: String,
    pub(crate) hashed_attribute: Scalar,
    pub(crate) k1: G2,
    pub(crate) k2: G2,
}

impl AttributeComponent {
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[must_use]
    pub fn hashed_attribute(&self) -> &Scalar {
        &self.hashed_attribute
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub(crate) position: GridPosition,
    pub(crate) k1: G2,
    pub(crate) k2: G2,
    pub(crate) k3: G2,
    /// `f_j^σ` for every column but the key's own.
    pub(crate) k_ijj: Vec<Option<G2>>,
    pub(crate) components: Vec<AttributeComponent>,
    pub(crate) additional_data: BTreeMap<String, Vec<u8>>,
}

impl PrivateKey {
    #[must_use]
    pub fn position(&self) -> GridPosition {
        self.position
    }

    #[must_use]
    pub fn components(&self) -> &[AttributeComponent] {
        &self.components
    }

    /// Returns the attribute names carried by this key.
    #[must_use]
    pub fn attributes(&self) -> HashSet<&str> {
        self.components
            .iter()
            .map(|c| c.attribute.as_str())
            .collect()
    }

    pub(crate) fn hashed_attributes(&self) -> HashSet<Scalar> {
        self.components.iter().map(|c| c.hashed_attribute).collect()
    }

    /// Returns the first component bound to the given hashed attribute.
    #[must_use]
    pub fn satisfying_component(&self, hashed_attribute: &Scalar) -> Option<&AttributeComponent> {
        self.components
            .iter()
            .find(|c| &c.hashed_attribute == hashed_attribute)
    }

    /// Returns a copy of this key extended with the given components, which
    /// must have been generated for the same slot and secret.
    #[must_use]
    pub fn with_added_attributes(&self, components: Vec<AttributeComponent>) -> Self {
        let mut res = self.clone();
        for component in components {
            if res.satisfying_component(&component.hashed_attribute).is_none() {
                res.components.push(component);
            }
        }
        res
    }

    /// Merges the attributes of two keys issued for the same slot and secret.
    ///
    /// # Error
    ///
    /// Keys of different slots, or of the same slot with different secrets,
    /// cannot be merged.
    pub fn merge(&self, other: &Self) -> Result<Self, Error> {
        if self.position != other.position {
            return Err(Error::Key(format!(
                "cannot merge keys of slots {} and {}",
                self.position.counter, other.position.counter
            )));
        }
        if self.k1 != other.k1
            || self.k2 != other.k2
            || self.k3 != other.k3
            || self.k_ijj != other.k_ijj
        {
            return Err(Error::Key(
                "cannot merge keys issued with different secrets".to_string(),
            ));
        }
        let mut res = self.with_added_attributes(other.components.clone());
        for (name, data) in &other.additional_data {
            res.additional_data
                .entry(name.clone())
                .or_insert_with(|| data.clone());
        }
        Ok(res)
    }

    #[must_use]
    pub fn additional_data(&self, name: &str) -> Option<&[u8]> {
        self.additional_data.get(name).map(Vec::as_slice)
    }

    /// Attaches opaque data to the key, returning the previous value.
    pub fn set_additional_data(&mut self, name: String, data: Vec<u8>) -> Option<Vec<u8>> {
        self.additional_data.insert(name, data)
    }
}

/// Ciphertext elements bound to one attribute of the access structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareComponent {
    pub(crate) p1: G1,
    pub(crate) p2: G1,
    pub(crate) p3: G1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptedAccessStructure {
    /// Share matrix and the components of each of its rows.
    Matrix {
        matrix: LsssMatrix,
        components: Vec<ShareComponent>,
    },
    Tree(AccessTree<ShareComponent>),
}

impl EncryptedAccessStructure {
    #[must_use]
    pub fn kind(&self) -> AccessStructureKind {
        match self {
            Self::Matrix { .. } => AccessStructureKind::Matrix,
            Self::Tree(_) => AccessStructureKind::Tree,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherText {
    pub(crate) policy: AccessPolicy,
    pub(crate) access_structure: EncryptedAccessStructure,
    pub(crate) r1: Vec<ElementVector<G1>>,
    pub(crate) r2: Vec<ElementVector<G1>>,
    pub(crate) q1: Vec<G1>,
    pub(crate) q2: Vec<G1>,
    pub(crate) q3: Vec<G1>,
    pub(crate) t: Vec<Gt>,
    pub(crate) c1: Vec<ElementVector<G2>>,
    pub(crate) c2: Vec<ElementVector<G2>>,
    /// Sorted revoked slots.
    pub(crate) revoked: Vec<usize>,
}

impl CipherText {
    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    #[must_use]
    pub fn access_structure(&self) -> &EncryptedAccessStructure {
        &self.access_structure
    }

    #[must_use]
    pub fn revoked(&self) -> &[usize] {
        &self.revoked
    }

    /// Returns the width of the user grid this ciphertext was built for.
    #[must_use]
    pub fn grid_width(&self) -> usize {
        self.t.len()
    }
}
