//! Implements the serialization methods for the traceable ABE objects.
//!
//! Group elements use their compressed encoding, lengths and integers are
//! LEB128-encoded. Arrays indexed by grid rows or columns are not prefixed by
//! their length: it is given by the grid width.

use std::collections::BTreeMap;

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use cosmian_crypto_core::bytes_ser_de::{to_leb128_len, Deserializer, Serializable, Serializer};

use super::{
    AttributeComponent, CipherText, ElementVector, EncryptedAccessStructure, GridPosition,
    PrivateKey, PublicKey, SecretMasterKey, ShareComponent,
};
use crate::{
    abe_policy::AccessPolicy,
    access_structure::{AccessTree, LsssMatrix},
    bilinear::{
        from_bytes, hash_to_scalar, to_bytes, Curve, Gt, MirroredPoint, Scalar, G1, G1_LENGTH,
        G2, G2_LENGTH, GT_LENGTH, SCALAR_LENGTH,
    },
    hybrid::AbeEncrypted,
    Error,
};

/// Returns the byte length of a serialized option
macro_rules! serialize_len_option {
    ($option:expr, $value:ident, $method:expr) => {{
        let mut length = 1;
        if let Some($value) = &$option {
            length += $method;
        }
        length
    }};
}

/// Serialize an optional value as a LEB128-encoded unsigned integer followed by
/// the serialization of the contained value if any.
macro_rules! serialize_option {
    ($serializer:expr, $n:expr, $option:expr, $value:ident, $method:expr) => {{
        if let Some($value) = &$option {
            $n += $serializer.write_leb128_u64(1)?;
            $n += $method?;
        } else {
            $n += $serializer.write_leb128_u64(0)?;
        }
    }};
}

/// Deserialize an optional value from a LEB128-encoded unsigned integer
/// followed by the deserialization of the contained value if any.
macro_rules! deserialize_option {
    ($deserializer:expr, $method:expr) => {{
        let is_some = $deserializer.read_leb128_u64()?;
        if is_some == 1 {
            Some($method)
        } else {
            None
        }
    }};
}

/// Maximum nesting of serialized access trees.
const MAX_TREE_DEPTH: usize = 64;

const MATRIX_TAG: u8 = 0;
const TREE_TAG: u8 = 1;
const LEAF_TAG: u64 = 0;
const GATE_TAG: u64 = 1;
const ATTRIBUTE_TAG: u64 = 0;
const AND_TAG: u64 = 1;
const OR_TAG: u64 = 2;
const THRESHOLD_TAG: u64 = 3;

const SHARE_COMPONENT_LENGTH: usize = 3 * G1_LENGTH;
const G1_VECTOR_LENGTH: usize = 3 * G1_LENGTH;
const G2_VECTOR_LENGTH: usize = 3 * G2_LENGTH;

fn write_element<T: CanonicalSerialize, const LENGTH: usize>(
    ser: &mut Serializer,
    element: &T,
) -> Result<usize, Error> {
    Ok(ser.write_array(&to_bytes::<T, LENGTH>(element)?)?)
}

fn read_element<T: CanonicalDeserialize, const LENGTH: usize>(
    de: &mut Deserializer,
) -> Result<T, Error> {
    from_bytes(&de.read_array::<LENGTH>()?)
}

fn write_scalar(ser: &mut Serializer, s: &Scalar) -> Result<usize, Error> {
    write_element::<_, SCALAR_LENGTH>(ser, s)
}

fn read_scalar(de: &mut Deserializer) -> Result<Scalar, Error> {
    read_element::<_, SCALAR_LENGTH>(de)
}

fn write_g1(ser: &mut Serializer, p: &G1) -> Result<usize, Error> {
    write_element::<_, G1_LENGTH>(ser, p)
}

fn read_g1(de: &mut Deserializer) -> Result<G1, Error> {
    read_element::<_, G1_LENGTH>(de)
}

fn write_g2(ser: &mut Serializer, p: &G2) -> Result<usize, Error> {
    write_element::<_, G2_LENGTH>(ser, p)
}

fn read_g2(de: &mut Deserializer) -> Result<G2, Error> {
    read_element::<_, G2_LENGTH>(de)
}

fn write_gt(ser: &mut Serializer, e: &Gt) -> Result<usize, Error> {
    write_element::<_, GT_LENGTH>(ser, e)
}

fn read_gt(de: &mut Deserializer) -> Result<Gt, Error> {
    read_element::<_, GT_LENGTH>(de)
}

fn write_mirrored(ser: &mut Serializer, p: &MirroredPoint) -> Result<usize, Error> {
    Ok(write_g1(ser, &p.g1)? + write_g2(ser, &p.g2)?)
}

fn read_mirrored(de: &mut Deserializer) -> Result<MirroredPoint, Error> {
    Ok(MirroredPoint {
        g1: read_g1(de)?,
        g2: read_g2(de)?,
    })
}

fn write_g1_vector(ser: &mut Serializer, v: &ElementVector<G1>) -> Result<usize, Error> {
    write_all(ser, &v.0, write_g1)
}

fn read_g1_vector(de: &mut Deserializer) -> Result<ElementVector<G1>, Error> {
    Ok(ElementVector([read_g1(de)?, read_g1(de)?, read_g1(de)?]))
}

fn write_g2_vector(ser: &mut Serializer, v: &ElementVector<G2>) -> Result<usize, Error> {
    write_all(ser, &v.0, write_g2)
}

fn read_g2_vector(de: &mut Deserializer) -> Result<ElementVector<G2>, Error> {
    Ok(ElementVector([read_g2(de)?, read_g2(de)?, read_g2(de)?]))
}

fn write_all<T>(
    ser: &mut Serializer,
    elements: &[T],
    write: fn(&mut Serializer, &T) -> Result<usize, Error>,
) -> Result<usize, Error> {
    let mut n = 0;
    for element in elements {
        n += write(ser, element)?;
    }
    Ok(n)
}

fn read_n<T>(
    de: &mut Deserializer,
    n: usize,
    read: fn(&mut Deserializer) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let mut res = Vec::new();
    for _ in 0..n {
        res.push(read(de)?);
    }
    Ok(res)
}

fn read_length(de: &mut Deserializer) -> Result<usize, Error> {
    Ok(usize::try_from(de.read_leb128_u64()?)?)
}

fn read_grid_width(de: &mut Deserializer) -> Result<usize, Error> {
    let m = read_length(de)?;
    if !(2..=u32::MAX as usize).contains(&m) {
        return Err(Error::Serialization(format!("invalid grid width {m}")));
    }
    Ok(m)
}

fn write_string(ser: &mut Serializer, s: &str) -> Result<usize, Error> {
    Ok(ser.write_vec(s.as_bytes())?)
}

fn read_string(de: &mut Deserializer) -> Result<String, Error> {
    String::from_utf8(de.read_vec()?).map_err(|e| Error::Serialization(e.to_string()))
}

fn string_length(s: &str) -> usize {
    to_leb128_len(s.len()) + s.len()
}

impl Serializable for PublicKey {
    type Error = Error;

    fn length(&self) -> usize {
        1 + to_leb128_len(self.m)
            + 5 * MirroredPoint::LENGTH
            + self.m * (3 * MirroredPoint::LENGTH + GT_LENGTH + G2_LENGTH)
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Self::Error> {
        let mut n = ser.write_array(&[self.curve.to_byte()])?;
        n += ser.write_leb128_u64(self.m as u64)?;
        for p in [&self.g, &self.h, &self.f, &self.big_g, &self.big_h] {
            n += write_mirrored(ser, p)?;
        }
        n += write_all(ser, &self.f_j, write_mirrored)?;
        n += write_all(ser, &self.e_i, write_gt)?;
        n += write_all(ser, &self.g_i, write_mirrored)?;
        n += write_all(ser, &self.z_i, write_mirrored)?;
        n += write_all(ser, &self.h_j, write_g2)?;
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Self::Error> {
        let curve = Curve::from_byte(de.read_array::<1>()?[0])?;
        let m = read_grid_width(de)?;
        Ok(Self {
            curve,
            m,
            g: read_mirrored(de)?,
            h: read_mirrored(de)?,
            f: read_mirrored(de)?,
            big_g: read_mirrored(de)?,
            big_h: read_mirrored(de)?,
            f_j: read_n(de, m, read_mirrored)?,
            e_i: read_n(de, m, read_gt)?,
            g_i: read_n(de, m, read_mirrored)?,
            z_i: read_n(de, m, read_mirrored)?,
            h_j: read_n(de, m, read_g2)?,
        })
    }
}

impl Serializable for SecretMasterKey {
    type Error = Error;

    fn length(&self) -> usize {
        self.public_key.length()
            + 3 * self.public_key.m * SCALAR_LENGTH
            + to_leb128_len(self.counter)
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Self::Error> {
        let mut n = self.public_key.write(ser)?;
        n += write_all(ser, &self.alpha_i, write_scalar)?;
        n += write_all(ser, &self.r_i, write_scalar)?;
        n += write_all(ser, &self.c_j, write_scalar)?;
        n += ser.write_leb128_u64(self.counter as u64)?;
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Self::Error> {
        let public_key = PublicKey::read(de)?;
        let m = public_key.m;
        let alpha_i = read_n(de, m, read_scalar)?;
        let r_i = read_n(de, m, read_scalar)?;
        let c_j = read_n(de, m, read_scalar)?;
        let counter = read_length(de)?;
        if counter > public_key.capacity() {
            return Err(Error::Serialization(format!(
                "slot counter {counter} exceeds the grid capacity"
            )));
        }
        Ok(Self {
            public_key,
            alpha_i,
            r_i,
            c_j,
            counter,
        })
    }
}

impl AttributeComponent {
    fn length(&self) -> usize {
        string_length(&self.attribute) + 2 * G2_LENGTH
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Error> {
        let mut n = write_string(ser, &self.attribute)?;
        n += write_g2(ser, &self.k1)?;
        n += write_g2(ser, &self.k2)?;
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Error> {
        let attribute = read_string(de)?;
        Ok(Self {
            hashed_attribute: hash_to_scalar(&attribute),
            attribute,
            k1: read_g2(de)?,
            k2: read_g2(de)?,
        })
    }
}

impl Serializable for PrivateKey {
    type Error = Error;

    fn length(&self) -> usize {
        let mut length = to_leb128_len(self.position.grid_width())
            + to_leb128_len(self.position.counter())
            + 3 * G2_LENGTH
            + to_leb128_len(self.components.len())
            + to_leb128_len(self.additional_data.len());
        for k in &self.k_ijj {
            length += serialize_len_option!(k, _value, G2_LENGTH);
        }
        for component in &self.components {
            length += component.length();
        }
        for (name, data) in &self.additional_data {
            length += string_length(name) + to_leb128_len(data.len()) + data.len();
        }
        length
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Self::Error> {
        let mut n = ser.write_leb128_u64(self.position.grid_width() as u64)?;
        n += ser.write_leb128_u64(self.position.counter() as u64)?;
        n += write_g2(ser, &self.k1)?;
        n += write_g2(ser, &self.k2)?;
        n += write_g2(ser, &self.k3)?;
        for k in &self.k_ijj {
            serialize_option!(ser, n, k, value, write_g2(ser, value));
        }
        n += ser.write_leb128_u64(self.components.len() as u64)?;
        for component in &self.components {
            n += component.write(ser)?;
        }
        n += ser.write_leb128_u64(self.additional_data.len() as u64)?;
        for (name, data) in &self.additional_data {
            n += write_string(ser, name)?;
            n += ser.write_vec(data)?;
        }
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Self::Error> {
        let m = read_grid_width(de)?;
        let position = GridPosition::new(m, read_length(de)?)?;
        let k1 = read_g2(de)?;
        let k2 = read_g2(de)?;
        let k3 = read_g2(de)?;
        let mut k_ijj = Vec::new();
        for _ in 0..m {
            k_ijj.push(deserialize_option!(de, read_g2(de)?));
        }
        let n_components = read_length(de)?;
        let components = read_n(de, n_components, AttributeComponent::read)?;
        let n_data = read_length(de)?;
        let mut additional_data = BTreeMap::new();
        for _ in 0..n_data {
            additional_data.insert(read_string(de)?, de.read_vec()?);
        }
        Ok(Self {
            position,
            k1,
            k2,
            k3,
            k_ijj,
            components,
            additional_data,
        })
    }
}

fn write_share(ser: &mut Serializer, share: &ShareComponent) -> Result<usize, Error> {
    Ok(write_g1(ser, &share.p1)? + write_g1(ser, &share.p2)? + write_g1(ser, &share.p3)?)
}

fn read_share(de: &mut Deserializer) -> Result<ShareComponent, Error> {
    Ok(ShareComponent {
        p1: read_g1(de)?,
        p2: read_g1(de)?,
        p3: read_g1(de)?,
    })
}

fn policy_length(policy: &AccessPolicy) -> usize {
    match policy {
        AccessPolicy::Attr(attribute) => 1 + string_length(attribute),
        AccessPolicy::And(lhs, rhs) | AccessPolicy::Or(lhs, rhs) => {
            1 + policy_length(lhs) + policy_length(rhs)
        }
        AccessPolicy::Threshold(threshold, children) => {
            1 + to_leb128_len(*threshold)
                + to_leb128_len(children.len())
                + children.iter().map(policy_length).sum::<usize>()
        }
    }
}

/// Writes the policy node by node so that any attribute name, and the exact
/// shape of the formula, survive the round trip.
fn write_policy(ser: &mut Serializer, policy: &AccessPolicy) -> Result<usize, Error> {
    match policy {
        AccessPolicy::Attr(attribute) => {
            Ok(ser.write_leb128_u64(ATTRIBUTE_TAG)? + write_string(ser, attribute)?)
        }
        AccessPolicy::And(lhs, rhs) | AccessPolicy::Or(lhs, rhs) => {
            let tag = if matches!(policy, AccessPolicy::And(..)) {
                AND_TAG
            } else {
                OR_TAG
            };
            let mut n = ser.write_leb128_u64(tag)?;
            n += write_policy(ser, lhs)?;
            n += write_policy(ser, rhs)?;
            Ok(n)
        }
        AccessPolicy::Threshold(threshold, children) => {
            let mut n = ser.write_leb128_u64(THRESHOLD_TAG)?;
            n += ser.write_leb128_u64(*threshold as u64)?;
            n += ser.write_leb128_u64(children.len() as u64)?;
            for child in children {
                n += write_policy(ser, child)?;
            }
            Ok(n)
        }
    }
}

fn read_policy(de: &mut Deserializer, depth: usize) -> Result<AccessPolicy, Error> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::Serialization(
            "access policy nesting is too deep".to_string(),
        ));
    }
    match de.read_leb128_u64()? {
        ATTRIBUTE_TAG => Ok(AccessPolicy::Attr(read_string(de)?)),
        AND_TAG => Ok(read_policy(de, depth + 1)? & read_policy(de, depth + 1)?),
        OR_TAG => Ok(read_policy(de, depth + 1)? | read_policy(de, depth + 1)?),
        THRESHOLD_TAG => {
            let threshold = read_length(de)?;
            let n_children = read_length(de)?;
            if n_children < 2 || threshold < 1 || threshold > n_children {
                return Err(Error::Serialization(format!(
                    "invalid gate {threshold} of {n_children}"
                )));
            }
            let mut children = Vec::new();
            for _ in 0..n_children {
                children.push(read_policy(de, depth + 1)?);
            }
            Ok(AccessPolicy::Threshold(threshold, children))
        }
        tag => Err(Error::Serialization(format!("unknown policy node tag {tag}"))),
    }
}

fn matrix_length(matrix: &LsssMatrix) -> usize {
    let mut length = to_leb128_len(matrix.rows().len()) + to_leb128_len(matrix.columns());
    for row in matrix.rows() {
        length += string_length(row.attribute())
            + row.coefficients().len() * SCALAR_LENGTH
            + SHARE_COMPONENT_LENGTH;
    }
    length
}

fn tree_length(tree: &AccessTree<ShareComponent>) -> usize {
    match tree {
        AccessTree::Leaf { attribute, .. } => {
            to_leb128_len(LEAF_TAG as usize) + string_length(attribute) + SHARE_COMPONENT_LENGTH
        }
        AccessTree::Gate {
            threshold,
            children,
        } => {
            to_leb128_len(GATE_TAG as usize)
                + to_leb128_len(*threshold)
                + to_leb128_len(children.len())
                + children.iter().map(tree_length).sum::<usize>()
        }
    }
}

fn write_tree(ser: &mut Serializer, tree: &AccessTree<ShareComponent>) -> Result<usize, Error> {
    match tree {
        AccessTree::Leaf {
            attribute, payload, ..
        } => {
            let mut n = ser.write_leb128_u64(LEAF_TAG)?;
            n += write_string(ser, attribute)?;
            n += write_share(ser, payload)?;
            Ok(n)
        }
        AccessTree::Gate {
            threshold,
            children,
        } => {
            let mut n = ser.write_leb128_u64(GATE_TAG)?;
            n += ser.write_leb128_u64(*threshold as u64)?;
            n += ser.write_leb128_u64(children.len() as u64)?;
            for child in children {
                n += write_tree(ser, child)?;
            }
            Ok(n)
        }
    }
}

fn read_tree(de: &mut Deserializer, depth: usize) -> Result<AccessTree<ShareComponent>, Error> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::Serialization(
            "access tree nesting is too deep".to_string(),
        ));
    }
    match de.read_leb128_u64()? {
        LEAF_TAG => {
            let attribute = read_string(de)?;
            Ok(AccessTree::Leaf {
                hashed_attribute: hash_to_scalar(&attribute),
                attribute,
                payload: read_share(de)?,
            })
        }
        GATE_TAG => {
            let threshold = read_length(de)?;
            let n_children = read_length(de)?;
            if n_children < 2 || threshold < 1 || threshold > n_children {
                return Err(Error::Serialization(format!(
                    "invalid gate {threshold} of {n_children}"
                )));
            }
            let mut children = Vec::new();
            for _ in 0..n_children {
                children.push(read_tree(de, depth + 1)?);
            }
            Ok(AccessTree::Gate {
                threshold,
                children,
            })
        }
        tag => Err(Error::Serialization(format!("unknown tree node tag {tag}"))),
    }
}

impl Serializable for CipherText {
    type Error = Error;

    fn length(&self) -> usize {
        let m = self.grid_width();
        let structure_length = match &self.access_structure {
            EncryptedAccessStructure::Matrix { matrix, .. } => matrix_length(matrix),
            EncryptedAccessStructure::Tree(tree) => tree_length(tree),
        };
        policy_length(&self.policy)
            + 1
            + structure_length
            + to_leb128_len(m)
            + m * (2 * G1_VECTOR_LENGTH + 3 * G1_LENGTH + GT_LENGTH + 2 * G2_VECTOR_LENGTH)
            + to_leb128_len(self.revoked.len())
            + self.revoked.iter().map(|s| to_leb128_len(*s)).sum::<usize>()
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Self::Error> {
        let mut n = write_policy(ser, &self.policy)?;
        match &self.access_structure {
            EncryptedAccessStructure::Matrix { matrix, components } => {
                n += ser.write_array(&[MATRIX_TAG])?;
                n += ser.write_leb128_u64(matrix.rows().len() as u64)?;
                n += ser.write_leb128_u64(matrix.columns() as u64)?;
                for (row, share) in matrix.rows().iter().zip(components) {
                    n += write_string(ser, row.attribute())?;
                    n += write_all(ser, row.coefficients(), write_scalar)?;
                    n += write_share(ser, share)?;
                }
            }
            EncryptedAccessStructure::Tree(tree) => {
                n += ser.write_array(&[TREE_TAG])?;
                n += write_tree(ser, tree)?;
            }
        }
        n += ser.write_leb128_u64(self.grid_width() as u64)?;
        n += write_all(ser, &self.r1, write_g1_vector)?;
        n += write_all(ser, &self.r2, write_g1_vector)?;
        n += write_all(ser, &self.q1, write_g1)?;
        n += write_all(ser, &self.q2, write_g1)?;
        n += write_all(ser, &self.q3, write_g1)?;
        n += write_all(ser, &self.t, write_gt)?;
        n += write_all(ser, &self.c1, write_g2_vector)?;
        n += write_all(ser, &self.c2, write_g2_vector)?;
        n += ser.write_leb128_u64(self.revoked.len() as u64)?;
        for slot in &self.revoked {
            n += ser.write_leb128_u64(*slot as u64)?;
        }
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Self::Error> {
        let policy = read_policy(de, 0)?;
        let access_structure = match de.read_array::<1>()?[0] {
            MATRIX_TAG => {
                let n_rows = read_length(de)?;
                let columns = read_length(de)?;
                let mut rows = Vec::new();
                let mut components = Vec::new();
                for _ in 0..n_rows {
                    let attribute = read_string(de)?;
                    rows.push((attribute, read_n(de, columns, read_scalar)?));
                    components.push(read_share(de)?);
                }
                EncryptedAccessStructure::Matrix {
                    matrix: LsssMatrix::from_rows(rows)?,
                    components,
                }
            }
            TREE_TAG => EncryptedAccessStructure::Tree(read_tree(de, 0)?),
            tag => {
                return Err(Error::Serialization(format!(
                    "unknown access structure tag {tag}"
                )))
            }
        };
        let m = read_grid_width(de)?;
        let r1 = read_n(de, m, read_g1_vector)?;
        let r2 = read_n(de, m, read_g1_vector)?;
        let q1 = read_n(de, m, read_g1)?;
        let q2 = read_n(de, m, read_g1)?;
        let q3 = read_n(de, m, read_g1)?;
        let t = read_n(de, m, read_gt)?;
        let c1 = read_n(de, m, read_g2_vector)?;
        let c2 = read_n(de, m, read_g2_vector)?;
        let n_revoked = read_length(de)?;
        let mut revoked = Vec::new();
        for _ in 0..n_revoked {
            revoked.push(read_length(de)?);
        }
        if revoked.windows(2).any(|w| w[0] >= w[1]) || revoked.iter().any(|s| *s >= m * m) {
            return Err(Error::Serialization(
                "revoked slots must be sorted and inside the user grid".to_string(),
            ));
        }
        Ok(Self {
            policy,
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
        })
    }
}

impl Serializable for AbeEncrypted {
    type Error = Error;

    fn length(&self) -> usize {
        self.cipher_text.length() + to_leb128_len(self.data.len()) + self.data.len()
    }

    fn write(&self, ser: &mut Serializer) -> Result<usize, Self::Error> {
        let mut n = self.cipher_text.write(ser)?;
        n += ser.write_vec(&self.data)?;
        Ok(n)
    }

    fn read(de: &mut Deserializer) -> Result<Self, Self::Error> {
        Ok(Self {
            cipher_text: CipherText::read(de)?,
            data: de.read_vec()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use cosmian_crypto_core::{reexport::rand_core::SeedableRng, CsRng};

    use super::*;
    use crate::{
        access_structure::AccessStructureKind,
        core::primitives::{decrypt, encrypt, keygen, setup},
        hybrid::{decrypt_data, encrypt_data},
        core::primitives::DecryptionOptions,
    };

    #[test]
    fn test_serialization() -> Result<(), Error> {
        let mut rng = CsRng::from_entropy();
        let (mpk, mut msk) = setup(&mut rng, 4)?;

        let bytes = mpk.serialize()?;
        assert_eq!(bytes.len(), mpk.length());
        assert_eq!(PublicKey::deserialize(&bytes)?, mpk);

        let (sigma, slot) = msk.issue_user_slot(&mut rng)?;
        let bytes = msk.serialize()?;
        assert_eq!(bytes.len(), msk.length());
        assert_eq!(SecretMasterKey::deserialize(&bytes)?, msk);

        let mut usk = keygen(&mut rng, &msk, &sigma, slot, &["att1", "att2"])?
            .ok_or_else(|| Error::Key("reserved slot".to_string()))?;
        usk.set_additional_data("owner".to_string(), b"alice".to_vec());
        let bytes = usk.serialize()?;
        assert_eq!(bytes.len(), usk.length());
        let usk_ = PrivateKey::deserialize(&bytes)?;
        assert_eq!(usk_, usk);

        for kind in [AccessStructureKind::Matrix, AccessStructureKind::Tree] {
            let policy = AccessPolicy::parse("(att1 and att2) or 2 of (att3, att4, att5)")?;
            let (ciphertext, secret) = encrypt(&mut rng, &mpk, &policy, kind, &[3, 1], 0)?;
            let bytes = ciphertext.serialize()?;
            assert_eq!(bytes.len(), ciphertext.length());
            let ciphertext_ = CipherText::deserialize(&bytes)?;
            assert_eq!(ciphertext_, ciphertext);
            assert_eq!(decrypt(&usk_, &ciphertext_)?, secret);
        }

        let encrypted = encrypt_data(
            &mut rng,
            &mpk,
            &AccessPolicy::parse("att1")?,
            AccessStructureKind::Matrix,
            &[],
            0,
            b"payload",
        )?;
        let encrypted_ = AbeEncrypted::deserialize(&encrypted.serialize()?)?;
        assert_eq!(encrypted_, encrypted);
        assert_eq!(
            &**decrypt_data(&usk_, &encrypted_, &DecryptionOptions::default())?,
            b"payload"
        );
        Ok(())
    }

    #[test]
    fn test_policy_shape_and_names() -> Result<(), Error> {
        let mut rng = CsRng::from_entropy();
        let (mpk, mut msk) = setup(&mut rng, 4)?;
        let (sigma, slot) = msk.issue_user_slot(&mut rng)?;
        let usk = keygen(&mut rng, &msk, &sigma, slot, &["a", "b", "c", "a b"])?
            .ok_or_else(|| Error::Key("reserved slot".to_string()))?;

        let right_nested =
            AccessPolicy::new("a") & (AccessPolicy::new("b") & AccessPolicy::new("c"));
        let unparsable = AccessPolicy::new("a b") | AccessPolicy::new("x, (or)");
        for policy in [right_nested, unparsable] {
            for kind in [AccessStructureKind::Matrix, AccessStructureKind::Tree] {
                let (ciphertext, secret) = encrypt(&mut rng, &mpk, &policy, kind, &[], 0)?;
                let bytes = ciphertext.serialize()?;
                assert_eq!(bytes.len(), ciphertext.length());
                let ciphertext_ = CipherText::deserialize(&bytes)?;
                assert_eq!(ciphertext_.policy(), &policy);
                assert_eq!(ciphertext_, ciphertext);
                assert_eq!(decrypt(&usk, &ciphertext_)?, secret);
            }
        }
        Ok(())
    }

    #[test]
    fn test_invalid_inputs() -> Result<(), Error> {
        let mut rng = CsRng::from_entropy();
        let (mpk, _) = setup(&mut rng, 2)?;
        let mut bytes = mpk.serialize()?;

        assert!(PublicKey::deserialize(&bytes[..bytes.len() - 1]).is_err());

        bytes[0] = 0;
        assert!(matches!(
            PublicKey::deserialize(&bytes),
            Err(Error::Serialization(_))
        ));
        Ok(())
    }
}
