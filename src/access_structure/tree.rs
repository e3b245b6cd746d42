//! Threshold access trees.
//!
//! A tree is built from the postfix token stream of a policy, where gates
//! are written `kofn`. The tree is generic over the payload carried by its
//! leaves: a bare policy tree carries nothing, an encrypted one carries the
//! ciphertext share of each leaf.

use std::collections::HashSet;

use ark_ff::{Field, One, Zero};
use cosmian_crypto_core::reexport::rand_core::CryptoRngCore;

use crate::{
    abe_policy::AccessPolicy,
    bilinear::{hash_to_scalar, random_scalar, Gt, Scalar},
    Error,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTree<L = ()> {
    Leaf {
        attribute: String,
        hashed_attribute: Scalar,
        payload: L,
    },
    Gate {
        threshold: usize,
        children: Vec<AccessTree<L>>,
    },
}

/// Records how a tree is satisfied: which children of each gate were picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Witness {
    Leaf,
    /// Picked children as `(index, witness)` pairs, indices in increasing
    /// order.
    Gate(Vec<(usize, Witness)>),
}

/// Parses a `kofn` gate token.
fn parse_gate(token: &str) -> Option<(usize, usize)> {
    let (k, n) = token.split_once("of")?;
    Some((k.parse().ok()?, n.parse().ok()?))
}

impl AccessTree {
    /// Builds a tree from a postfix token stream.
    ///
    /// # Error
    ///
    /// Gates must have a threshold in `1..=n` and at least two children, and
    /// the stream must describe exactly one tree.
    pub fn from_postfix<S: AsRef<str>>(tokens: &[S]) -> Result<Self, Error> {
        let mut stack = Vec::<Self>::new();
        for token in tokens {
            let token = token.as_ref();
            match parse_gate(token) {
                Some((threshold, n)) => {
                    if threshold < 1 {
                        return Err(Error::Encryption(format!(
                            "gate {token} is trivially satisfied"
                        )));
                    }
                    if threshold > n {
                        return Err(Error::Encryption(format!(
                            "gate {token} cannot be satisfied"
                        )));
                    }
                    if n == 1 {
                        return Err(Error::Encryption(format!(
                            "gate {token} is the identity operator"
                        )));
                    }
                    if stack.len() < n {
                        return Err(Error::Encryption(format!(
                            "stack underflow at gate {token}"
                        )));
                    }
                    let children = stack.split_off(stack.len() - n);
                    stack.push(Self::Gate {
                        threshold,
                        children,
                    });
                }
                None => stack.push(Self::Leaf {
                    attribute: token.to_string(),
                    hashed_attribute: hash_to_scalar(token),
                    payload: (),
                }),
            }
        }
        match stack.len() {
            0 => Err(Error::Encryption("empty policy".to_string())),
            1 => stack
                .pop()
                .ok_or_else(|| Error::Encryption("empty policy".to_string())),
            n => Err(Error::Encryption(format!(
                "{} nodes left on the stack, missing gates",
                n - 1
            ))),
        }
    }

    pub fn from_policy(policy: &AccessPolicy) -> Result<Self, Error> {
        Self::from_postfix(&policy.to_postfix())
    }

    /// Shares `secret` among the leaves: each gate of threshold `t` draws a
    /// random polynomial `q` of degree `t - 1` with `q(0)` set to its share,
    /// child `i` receives `q(i + 1)`. `leaf` is called with every leaf and
    /// its share to build its payload.
    pub fn share<T>(
        &self,
        rng: &mut impl CryptoRngCore,
        secret: Scalar,
        leaf: &mut impl FnMut(&mut dyn CryptoRngCore, &Scalar, Scalar) -> Result<T, Error>,
    ) -> Result<AccessTree<T>, Error> {
        match self {
            Self::Leaf {
                attribute,
                hashed_attribute,
                ..
            } => Ok(AccessTree::Leaf {
                attribute: attribute.clone(),
                hashed_attribute: *hashed_attribute,
                payload: leaf(rng, hashed_attribute, secret)?,
            }),
            Self::Gate {
                threshold,
                children,
            } => {
                let mut coefficients = Vec::with_capacity(*threshold);
                coefficients.push(secret);
                for _ in 1..*threshold {
                    coefficients.push(random_scalar(rng));
                }
                let children = children
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        let share = evaluate(&coefficients, &Scalar::from(i as u64 + 1));
                        child.share(rng, share, leaf)
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(AccessTree::Gate {
                    threshold: *threshold,
                    children,
                })
            }
        }
    }
}

impl<L> AccessTree<L> {
    /// Returns the attributes of the leaves, in order.
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        match self {
            Self::Leaf { attribute, .. } => vec![attribute.as_str()],
            Self::Gate { children, .. } => children.iter().flat_map(Self::attributes).collect(),
        }
    }

    #[must_use]
    pub fn is_satisfied_by(&self, attributes: &HashSet<Scalar>) -> bool {
        self.witness(attributes).is_some()
    }

    /// Evaluates the tree against hashed attributes. Each satisfied gate
    /// keeps the `threshold` satisfied children with the fewest leaves.
    ///
    /// Returns `None` if the tree is not satisfied.
    #[must_use]
    pub fn witness(&self, attributes: &HashSet<Scalar>) -> Option<Witness> {
        self.min_leaves_witness(attributes).map(|(w, _)| w)
    }

    fn min_leaves_witness(&self, attributes: &HashSet<Scalar>) -> Option<(Witness, usize)> {
        match self {
            Self::Leaf {
                hashed_attribute, ..
            } => attributes
                .contains(hashed_attribute)
                .then_some((Witness::Leaf, 1)),
            Self::Gate {
                threshold,
                children,
            } => {
                let mut satisfied = children
                    .iter()
                    .enumerate()
                    .filter_map(|(i, child)| {
                        child
                            .min_leaves_witness(attributes)
                            .map(|(w, leaves)| (i, w, leaves))
                    })
                    .collect::<Vec<_>>();
                if satisfied.len() < *threshold {
                    return None;
                }
                satisfied.sort_by_key(|(i, _, leaves)| (*leaves, *i));
                satisfied.truncate(*threshold);
                satisfied.sort_by_key(|(i, _, _)| *i);
                let leaves = satisfied.iter().map(|(_, _, leaves)| leaves).sum();
                Some((
                    Witness::Gate(satisfied.into_iter().map(|(i, w, _)| (i, w)).collect()),
                    leaves,
                ))
            }
        }
    }

    /// Recombines leaf values along `witness` with Lagrange coefficients at
    /// zero. `leaf` maps the attribute, hashed attribute and payload of a
    /// leaf to its `GT` contribution.
    pub fn recombine(
        &self,
        witness: &Witness,
        leaf: &mut impl FnMut(&str, &Scalar, &L) -> Result<Gt, Error>,
    ) -> Result<Gt, Error> {
        match (self, witness) {
            (
                Self::Leaf {
                    attribute,
                    hashed_attribute,
                    payload,
                },
                Witness::Leaf,
            ) => leaf(attribute, hashed_attribute, payload),
            (Self::Gate { children, .. }, Witness::Gate(picked)) => {
                let indices = picked
                    .iter()
                    .map(|(i, _)| Scalar::from(*i as u64 + 1))
                    .collect::<Vec<_>>();
                let mut res = Gt::zero();
                for ((i, w), x) in picked.iter().zip(&indices) {
                    let child = children.get(*i).ok_or_else(|| {
                        Error::Other(format!("witness refers to a missing child {i}"))
                    })?;
                    res += child.recombine(w, leaf)? * lagrange_at_zero(x, &indices)?;
                }
                Ok(res)
            }
            _ => Err(Error::Other(
                "witness does not match the access tree".to_string(),
            )),
        }
    }
}

/// Evaluates the polynomial with the given coefficients at `x`.
fn evaluate(coefficients: &[Scalar], x: &Scalar) -> Scalar {
    coefficients
        .iter()
        .rev()
        .fold(Scalar::zero(), |acc, c| acc * x + c)
}

/// Computes `Π_{j ∈ S, j ≠ i} (0 - j) / (i - j)`.
fn lagrange_at_zero(i: &Scalar, indices: &[Scalar]) -> Result<Scalar, Error> {
    let mut res = Scalar::one();
    for j in indices.iter().filter(|j| *j != i) {
        let denominator = (*i - j)
            .inverse()
            .ok_or_else(|| Error::Other("repeated Lagrange index".to_string()))?;
        res *= -*j * denominator;
    }
    Ok(res)
}
