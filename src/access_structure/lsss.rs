//! Linear secret sharing matrices.
//!
//! Boolean formulas are converted with the Lewko-Waters algorithm
//! (<https://eprint.iacr.org/2010/351>), formulas with threshold gates with
//! the Liu-Cao-Wong insertion algorithm.

use std::collections::HashSet;

use ark_ff::{One, Zero};
use tracing::{debug, trace};

use crate::{
    abe_policy::{AccessPolicy, Gate},
    bilinear::{hash_to_scalar, Scalar},
    core::matrix::Matrix,
    DecryptionError, Error,
};

/// Row of the share matrix, labelled by an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsssRow {
    pub(crate) attribute: String,
    pub(crate) hashed_attribute: Scalar,
    pub(crate) coefficients: Vec<Scalar>,
}

impl LsssRow {
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[must_use]
    pub fn coefficients(&self) -> &[Scalar] {
        &self.coefficients
    }
}

/// Share-generating matrix. An attribute may label several rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsssMatrix {
    rows: Vec<LsssRow>,
    columns: usize,
}

impl LsssMatrix {
    /// Builds the matrix of the given policy, using Lewko-Waters for pure
    /// boolean formulas and the threshold insertion otherwise.
    #[must_use]
    pub fn from_policy(policy: &AccessPolicy) -> Self {
        if policy.has_threshold_gate() {
            Self::from_threshold_policy(policy)
        } else {
            let mut counter = 1;
            let mut rows = Vec::new();
            lewko_waters(policy, vec![Scalar::one()], &mut counter, &mut rows);
            Self::with_labels(rows, counter)
        }
    }

    /// Builds the matrix of a boolean formula with the Lewko-Waters algorithm.
    ///
    /// # Error
    ///
    /// Threshold gates are not supported by this construction.
    pub fn from_boolean_policy(policy: &AccessPolicy) -> Result<Self, Error> {
        if policy.has_threshold_gate() {
            return Err(Error::Encryption(format!(
                "the boolean LSSS construction does not support threshold gates: {policy}"
            )));
        }
        Ok(Self::from_policy(policy))
    }

    /// Builds the matrix with the Liu-Cao-Wong insertion algorithm: a
    /// `t`-of-`n` gate labelled by the vector `v` is replaced by `n` rows
    /// `v || (i, i^2, ..., i^(t-1))`, `i` in `1..=n`.
    #[must_use]
    pub fn from_threshold_policy(policy: &AccessPolicy) -> Self {
        let mut columns = 1;
        let mut rows = Vec::new();
        insert_gate(&policy.to_gates(), vec![Scalar::one()], &mut columns, &mut rows);
        Self::with_labels(rows, columns)
    }

    fn with_labels(rows: Vec<(String, Vec<Scalar>)>, columns: usize) -> Self {
        let rows = rows
            .into_iter()
            .map(|(attribute, mut coefficients)| {
                coefficients.resize(columns, Scalar::zero());
                LsssRow {
                    hashed_attribute: hash_to_scalar(&attribute),
                    attribute,
                    coefficients,
                }
            })
            .collect();
        Self { rows, columns }
    }

    /// Rebuilds a matrix from its labelled rows.
    ///
    /// # Error
    ///
    /// All rows must have the same length.
    pub fn from_rows(rows: Vec<(String, Vec<Scalar>)>) -> Result<Self, Error> {
        let columns = rows.first().map_or(0, |(_, c)| c.len());
        if rows.iter().any(|(_, c)| c.len() != columns) {
            return Err(Error::InvalidSize(
                "LSSS rows must have the same length".to_string(),
            ));
        }
        Ok(Self::with_labels(rows, columns))
    }

    #[must_use]
    pub fn rows(&self) -> &[LsssRow] {
        &self.rows
    }

    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Computes the shares `λ_k = A_k · u`.
    #[must_use]
    pub fn share(&self, u: &[Scalar]) -> Vec<Scalar> {
        self.rows
            .iter()
            .map(|row| {
                row.coefficients
                    .iter()
                    .zip(u)
                    .map(|(a, u)| *a * u)
                    .sum()
            })
            .collect()
    }

    /// Finds weights `w` over rows labelled by the given attributes such that
    /// `Σ w_k · A_k = (1, 0, ..., 0)`.
    ///
    /// Row subsets are tried by increasing size. Subsets whose attributes do
    /// not satisfy `policy` are skipped, and so are subsets with no solution.
    /// At most `budget` satisfying subsets are examined if given.
    ///
    /// Returns the `(row index, weight)` pairs of the first verified subset.
    pub fn reconstruction(
        &self,
        attributes: &HashSet<Scalar>,
        policy: &AccessPolicy,
        budget: Option<usize>,
    ) -> Result<Vec<(usize, Scalar)>, Error> {
        let candidates = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| attributes.contains(&row.hashed_attribute))
            .map(|(k, _)| k)
            .collect::<Vec<_>>();

        let mut examined = 0;
        for subset in SortedPowerSet::new(&candidates) {
            if budget.is_some_and(|budget| examined >= budget) {
                debug!(examined, "LSSS candidate budget exhausted");
                break;
            }
            let labels = subset
                .iter()
                .map(|&k| self.rows[k].attribute.as_str())
                .collect::<HashSet<_>>();
            if !policy.is_satisfied_by(&labels) {
                continue;
            }
            examined += 1;
            trace!(?subset, "trying LSSS candidate");
            if let Some(weights) = self.weights(&subset) {
                debug!(examined, size = subset.len(), "found LSSS solution");
                return Ok(subset.into_iter().zip(weights).collect());
            }
        }
        Err(DecryptionError::NoLsssSolution(examined).into())
    }

    /// Solves `A_S^T · w = e_1` for the rows in `subset`.
    fn weights(&self, subset: &[usize]) -> Option<Vec<Scalar>> {
        let support = (0..self.columns)
            .filter(|&c| subset.iter().any(|&k| !self.rows[k].coefficients[c].is_zero()))
            .collect::<Vec<_>>();

        let weights = if support.len() == subset.len() && support.first() == Some(&0) {
            // Square case: the first column of `(A_S|support)^T^-1`.
            let m = Matrix::from_rows(
                subset
                    .iter()
                    .map(|&k| {
                        support
                            .iter()
                            .map(|&c| self.rows[k].coefficients[c])
                            .collect()
                    })
                    .collect(),
            )
            .ok()?;
            let inverse = m.transpose().inverse()?;
            (0..subset.len()).map(|k| *inverse.get(k, 0)).collect()
        } else {
            let m = Matrix::from_rows(
                subset
                    .iter()
                    .map(|&k| self.rows[k].coefficients.clone())
                    .collect(),
            )
            .ok()?;
            let mut target = vec![Scalar::zero(); self.columns];
            target[0] = Scalar::one();
            m.transpose().solve(&target)?
        };

        self.verify(subset, &weights).then_some(weights)
    }

    /// Checks that the weighted rows sum to the unit vector on every column.
    fn verify(&self, subset: &[usize], weights: &[Scalar]) -> bool {
        (0..self.columns).all(|c| {
            let sum: Scalar = subset
                .iter()
                .zip(weights)
                .map(|(&k, w)| self.rows[k].coefficients[c] * w)
                .sum();
            if c == 0 {
                sum.is_one()
            } else {
                sum.is_zero()
            }
        })
    }
}

fn lewko_waters(
    policy: &AccessPolicy,
    vector: Vec<Scalar>,
    counter: &mut usize,
    rows: &mut Vec<(String, Vec<Scalar>)>,
) {
    match policy {
        AccessPolicy::Attr(attribute) => rows.push((attribute.clone(), vector)),
        AccessPolicy::Or(lhs, rhs) => {
            lewko_waters(lhs, vector.clone(), counter, rows);
            lewko_waters(rhs, vector, counter, rows);
        }
        AccessPolicy::And(lhs, rhs) => {
            let mut left = vector;
            left.resize(*counter, Scalar::zero());
            left.push(Scalar::one());
            let mut right = vec![Scalar::zero(); *counter];
            right.push(-Scalar::one());
            *counter += 1;
            lewko_waters(lhs, left, counter, rows);
            lewko_waters(rhs, right, counter, rows);
        }
        AccessPolicy::Threshold(..) => {
            // gates nested in a boolean formula fall back to the insertion
            insert_gate(&policy.to_gates(), vector, counter, rows);
        }
    }
}

fn insert_gate(
    gate: &Gate<'_>,
    vector: Vec<Scalar>,
    columns: &mut usize,
    rows: &mut Vec<(String, Vec<Scalar>)>,
) {
    match gate {
        Gate::Leaf(attribute) => rows.push(((*attribute).to_string(), vector)),
        Gate::Node(threshold, children) => {
            let mut base = vector;
            base.resize(*columns, Scalar::zero());
            *columns += threshold - 1;
            for (i, child) in children.iter().enumerate() {
                // powers of the child index grow past any machine integer
                let x = Scalar::from(i as u64 + 1);
                let mut v = base.clone();
                let mut power = Scalar::one();
                for _ in 1..*threshold {
                    power *= x;
                    v.push(power);
                }
                insert_gate(child, v, columns, rows);
            }
        }
    }
}

/// Iterates over the subsets of a slice by increasing size, each size in
/// lexicographic order.
pub(crate) struct SortedPowerSet<'a, T> {
    items: &'a [T],
    size: usize,
    indices: Vec<usize>,
}

impl<'a, T> SortedPowerSet<'a, T> {
    pub(crate) fn new(items: &'a [T]) -> Self {
        Self {
            items,
            size: 1,
            indices: Vec::new(),
        }
    }
}

impl<T: Clone> Iterator for SortedPowerSet<'_, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.items.len();
        loop {
            if self.size > n {
                return None;
            }
            if self.indices.is_empty() {
                self.indices = (0..self.size).collect();
                break;
            }
            let k = self.size;
            if let Some(i) = (0..k).rev().find(|&i| self.indices[i] < n - k + i) {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                break;
            }
            self.size += 1;
            self.indices.clear();
        }
        Some(self.indices.iter().map(|&i| self.items[i].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bilinear::scalar_from_i64;

    fn scalars(values: &[i64]) -> Vec<Scalar> {
        values.iter().copied().map(scalar_from_i64).collect()
    }

    fn matrix_values(matrix: &LsssMatrix) -> Vec<Vec<Scalar>> {
        matrix
            .rows()
            .iter()
            .map(|row| row.coefficients().to_vec())
            .collect()
    }

    fn row_of<'a>(matrix: &'a LsssMatrix, attribute: &str) -> &'a [Scalar] {
        matrix
            .rows()
            .iter()
            .find(|row| row.attribute() == attribute)
            .map(LsssRow::coefficients)
            .unwrap()
    }

    #[test]
    fn test_lewko_waters_matrix() {
        let policy = AccessPolicy::parse("a and (d or (b and c))").unwrap();
        let matrix = LsssMatrix::from_boolean_policy(&policy).unwrap();
        assert_eq!(matrix.rows().len(), 4);
        assert_eq!(matrix.columns(), 3);
        assert_eq!(row_of(&matrix, "a"), scalars(&[1, 1, 0]));
        assert_eq!(row_of(&matrix, "b"), scalars(&[0, -1, 1]));
        assert_eq!(row_of(&matrix, "c"), scalars(&[0, 0, -1]));
        assert_eq!(row_of(&matrix, "d"), scalars(&[0, -1, 0]));
    }

    #[test]
    fn test_lewko_waters_nested_conjunctions() {
        // the counter must be shared between both sides of the root
        let policy = AccessPolicy::parse("(a and b) and (c and d)").unwrap();
        let matrix = LsssMatrix::from_boolean_policy(&policy).unwrap();
        assert_eq!(matrix.columns(), 4);
        let attributes = ["a", "b", "c", "d"]
            .iter()
            .map(|a| hash_to_scalar(a))
            .collect::<HashSet<_>>();
        let weights = matrix.reconstruction(&attributes, &policy, None).unwrap();
        assert_eq!(weights.len(), 4);
    }

    #[test]
    fn test_threshold_matrices() {
        let vectors: Vec<(&str, Vec<Vec<i64>>)> = vec![
            ("a and b and c", vec![vec![1, 1, 1], vec![1, 2, 4], vec![1, 3, 9]]),
            ("a or b or c", vec![vec![1], vec![1], vec![1]]),
            (
                "d or (a and b and c) or e",
                vec![vec![1, 0, 0], vec![1, 1, 1], vec![1, 2, 4], vec![1, 3, 9], vec![1, 0, 0]],
            ),
            (
                "d and (a or b or c) and e",
                vec![vec![1, 1, 1], vec![1, 2, 4], vec![1, 2, 4], vec![1, 2, 4], vec![1, 3, 9]],
            ),
            (
                "d and 2 of (a, b, c) and e",
                vec![
                    vec![1, 1, 1, 0],
                    vec![1, 2, 4, 1],
                    vec![1, 2, 4, 2],
                    vec![1, 2, 4, 3],
                    vec![1, 3, 9, 0],
                ],
            ),
            (
                "3 of (a, b, c, d)",
                vec![vec![1, 1, 1], vec![1, 2, 4], vec![1, 3, 9], vec![1, 4, 16]],
            ),
            (
                "3 of (e, f, g, 3 of (a, b, c, d))",
                vec![
                    vec![1, 1, 1, 0, 0],
                    vec![1, 2, 4, 0, 0],
                    vec![1, 3, 9, 0, 0],
                    vec![1, 4, 16, 1, 1],
                    vec![1, 4, 16, 2, 4],
                    vec![1, 4, 16, 3, 9],
                    vec![1, 4, 16, 4, 16],
                ],
            ),
            (
                "2 of (a, 2 of (c, d, e), b)",
                vec![vec![1, 1, 0], vec![1, 2, 1], vec![1, 2, 2], vec![1, 2, 3], vec![1, 3, 0]],
            ),
            (
                "2 of (a, 3 of (c, d, e), b)",
                vec![
                    vec![1, 1, 0, 0],
                    vec![1, 2, 1, 1],
                    vec![1, 2, 2, 4],
                    vec![1, 2, 3, 9],
                    vec![1, 3, 0, 0],
                ],
            ),
            (
                "1 of (a, 1 of (c, d, e), b)",
                vec![vec![1], vec![1], vec![1], vec![1], vec![1]],
            ),
        ];
        for (policy, expected) in vectors {
            let matrix =
                LsssMatrix::from_threshold_policy(&AccessPolicy::parse(policy).unwrap());
            assert_eq!(
                matrix_values(&matrix),
                expected.iter().map(|row| scalars(row)).collect::<Vec<_>>(),
                "policy: {policy}"
            );
        }
    }

    #[test]
    fn test_wide_threshold_gate() {
        // the conjunction becomes a 17-of-17 gate whose last row holds 17^16,
        // the nested gate adds one more column
        let expression = (0..16).fold("2 of (x, y, z)".to_string(), |acc, i| {
            format!("{acc} and a{i}")
        });
        let policy = AccessPolicy::parse(&expression).unwrap();
        let matrix = LsssMatrix::from_policy(&policy);
        assert_eq!(matrix.columns(), 18);
        let last = row_of(&matrix, "a15");
        let mut power = Scalar::one();
        for column in 1..17 {
            power *= Scalar::from(17u64);
            assert_eq!(last[column], power);
        }

        let attributes = ["x", "z"]
            .into_iter()
            .map(String::from)
            .chain((0..16).map(|i| format!("a{i}")))
            .map(|a| hash_to_scalar(&a))
            .collect::<HashSet<_>>();
        let weights = matrix.reconstruction(&attributes, &policy, None).unwrap();
        let u = (1..=matrix.columns() as u64)
            .map(Scalar::from)
            .collect::<Vec<_>>();
        let shares = matrix.share(&u);
        let secret: Scalar = weights.iter().map(|(k, w)| shares[*k] * w).sum();
        assert_eq!(secret, u[0]);
    }

    #[test]
    fn test_reconstruction_matches_policy() {
        let policy = AccessPolicy::parse("2 of (a, 2 of (c, d, e), b)").unwrap();
        let matrix = LsssMatrix::from_policy(&policy);
        let hashed = |attributes: &[&str]| {
            attributes
                .iter()
                .map(|a| hash_to_scalar(a))
                .collect::<HashSet<_>>()
        };

        for (attributes, expected) in [
            (&["a", "b"][..], true),
            (&["a", "c", "d"][..], true),
            (&["c", "d", "e", "b"][..], true),
            (&["c", "d", "e"][..], false),
            (&["a", "c"][..], false),
        ] {
            let res = matrix.reconstruction(&hashed(attributes), &policy, None);
            assert_eq!(res.is_ok(), expected, "attributes: {attributes:?}");
            if let Ok(weights) = res {
                // the weights recombine the secret
                let u = [Scalar::from(7u64), Scalar::from(11u64), Scalar::from(13u64)];
                let shares = matrix.share(&u);
                let secret: Scalar = weights.iter().map(|(k, w)| shares[*k] * w).sum();
                assert_eq!(secret, u[0]);
            }
        }
    }

    #[test]
    fn test_reconstruction_budget() {
        let policy = AccessPolicy::parse("3 of (a, b, c, d)").unwrap();
        let matrix = LsssMatrix::from_policy(&policy);
        let attributes = ["a", "b", "c", "d"]
            .iter()
            .map(|a| hash_to_scalar(a))
            .collect::<HashSet<_>>();
        assert!(matrix
            .reconstruction(&attributes, &policy, Some(1))
            .is_ok());
        assert!(matches!(
            matrix.reconstruction(&attributes, &policy, Some(0)),
            Err(Error::Decryption(DecryptionError::NoLsssSolution(0)))
        ));
    }

    #[test]
    fn test_repeated_attributes() {
        let policy = AccessPolicy::parse("(a and b) or (a and c)").unwrap();
        let matrix = LsssMatrix::from_policy(&policy);
        assert_eq!(matrix.rows().len(), 4);
        let attributes = [hash_to_scalar("a"), hash_to_scalar("c")]
            .into_iter()
            .collect::<HashSet<_>>();
        let weights = matrix.reconstruction(&attributes, &policy, None).unwrap();
        assert_eq!(
            weights.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_sorted_power_set() {
        let subsets = SortedPowerSet::new(&[1, 2, 3]).collect::<Vec<_>>();
        assert_eq!(
            subsets,
            vec![
                vec![1],
                vec![2],
                vec![3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
                vec![1, 2, 3]
            ]
        );
        assert_eq!(SortedPowerSet::<u8>::new(&[]).count(), 0);
    }
}
