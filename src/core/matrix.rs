//! Dense matrices over an arbitrary field.

use ark_ff::Field;

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix<F> {
    rows: usize,
    columns: usize,
    data: Vec<F>,
}

impl<F: Field> Matrix<F> {
    #[must_use]
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            data: vec![F::zero(); rows * columns],
        }
    }

    #[must_use]
    pub fn identity(size: usize) -> Self {
        let mut res = Self::zeros(size, size);
        for i in 0..size {
            res.set(i, i, F::one());
        }
        res
    }

    /// Builds a matrix from its rows.
    ///
    /// # Error
    ///
    /// Fails if the rows do not all have the same length.
    pub fn from_rows(rows: Vec<Vec<F>>) -> Result<Self, Error> {
        let columns = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * columns);
        for row in rows {
            if row.len() != columns {
                return Err(Error::InvalidSize(format!(
                    "expected rows of length {columns}, given {}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            columns,
            data,
        })
    }

    #[cfg(test)]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[cfg(test)]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> &F {
        &self.data[i * self.columns + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: F) {
        self.data[i * self.columns + j] = value;
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut res = Self::zeros(self.columns, self.rows);
        for i in 0..self.rows {
            for j in 0..self.columns {
                res.set(j, i, *self.get(i, j));
            }
        }
        res
    }

    /// Multiplies the two matrices.
    ///
    /// # Error
    ///
    /// Fails if the inner dimensions differ.
    #[cfg(test)]
    pub fn mul(&self, other: &Self) -> Result<Self, Error> {
        if self.columns != other.rows {
            return Err(Error::InvalidSize(format!(
                "cannot multiply a {}x{} matrix by a {}x{} matrix",
                self.rows, self.columns, other.rows, other.columns
            )));
        }
        let mut res = Self::zeros(self.rows, other.columns);
        for i in 0..self.rows {
            for j in 0..other.columns {
                let mut acc = F::zero();
                for k in 0..self.columns {
                    acc += *self.get(i, k) * other.get(k, j);
                }
                res.set(i, j, acc);
            }
        }
        Ok(res)
    }

    /// Inverts the matrix using Gauss-Jordan elimination.
    ///
    /// Returns `None` if the matrix is not square or is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        if self.rows != self.columns {
            return None;
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Self::identity(n);
        for col in 0..n {
            let pivot = (col..n).find(|&r| !a.get(r, col).is_zero())?;
            a.swap_rows(col, pivot);
            inv.swap_rows(col, pivot);
            let factor = a.get(col, col).inverse()?;
            a.scale_row(col, &factor);
            inv.scale_row(col, &factor);
            for r in 0..n {
                if r != col {
                    let coef = *a.get(r, col);
                    if !coef.is_zero() {
                        a.sub_scaled_row(r, col, &coef);
                        inv.sub_scaled_row(r, col, &coef);
                    }
                }
            }
        }
        Some(inv)
    }

    /// Finds one solution `x` of `self · x = rhs`, free variables set to zero.
    ///
    /// Returns `None` if the system is inconsistent.
    #[must_use]
    pub fn solve(&self, rhs: &[F]) -> Option<Vec<F>> {
        if rhs.len() != self.rows {
            return None;
        }
        // Augmented matrix [self | rhs] in reduced row echelon form.
        let mut a = Self::zeros(self.rows, self.columns + 1);
        for i in 0..self.rows {
            for j in 0..self.columns {
                a.set(i, j, *self.get(i, j));
            }
            a.set(i, self.columns, rhs[i]);
        }
        let mut pivots = Vec::new();
        let mut row = 0;
        for col in 0..self.columns {
            if row == self.rows {
                break;
            }
            let Some(pivot) = (row..self.rows).find(|&r| !a.get(r, col).is_zero()) else {
                continue;
            };
            a.swap_rows(row, pivot);
            let factor = a.get(row, col).inverse()?;
            a.scale_row(row, &factor);
            for r in 0..self.rows {
                if r != row {
                    let coef = *a.get(r, col);
                    if !coef.is_zero() {
                        a.sub_scaled_row(r, row, &coef);
                    }
                }
            }
            pivots.push(col);
            row += 1;
        }
        if (row..self.rows).any(|r| !a.get(r, self.columns).is_zero()) {
            return None;
        }
        let mut x = vec![F::zero(); self.columns];
        for (r, col) in pivots.into_iter().enumerate() {
            x[col] = *a.get(r, self.columns);
        }
        Some(x)
    }

    fn swap_rows(&mut self, i: usize, j: usize) {
        if i != j {
            for k in 0..self.columns {
                self.data.swap(i * self.columns + k, j * self.columns + k);
            }
        }
    }

    fn scale_row(&mut self, i: usize, factor: &F) {
        for k in 0..self.columns {
            self.data[i * self.columns + k] *= factor;
        }
    }

    /// `row_i -= coef · row_j`
    fn sub_scaled_row(&mut self, i: usize, j: usize, coef: &F) {
        for k in 0..self.columns {
            let v = *self.get(j, k) * coef;
            self.data[i * self.columns + k] -= v;
        }
    }
}
