/// Compressed sparse row matrix.
///
/// Only the operations needed by the refinement sweeps are provided; the
/// matrix is assembled once from triplets and then treated as read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    pub n_rows: usize,
    pub n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Assembles a CSR matrix from `(row, col, value)` triplets.
    /// Duplicate entries are summed; columns within a row end up sorted.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, f64)]) -> SparseMatrix {
        let mut per_row: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_rows];
        for &(r, c, v) in triplets {
            assert!(r < n_rows && c < n_cols, "triplet ({r}, {c}) out of bounds");
            per_row[r].push((c, v));
        }

        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());
        row_ptr.push(0);

        for mut entries in per_row {
            entries.sort_by_key(|&(c, _)| c);
            let mut iter = entries.into_iter().peekable();
            while let Some((c, mut v)) = iter.next() {
                while let Some(&(c_next, v_next)) = iter.peek() {
                    if c_next != c {
                        break;
                    }
                    v += v_next;
                    iter.next();
                }
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }

        SparseMatrix { n_rows, n_cols, row_ptr, col_idx, values }
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterates over the stored `(col, value)` pairs of one row.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_ptr[r]..self.row_ptr[r + 1];
        self.col_idx[span.clone()].iter().copied().zip(self.values[span].iter().copied())
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.row(r).find(|&(col, _)| col == c).map(|(_, v)| v).unwrap_or(0.0)
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n_rows.min(self.n_cols)).map(|i| self.get(i, i)).collect()
    }

    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        assert_eq!(x.len(), self.n_cols, "vector length does not match matrix columns");
        (0..self.n_rows)
            .map(|r| self.row(r).map(|(c, v)| v * x[c]).sum())
            .collect()
    }

    /// One Jacobi sweep for `A x = b`: `x ← D⁻¹ (b − (A − D) x)`.
    /// Rows with a zero diagonal have a zero inverse, so their entry becomes 0.
    pub fn jacobi_sweep(&self, x: &[f64], b: &[f64]) -> Vec<f64> {
        (0..self.n_rows)
            .map(|r| {
                let mut diag = 0.0;
                let mut off = 0.0;
                for (c, v) in self.row(r) {
                    if c == r {
                        diag = v;
                    } else {
                        off += v * x[c];
                    }
                }
                if diag != 0.0 { (b[r] - off) / diag } else { 0.0 }
            })
            .collect()
    }

    /// One Gauss-Seidel sweep for `A x = b`, updating `x` in place in row
    /// order. Equivalent to `x ← L*⁻¹ (b − U x)` with `L*` the lower triangle
    /// (diagonal included) and `U` the strict upper triangle.
    pub fn gauss_seidel_sweep(&self, x: &mut [f64], b: &[f64]) {
        for r in 0..self.n_rows {
            let mut diag = 0.0;
            let mut off = 0.0;
            for (c, v) in self.row(r) {
                if c == r {
                    diag = v;
                } else {
                    off += v * x[c];
                }
            }
            x[r] = if diag != 0.0 { (b[r] - off) / diag } else { 0.0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tridiag(n: usize) -> SparseMatrix {
        let mut t = Vec::new();
        for i in 0..n {
            t.push((i, i, 4.0));
            if i > 0 {
                t.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                t.push((i, i + 1, -1.0));
            }
        }
        SparseMatrix::from_triplets(n, n, &t)
    }

    #[test]
    fn duplicates_are_summed() {
        let m = SparseMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 0, 2.0), (1, 0, 5.0)]);
        assert_eq!(m.get(0, 0), 3.0);
        assert_eq!(m.get(1, 0), 5.0);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.diagonal(), vec![3.0, 0.0]);
    }

    #[test]
    fn mul_vec_matches_dense_product() {
        let m = tridiag(3);
        assert_eq!(m.mul_vec(&[1.0, 2.0, 3.0]), vec![2.0, 4.0, 10.0]);
    }

    #[test]
    fn sweeps_converge_on_diagonally_dominant_system() {
        let m = tridiag(6);
        let exact = vec![1.0, -2.0, 0.5, 3.0, 0.0, 1.5];
        let b = m.mul_vec(&exact);

        let mut xj = vec![0.0; 6];
        for _ in 0..200 {
            xj = m.jacobi_sweep(&xj, &b);
        }
        let mut xg = vec![0.0; 6];
        for _ in 0..100 {
            m.gauss_seidel_sweep(&mut xg, &b);
        }
        for i in 0..6 {
            assert_relative_eq!(xj[i], exact[i], epsilon = 1e-9);
            assert_relative_eq!(xg[i], exact[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn zero_diagonal_row_yields_zero() {
        let m = SparseMatrix::from_triplets(2, 2, &[(0, 1, 1.0), (1, 1, 2.0)]);
        let x = m.jacobi_sweep(&[7.0, 7.0], &[1.0, 4.0]);
        assert_eq!(x, vec![0.0, 2.0]);
    }
}
