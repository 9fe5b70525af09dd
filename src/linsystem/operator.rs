use serde::{Deserialize, Serialize};

use crate::math::{Grid, SparseMatrix};

/// Boundary condition type of one side of the rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Dirichlet,
    /// Zero normal gradient
    Neumann,
}

/// Condition type per side. `bottom` is the `ymin` row, `left` the `xmin` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryKinds {
    pub left: BoundaryKind,
    pub right: BoundaryKind,
    pub bottom: BoundaryKind,
    pub top: BoundaryKind,
}

impl BoundaryKinds {
    pub fn all_dirichlet() -> BoundaryKinds {
        BoundaryKinds {
            left: BoundaryKind::Dirichlet,
            right: BoundaryKind::Dirichlet,
            bottom: BoundaryKind::Dirichlet,
            top: BoundaryKind::Dirichlet,
        }
    }

    fn is_dirichlet_node(&self, i: usize, j: usize, nnx: usize, nny: usize) -> bool {
        (j == 0 && self.left == BoundaryKind::Dirichlet)
            || (j + 1 == nnx && self.right == BoundaryKind::Dirichlet)
            || (i == 0 && self.bottom == BoundaryKind::Dirichlet)
            || (i + 1 == nny && self.top == BoundaryKind::Dirichlet)
    }
}

/// Prescribed Dirichlet values: `left`/`right` have `nny` entries,
/// `bottom`/`top` have `nnx`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryValues {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    pub bottom: Vec<f64>,
    pub top: Vec<f64>,
}

impl BoundaryValues {
    pub fn zeros(nnx: usize, nny: usize) -> BoundaryValues {
        BoundaryValues {
            left: vec![0.0; nny],
            right: vec![0.0; nny],
            bottom: vec![0.0; nnx],
            top: vec![0.0; nnx],
        }
    }
}

/// Five-point Laplacian on an `nnx x nny` grid, multiplied by `scale`.
///
/// Unknowns are numbered row-major (`k = i * nnx + j`). Nodes on a Dirichlet
/// side get a `-1` diagonal row so that `A u = -rhs` reproduces `u = rhs` on
/// them; a Neumann side mirrors the missing neighbour across the boundary.
pub fn cartesian_matrix(
    dx: f64,
    dy: f64,
    nnx: usize,
    nny: usize,
    scale: f64,
    bcs: &BoundaryKinds,
) -> SparseMatrix {
    let n = nnx * nny;
    let cx = scale / (dx * dx);
    let cy = scale / (dy * dy);
    let mut triplets = Vec::with_capacity(5 * n);

    for i in 0..nny {
        for j in 0..nnx {
            let k = i * nnx + j;
            if bcs.is_dirichlet_node(i, j, nnx, nny) {
                triplets.push((k, k, -1.0));
                continue;
            }

            triplets.push((k, k, -2.0 * cx - 2.0 * cy));

            // Out-of-range neighbours only occur on Neumann sides: mirror them.
            let west = if j > 0 { j - 1 } else { j + 1 };
            let east = if j + 1 < nnx { j + 1 } else { j - 1 };
            let south = if i > 0 { i - 1 } else { i + 1 };
            let north = if i + 1 < nny { i + 1 } else { i - 1 };

            triplets.push((k, i * nnx + west, cx));
            triplets.push((k, i * nnx + east, cx));
            triplets.push((k, south * nnx + j, cy));
            triplets.push((k, north * nnx + j, cy));
        }
    }

    SparseMatrix::from_triplets(n, n, &triplets)
}

/// Writes the Dirichlet values onto the boundary nodes of `rhs`.
/// Sides are applied left, right, bottom, top, so the top row owns the corners.
pub fn impose_dirichlet(rhs: &mut Grid, bc: &BoundaryValues) {
    let (rows, cols) = rhs.shape();
    for i in 0..rows {
        rhs.set(i, 0, bc.left[i]);
        rhs.set(i, cols - 1, bc.right[i]);
    }
    for j in 0..cols {
        rhs.set(0, j, bc.bottom[j]);
        rhs.set(rows - 1, j, bc.top[j]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn laplacian_of_quadratic_is_constant() {
        let (nnx, nny) = (7, 5);
        let (dx, dy) = (0.5, 0.25);
        let a = cartesian_matrix(dx, dy, nnx, nny, 1.0, &BoundaryKinds::all_dirichlet());

        // u = x² + y² has Laplacian 4 everywhere.
        let u: Vec<f64> = (0..nny)
            .flat_map(|i| (0..nnx).map(move |j| (j as f64 * dx).powi(2) + (i as f64 * dy).powi(2)))
            .collect();
        let au = a.mul_vec(&u);

        for i in 1..nny - 1 {
            for j in 1..nnx - 1 {
                assert_relative_eq!(au[i * nnx + j], 4.0, epsilon = 1e-9);
            }
        }
        // Dirichlet rows return -u.
        assert_relative_eq!(au[0], -u[0]);
        assert_relative_eq!(au[nnx * nny - 1], -u[nnx * nny - 1]);
    }

    #[test]
    fn neumann_side_mirrors_neighbour() {
        let bcs = BoundaryKinds {
            left: BoundaryKind::Neumann,
            ..BoundaryKinds::all_dirichlet()
        };
        let a = cartesian_matrix(1.0, 1.0, 4, 4, 1.0, &bcs);
        // Node (1, 0): left side, interior row.
        let k = 4;
        assert_relative_eq!(a.get(k, k), -4.0);
        assert_relative_eq!(a.get(k, k + 1), 2.0);
        assert_relative_eq!(a.get(k, k - 4), 1.0);
        assert_relative_eq!(a.get(k, k + 4), 1.0);
    }

    #[test]
    fn impose_dirichlet_overwrites_ring_only() {
        let mut rhs = Grid::filled(4, 5, 9.0);
        let mut bc = BoundaryValues::zeros(5, 4);
        bc.left = vec![1.0; 4];
        bc.top = vec![2.0; 5];
        impose_dirichlet(&mut rhs, &bc);

        assert_eq!(rhs.get(1, 0), 1.0);
        assert_eq!(rhs.get(3, 0), 2.0);
        assert_eq!(rhs.get(0, 2), 0.0);
        assert_eq!(rhs.get(2, 4), 0.0);
        assert_eq!(rhs.get(1, 1), 9.0);
        assert_eq!(rhs.get(2, 3), 9.0);
    }
}
