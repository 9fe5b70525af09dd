use tracing::debug;

use super::operator::{cartesian_matrix, impose_dirichlet, BoundaryKinds, BoundaryValues};
use crate::config::RefineMethod;
use crate::domain::Domain;
use crate::error::{HeatNnError, Result};
use crate::math::{Grid, SparseMatrix};

/// Polishes a network prediction with a few stationary iterations on the
/// discrete Poisson system `A u = -rhs` with homogeneous Dirichlet walls.
#[derive(Debug, Clone)]
pub struct Refiner {
    pub method: RefineMethod,
    pub iterations: usize,
    matrix: SparseMatrix,
    boundary: BoundaryValues,
    shape: (usize, usize),
}

impl Refiner {
    pub fn new(domain: &Domain, method: RefineMethod, iterations: usize) -> Refiner {
        let matrix = cartesian_matrix(
            domain.dx,
            domain.dy,
            domain.nnx,
            domain.nny,
            1.0,
            &BoundaryKinds::all_dirichlet(),
        );
        Refiner {
            method,
            iterations,
            matrix,
            boundary: BoundaryValues::zeros(domain.nnx, domain.nny),
            shape: domain.shape(),
        }
    }

    /// Runs `iterations` sweeps starting from `potential`.
    /// The boundary nodes of `rhs` are overwritten with the wall values first.
    pub fn refine(&self, potential: &Grid, rhs: &mut Grid) -> Result<Grid> {
        for got in [potential.shape(), rhs.shape()] {
            if got != self.shape {
                return Err(HeatNnError::Shape { expected: self.shape, got });
            }
        }

        impose_dirichlet(rhs, &self.boundary);
        let b: Vec<f64> = rhs.data.iter().map(|v| -v).collect();
        let mut u = potential.data.clone();

        for it in 0..self.iterations {
            match self.method {
                RefineMethod::Jacobi => u = self.matrix.jacobi_sweep(&u, &b),
                RefineMethod::GaussSeidel => self.matrix.gauss_seidel_sweep(&mut u, &b),
            }
            debug!(method = %self.method, iteration = it + 1, "refinement sweep");
        }

        Grid::from_vec(self.shape.0, self.shape.1, u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Coord, DomainConfig};
    use std::f64::consts::PI;

    fn domain(n: usize) -> Domain {
        Domain::new(&DomainConfig {
            nnx: n,
            nny: n,
            xmin: 0.0,
            xmax: 1.0,
            ymin: 0.0,
            ymax: 1.0,
            coord: Coord::Cart,
            verbosity: None,
            benchmark: false,
        })
    }

    /// u = sin(πx) sin(πy) solves ∇²u = -2π² u, i.e. rhs = 2π² u.
    fn sine_case(d: &Domain) -> (Grid, Grid) {
        let u = Grid::from_fn(d.nny, d.nnx, |i, j| (PI * d.x[j]).sin() * (PI * d.y[i]).sin());
        let rhs = u.scale(2.0 * PI * PI);
        (u, rhs)
    }

    fn residual(refiner: &Refiner, u: &Grid, rhs: &Grid) -> f64 {
        let au = refiner.matrix.mul_vec(&u.data);
        au.iter().zip(rhs.data.iter()).map(|(a, r)| (a + r).abs()).fold(0.0, f64::max)
    }

    #[test]
    fn sweeps_reduce_the_residual() {
        let d = domain(17);
        let (u, rhs) = sine_case(&d);
        let guess = u.scale(0.8);

        for method in [RefineMethod::Jacobi, RefineMethod::GaussSeidel] {
            let refiner = Refiner::new(&d, method, 20);
            let mut rhs_bc = rhs.clone();
            let before = residual(&refiner, &guess, &{
                let mut r = rhs.clone();
                impose_dirichlet(&mut r, &refiner.boundary);
                r
            });
            let refined = refiner.refine(&guess, &mut rhs_bc).unwrap();
            let after = residual(&refiner, &refined, &rhs_bc);
            assert!(after < before, "{method}: {after} >= {before}");
        }
    }

    #[test]
    fn boundary_is_forced_to_zero() {
        let d = domain(9);
        let refiner = Refiner::new(&d, RefineMethod::Jacobi, 1);
        let guess = Grid::filled(9, 9, 1.0);
        let mut rhs = Grid::filled(9, 9, 3.0);
        let refined = refiner.refine(&guess, &mut rhs).unwrap();
        assert_eq!(refined.get(0, 4), 0.0);
        assert_eq!(refined.get(8, 8), 0.0);
        assert_eq!(rhs.get(0, 0), 0.0);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let d = domain(9);
        let refiner = Refiner::new(&d, RefineMethod::GaussSeidel, 1);
        let mut rhs = Grid::zeros(9, 9);
        assert!(matches!(
            refiner.refine(&Grid::zeros(8, 9), &mut rhs),
            Err(HeatNnError::Shape { .. })
        ));
    }
}
