use rand::prelude::*;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::ops::{Add, Sub};

use crate::error::{HeatNnError, Result};

/// Dense 2-D scalar field stored row-major.
///
/// `rows` runs along y (`nny`), `cols` along x (`nnx`), so `data[i * cols + j]`
/// is the value at node `(x_j, y_i)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Grid {
    pub fn zeros(rows: usize, cols: usize) -> Grid {
        Grid {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Grid {
        Grid {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wraps a flat row-major buffer; fails if its length is not `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Grid> {
        if data.len() != rows * cols {
            return Err(HeatNnError::Config(format!(
                "grid buffer of length {} cannot be shaped as {}x{}",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Grid { rows, cols, data })
    }

    /// Builds a grid by evaluating `f(i, j)` at every node.
    pub fn from_fn<F>(rows: usize, cols: usize, f: F) -> Grid
    where
        F: Fn(usize, usize) -> f64,
    {
        let mut res = Grid::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i * cols + j] = f(i, j);
            }
        }
        res
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal(rng: &mut ThreadRng) -> f64 {
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// He initialization: samples from N(0, sqrt(2 / fan_in)).
    ///
    /// For a convolution kernel `fan_in` is `in_channels * k * k`.
    pub fn he(rows: usize, cols: usize, fan_in: usize) -> Grid {
        let mut rng = rand::thread_rng();
        let std_dev = (2.0 / fan_in.max(1) as f64).sqrt();
        let mut res = Grid::zeros(rows, cols);
        for v in res.data.iter_mut() {
            *v = Grid::sample_standard_normal(&mut rng) * std_dev;
        }
        res
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    /// True for nodes on the outer ring of the grid.
    #[inline]
    pub fn is_boundary(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i + 1 == self.rows || j + 1 == self.cols
    }

    pub fn map<F>(&self, functor: F) -> Grid
    where
        F: Fn(f64) -> f64,
    {
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    pub fn scale(&self, factor: f64) -> Grid {
        self.map(|x| x * factor)
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
    }

    pub fn mean_abs(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|x| x.abs()).sum::<f64>() / self.data.len() as f64
    }

    pub fn min_max(&self) -> (f64, f64) {
        self.data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        })
    }
}

impl Default for Grid {
    fn default() -> Self {
        Grid { rows: 0, cols: 0, data: vec![] }
    }
}

impl Add for Grid {
    type Output = Grid;

    fn add(self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Grids are of incorrect sizes")
        }

        let data = self.data.iter().zip(rhs.data.iter()).map(|(a, b)| a + b).collect();
        Grid { rows: self.rows, cols: self.cols, data }
    }
}

impl Sub for Grid {
    type Output = Grid;

    fn sub(self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Grids are of incorrect sizes")
        }

        let data = self.data.iter().zip(rhs.data.iter()).map(|(a, b)| a - b).collect();
        Grid { rows: self.rows, cols: self.cols, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(Grid::from_vec(2, 3, vec![0.0; 5]).is_err());
        assert!(Grid::from_vec(2, 3, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn boundary_detection() {
        let g = Grid::zeros(4, 5);
        assert!(g.is_boundary(0, 2));
        assert!(g.is_boundary(3, 2));
        assert!(g.is_boundary(2, 0));
        assert!(g.is_boundary(2, 4));
        assert!(!g.is_boundary(1, 1));
    }

    #[test]
    fn norms_and_arithmetic() {
        let a = Grid::from_vec(1, 3, vec![1.0, -4.0, 2.0]).unwrap();
        let b = Grid::filled(1, 3, 1.0);
        assert_eq!(a.max_abs(), 4.0);
        assert!((a.mean_abs() - 7.0 / 3.0).abs() < 1e-12);
        assert_eq!((a.clone() - b.clone()).data, vec![0.0, -5.0, 1.0]);
        assert_eq!((a + b).data, vec![2.0, -3.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "incorrect sizes")]
    fn add_panics_on_shape_mismatch() {
        let _ = Grid::zeros(2, 2) + Grid::zeros(2, 3);
    }

    #[test]
    fn he_init_has_requested_shape() {
        let g = Grid::he(3, 3, 9);
        assert_eq!(g.shape(), (3, 3));
        assert!(g.data.iter().all(|x| x.is_finite()));
    }
}
