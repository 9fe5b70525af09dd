//! Rectangular computational domain.

use std::f64::consts::PI;

use crate::config::{Coord, DomainConfig};
use crate::math::Grid;

/// Uniform node-centred discretisation of `[xmin, xmax] x [ymin, ymax]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub nnx: usize,
    pub nny: usize,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub lx: f64,
    pub ly: f64,
    pub dx: f64,
    pub dy: f64,
    /// Node abscissae, length `nnx`
    pub x: Vec<f64>,
    /// Node ordinates, length `nny`
    pub y: Vec<f64>,
    pub coord: Coord,
    pub benchmark: bool,
}

impl Domain {
    pub fn new(cfg: &DomainConfig) -> Domain {
        let lx = cfg.xmax - cfg.xmin;
        let ly = cfg.ymax - cfg.ymin;
        let dx = lx / (cfg.nnx - 1) as f64;
        let dy = ly / (cfg.nny - 1) as f64;
        Domain {
            nnx: cfg.nnx,
            nny: cfg.nny,
            xmin: cfg.xmin,
            xmax: cfg.xmax,
            ymin: cfg.ymin,
            ymax: cfg.ymax,
            lx,
            ly,
            dx,
            dy,
            x: (0..cfg.nnx).map(|j| cfg.xmin + j as f64 * dx).collect(),
            y: (0..cfg.nny).map(|i| cfg.ymin + i as f64 * dy).collect(),
            coord: cfg.coord,
            benchmark: cfg.benchmark,
        }
    }

    /// `(rows, cols)` of fields living on this domain.
    pub fn shape(&self) -> (usize, usize) {
        (self.nny, self.nnx)
    }

    pub fn zeros(&self) -> Grid {
        Grid::zeros(self.nny, self.nnx)
    }
}

/// Ratio between the potential and the rhs of the lowest Fourier mode,
/// used to bring network inputs to the scale of its outputs.
pub fn ratio_potrhs(alpha: f64, lx: f64, ly: f64) -> f64 {
    alpha / ((PI * PI / 4.0).powi(2) * (1.0 / (lx * lx) + 1.0 / (ly * ly)))
}
