use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::fmt;

use crate::domain::Domain;
use crate::math::Grid;

/// Evaluation metrics comparing predicted and reference potentials.
///
/// `Phi<n><m>` compares the coefficient of the Fourier sine mode with `n`
/// half-waves along x and `m` along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "residual")]
    Residual,
    #[serde(rename = "inf_norm")]
    InfNorm,
    #[serde(rename = "Eresidual")]
    EResidual,
    #[serde(rename = "Einf_norm")]
    EInfNorm,
    #[serde(rename = "phi11")]
    Phi11,
    #[serde(rename = "phi12")]
    Phi12,
    #[serde(rename = "phi21")]
    Phi21,
    #[serde(rename = "phi22")]
    Phi22,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Residual => "residual",
            MetricKind::InfNorm => "inf_norm",
            MetricKind::EResidual => "Eresidual",
            MetricKind::EInfNorm => "Einf_norm",
            MetricKind::Phi11 => "phi11",
            MetricKind::Phi12 => "phi12",
            MetricKind::Phi21 => "phi21",
            MetricKind::Phi22 => "phi22",
        }
    }

    /// Metric value over a batch of (output, target) pairs: the metric of
    /// every sample, averaged over the batch.
    pub fn compute(&self, outputs: &[Grid], targets: &[Grid], domain: &Domain) -> f64 {
        if outputs.is_empty() {
            return 0.0;
        }
        let total: f64 = outputs
            .iter()
            .zip(targets)
            .map(|(out, tgt)| self.sample(out, tgt, domain))
            .sum();
        total / outputs.len() as f64
    }

    /// Metric value of one (output, target) pair.
    pub fn sample(&self, output: &Grid, target: &Grid, domain: &Domain) -> f64 {
        match self {
            MetricKind::Residual => mean(diffs(output, target).map(f64::abs)),
            MetricKind::InfNorm => diffs(output, target).fold(0.0, |m, d| m.max(d.abs())),
            MetricKind::EResidual | MetricKind::EInfNorm => {
                let (ex_o, ey_o) = electric_field(output, domain.dx, domain.dy);
                let (ex_t, ey_t) = electric_field(target, domain.dx, domain.dy);
                let norms = (0..ex_o.data.len())
                    .map(|k| (ex_o.data[k] - ex_t.data[k]).hypot(ey_o.data[k] - ey_t.data[k]));
                if *self == MetricKind::EResidual {
                    mean(norms)
                } else {
                    norms.fold(0.0, f64::max)
                }
            }
            MetricKind::Phi11 | MetricKind::Phi12 | MetricKind::Phi21 | MetricKind::Phi22 => {
                let (n, m) = self.mode().unwrap_or((1, 1));
                (fourier_coefficient(output, domain, n, m) - fourier_coefficient(target, domain, n, m)).abs()
            }
        }
    }

    fn mode(&self) -> Option<(usize, usize)> {
        match self {
            MetricKind::Phi11 => Some((1, 1)),
            MetricKind::Phi12 => Some((1, 2)),
            MetricKind::Phi21 => Some((2, 1)),
            MetricKind::Phi22 => Some((2, 2)),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn diffs<'a>(output: &'a Grid, target: &'a Grid) -> impl Iterator<Item = f64> + 'a {
    output.data.iter().zip(&target.data).map(|(a, b)| a - b)
}

fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    sum / count.max(1) as f64
}

/// Second-order derivative along a line of `len` samples read through `at`:
/// central inside, one-sided three-point stencil at both ends.
fn derivative<F: Fn(usize) -> f64>(at: F, k: usize, len: usize, h: f64) -> f64 {
    match len {
        0 | 1 => 0.0,
        2 => (at(1) - at(0)) / h,
        _ if k == 0 => (-3.0 * at(0) + 4.0 * at(1) - at(2)) / (2.0 * h),
        _ if k + 1 == len => (3.0 * at(k) - 4.0 * at(k - 1) + at(k - 2)) / (2.0 * h),
        _ => (at(k + 1) - at(k - 1)) / (2.0 * h),
    }
}

/// E = -∇u by second-order finite differences.
pub fn electric_field(potential: &Grid, dx: f64, dy: f64) -> (Grid, Grid) {
    let (rows, cols) = potential.shape();
    let ex = Grid::from_fn(rows, cols, |i, j| -derivative(|c| potential.get(i, c), j, cols, dx));
    let ey = Grid::from_fn(rows, cols, |i, j| -derivative(|r| potential.get(r, j), i, rows, dy));
    (ex, ey)
}

/// Coefficient of the sine mode `(n, m)` of `u` on the domain:
/// `4 / (lx ly) ∫∫ u sin(nπx'/lx) sin(mπy'/ly)`, trapezoidal rule,
/// with `x'`, `y'` measured from the lower-left corner.
pub fn fourier_coefficient(u: &Grid, domain: &Domain, n: usize, m: usize) -> f64 {
    let (rows, cols) = u.shape();
    let trap = |k: usize, len: usize| if k == 0 || k + 1 == len { 0.5 } else { 1.0 };

    let mut acc = 0.0;
    for i in 0..rows {
        let y = i as f64 * domain.dy;
        let sy = (m as f64 * PI * y / domain.ly).sin() * trap(i, rows);
        for j in 0..cols {
            let x = j as f64 * domain.dx;
            let sx = (n as f64 * PI * x / domain.lx).sin() * trap(j, cols);
            acc += u.get(i, j) * sx * sy;
        }
    }
    4.0 / (domain.lx * domain.ly) * acc * domain.dx * domain.dy
}
